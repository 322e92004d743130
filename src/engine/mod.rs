//! The snapshot engine.
//!
//! Ties the store, the cache layer and the Discord collaborator together
//! behind the five public operations: create, fetch, list, pin, delete.
//! Capture is diff-based: only entities that changed since the latest
//! generation are persisted.
//!
//! Concurrent creates for the same guild are not serialized here: two
//! callers can both diff against the same latest generation and commit two
//! valid, redundant generations. The delta writes themselves are
//! transactional, so reconstructions stay correct either way.

pub mod diff;
pub mod lifecycle;
pub mod reconstruct;

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::Caches;
use crate::discord::{self, DiscordApi};
use crate::entity::{Ban, Channel, Overwrite, Role};
use crate::error::{Error, Result};
use crate::store::{DeltaCounts, GenerationDeltas, SnapshotKind, SnapshotMeta, Store};
use reconstruct::{fold, index, sorted_values, MaterializedSnapshot};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How many snapshots a guild may keep pinned.
    pub pin_quota: u32,
    pub list_cache_ttl: Duration,
    pub lookup_cache_size: usize,
    pub snapshot_cache_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            pin_quota: 6,
            list_cache_ttl: Duration::from_secs(600),
            lookup_cache_size: 1000,
            snapshot_cache_size: 200,
        }
    }
}

pub struct SnapshotEngine<A: DiscordApi> {
    store: Store,
    api: A,
    caches: Caches,
    pin_quota: u32,
}

impl<A: DiscordApi> SnapshotEngine<A> {
    pub fn new(store: Store, api: A) -> Self {
        Self::with_options(store, api, EngineOptions::default())
    }

    pub fn with_options(store: Store, api: A, options: EngineOptions) -> Self {
        SnapshotEngine {
            store,
            api,
            caches: Caches::new(
                options.list_cache_ttl,
                options.lookup_cache_size,
                options.snapshot_cache_size,
            ),
            pin_quota: options.pin_quota,
        }
    }

    /// Snapshot metadata for a guild, newest first.
    pub fn list_snapshots(&mut self, guild_id: &str) -> Result<Vec<SnapshotMeta>> {
        if let Some(list) = self.caches.lists.get(&guild_id.to_string()) {
            return Ok(list);
        }
        let list = self.store.list_snapshots(guild_id)?;
        self.caches.lists.insert(guild_id.to_string(), list.clone());
        Ok(list)
    }

    /// Per-kind delta counts for one generation.
    pub fn generation_counts(&self, snapshot_id: i64) -> Result<DeltaCounts> {
        self.store.generation_counts(snapshot_id)
    }

    fn resolve_guild(&mut self, snapshot_id: i64) -> Result<String> {
        if let Some(cached) = self.caches.guilds.get(&snapshot_id) {
            return cached.ok_or(Error::NotFound(snapshot_id));
        }
        let guild_id = self.store.guild_for_snapshot(snapshot_id)?;
        self.caches.guilds.insert(snapshot_id, guild_id.clone());
        guild_id.ok_or(Error::NotFound(snapshot_id))
    }

    /// Materialize the full state of one snapshot by folding its delta
    /// chain. The most expensive read in the system, so results are
    /// LRU-cached by snapshot id.
    pub fn fetch_snapshot(&mut self, snapshot_id: i64) -> Result<MaterializedSnapshot> {
        if let Some(cached) = self.caches.snapshots.get(&snapshot_id) {
            return Ok(cached);
        }

        let guild_id = self.resolve_guild(snapshot_id)?;
        let meta = self
            .store
            .get_snapshot(snapshot_id)?
            .ok_or(Error::NotFound(snapshot_id))?;

        let mut generation_ids: Vec<i64> = self
            .list_snapshots(&guild_id)?
            .iter()
            .map(|snapshot| snapshot.id)
            .filter(|id| *id <= snapshot_id)
            .collect();
        generation_ids.sort_unstable();
        if generation_ids.is_empty() {
            return Err(Error::NotFound(snapshot_id));
        }

        let channels = fold(self.store.load_channel_rows(&generation_ids)?);
        let roles = fold(self.store.load_role_rows(&generation_ids)?);
        let overwrites = fold(self.store.load_overwrite_rows(&generation_ids)?);
        let bans = fold(self.store.load_ban_rows(&generation_ids)?);

        let snapshot = MaterializedSnapshot {
            meta,
            channels: sorted_values(channels),
            roles: sorted_values(roles),
            overwrites: sorted_values(overwrites),
            bans: sorted_values(bans),
        };

        self.caches.snapshots.insert(snapshot_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Capture the guild's current configuration as a new generation.
    /// Returns the new snapshot id; a capture with no changes still creates
    /// a (delta-less) generation.
    pub fn create_snapshot(&mut self, guild_id: &str, kind: SnapshotKind) -> Result<i64> {
        let guild = self.api.fetch_guild(guild_id)?;
        let live_channels = self.api.fetch_channels(guild_id)?;

        let mut roles = guild
            .roles
            .iter()
            .map(Role::from_live)
            .collect::<Result<Vec<_>>>()?;

        let bot_id = self.api.bot_user_id()?;
        let member = self.api.fetch_member(guild_id, &bot_id)?;
        let bot_role_ids: HashSet<String> = member.roles.into_iter().collect();
        diff::raise_bot_role(&mut roles, &bot_role_ids);

        let mut channels = Vec::new();
        let mut overwrites = Vec::new();
        for live in &live_channels {
            if !Channel::is_captured_kind(live.kind) {
                continue;
            }
            channels.push(Channel::from_live(live));
            for raw in &live.permission_overwrites {
                let overwrite = Overwrite::from_live(&live.id, raw)?;
                if !overwrite.is_default() {
                    overwrites.push(overwrite);
                }
            }
        }

        // Bans need their own permission; a bot without it still gets a
        // snapshot of everything else.
        let bans = match discord::fetch_all_bans(&self.api, guild_id) {
            Ok(live_bans) => Some(live_bans.iter().map(Ban::from_live).collect::<Vec<_>>()),
            Err(e) if e.is_missing_access() => {
                warn!(guild_id, error = %e, "ban capture skipped");
                None
            }
            Err(e) => return Err(e),
        };

        let latest = self
            .list_snapshots(guild_id)?
            .first()
            .map(|snapshot| snapshot.id);
        let prior = match latest {
            Some(id) => {
                let snapshot = self.fetch_snapshot(id)?;
                (
                    index(snapshot.channels),
                    index(snapshot.roles),
                    index(snapshot.overwrites),
                    index(snapshot.bans),
                )
            }
            None => Default::default(),
        };

        let deltas = GenerationDeltas {
            channels: diff::diff_entities(&channels, &prior.0, |_| false)?,
            roles: diff::diff_entities(&roles, &prior.1, |role| role.managed)?,
            overwrites: diff::diff_entities(&overwrites, &prior.2, |_| false)?,
            bans: match &bans {
                Some(live) => diff::diff_entities(live, &prior.3, |_| false)?,
                // skipped capture must not tombstone the existing timeline
                None => Vec::new(),
            },
        };

        let created_at = chrono::Utc::now().timestamp();
        let snapshot_id = self
            .store
            .insert_generation(guild_id, kind, created_at, &deltas)?;

        self.caches.invalidate_guild(guild_id);
        self.caches
            .guilds
            .insert(snapshot_id, Some(guild_id.to_string()));

        info!(
            guild_id,
            snapshot_id,
            deltas = deltas.total(),
            "captured snapshot generation"
        );
        Ok(snapshot_id)
    }
}
