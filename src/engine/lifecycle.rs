//! Pinning and deletion.
//!
//! A pinned snapshot cannot be deleted until unpinned, and each guild may
//! only pin up to its quota. Deleting a snapshot must not change what any
//! surviving snapshot reconstructs to, so non-newest generations are merged
//! forward into their successor instead of being dropped.

use tracing::info;

use crate::discord::DiscordApi;
use crate::error::{Error, Result};
use crate::store::SnapshotMeta;

use super::SnapshotEngine;

impl<A: DiscordApi> SnapshotEngine<A> {
    /// Pin or unpin a snapshot. Pinning is idempotent; re-pinning an already
    /// pinned snapshot does not consume quota.
    pub fn pin_snapshot(&mut self, snapshot_id: i64, pinned: bool) -> Result<SnapshotMeta> {
        let meta = self
            .store
            .get_snapshot(snapshot_id)?
            .ok_or(Error::NotFound(snapshot_id))?;

        if meta.pinned == pinned {
            return Ok(meta);
        }

        if pinned {
            let pinned_count = self
                .store
                .list_snapshots(&meta.guild_id)?
                .iter()
                .filter(|snapshot| snapshot.pinned)
                .count() as u32;
            if pinned_count >= self.pin_quota {
                return Err(Error::Capacity(self.pin_quota));
            }
        }

        self.store.set_pinned(snapshot_id, pinned)?;
        self.caches.invalidate_guild(&meta.guild_id);
        self.caches.invalidate_snapshot(snapshot_id);

        info!(snapshot_id, pinned, "updated pin state");
        Ok(SnapshotMeta { pinned, ..meta })
    }

    /// Delete a snapshot. The newest generation is removed outright; any
    /// other generation is folded into its successor so later snapshots keep
    /// reconstructing to the same state.
    pub fn delete_snapshot(&mut self, snapshot_id: i64) -> Result<()> {
        let meta = self
            .store
            .get_snapshot(snapshot_id)?
            .ok_or(Error::NotFound(snapshot_id))?;
        if meta.pinned {
            return Err(Error::Pinned);
        }

        let next = self
            .store
            .list_snapshots(&meta.guild_id)?
            .iter()
            .map(|snapshot| snapshot.id)
            .filter(|id| *id > snapshot_id)
            .min();

        match next {
            Some(next_id) => {
                self.store.merge_generation_forward(snapshot_id, next_id)?;
                // the successor's stored rows changed under the cache
                self.caches.invalidate_snapshot(next_id);
            }
            None => self.store.remove_generation(snapshot_id)?,
        }

        self.caches.invalidate_guild(&meta.guild_id);
        self.caches.invalidate_snapshot(snapshot_id);

        info!(snapshot_id, merged_into = ?next, "deleted snapshot");
        Ok(())
    }
}
