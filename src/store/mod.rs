//! SQLite snapshot storage.
//!
//! Five tables: `snapshots` (one row per capture generation) and one delta
//! table per entity kind. A delta row carries the full normalized entity,
//! its fingerprint and a tombstone flag; reconstruction folds these rows in
//! generation order. Every mutation that touches more than one row runs in a
//! single transaction; a generation is committed whole or not at all.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row, Transaction};
use serde::Serialize;

use crate::entity::{Ban, Channel, Overwrite, Role};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Manual,
    Scheduled,
}

impl SnapshotKind {
    pub fn code(self) -> i64 {
        match self {
            SnapshotKind::Manual => 0,
            SnapshotKind::Scheduled => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SnapshotKind::Manual),
            1 => Some(SnapshotKind::Scheduled),
            _ => None,
        }
    }
}

/// Snapshot metadata. `pinned` is the only field that ever changes after
/// creation.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMeta {
    pub id: i64,
    pub guild_id: String,
    pub kind: SnapshotKind,
    pub pinned: bool,
    pub created_at: i64,
}

/// A stored delta: one entity's state (or tombstone) at one generation.
#[derive(Debug, Clone)]
pub struct DeltaRow<T> {
    pub snapshot_id: i64,
    pub deleted: bool,
    pub hash: String,
    pub entity: T,
}

/// A delta pending insertion; the generation id is assigned at commit time.
#[derive(Debug, Clone)]
pub struct Delta<T> {
    pub deleted: bool,
    pub hash: String,
    pub entity: T,
}

/// The full delta set of one new generation.
#[derive(Debug, Default)]
pub struct GenerationDeltas {
    pub channels: Vec<Delta<Channel>>,
    pub roles: Vec<Delta<Role>>,
    pub overwrites: Vec<Delta<Overwrite>>,
    pub bans: Vec<Delta<Ban>>,
}

impl GenerationDeltas {
    pub fn total(&self) -> usize {
        self.channels.len() + self.roles.len() + self.overwrites.len() + self.bans.len()
    }
}

/// Per-kind delta counts for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeltaCounts {
    pub channels: usize,
    pub roles: usize,
    pub overwrites: usize,
    pub bans: usize,
}

impl DeltaCounts {
    pub fn total(&self) -> usize {
        self.channels + self.roles + self.overwrites + self.bans
    }
}

/// Get the database path (~/.local/share/guildsnap/guildsnap.db or platform
/// equivalent)
fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "guildsnap")
        .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("guildsnap.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            guild_id TEXT NOT NULL,
            kind INTEGER NOT NULL,
            pinned INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_guild ON snapshots(guild_id);

        CREATE TABLE IF NOT EXISTS snapshot_channels (
            snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
            channel_id TEXT NOT NULL,
            kind INTEGER NOT NULL,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            topic TEXT,
            nsfw INTEGER NOT NULL,
            parent_id TEXT,
            deleted INTEGER NOT NULL,
            hash TEXT NOT NULL,
            PRIMARY KEY (snapshot_id, channel_id)
        );

        CREATE TABLE IF NOT EXISTS snapshot_roles (
            snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
            role_id TEXT NOT NULL,
            name TEXT NOT NULL,
            color INTEGER NOT NULL,
            hoist INTEGER NOT NULL,
            position INTEGER NOT NULL,
            permissions TEXT NOT NULL,
            managed INTEGER NOT NULL,
            deleted INTEGER NOT NULL,
            hash TEXT NOT NULL,
            PRIMARY KEY (snapshot_id, role_id)
        );

        CREATE TABLE IF NOT EXISTS snapshot_overwrites (
            snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
            channel_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            allow TEXT NOT NULL,
            deny TEXT NOT NULL,
            deleted INTEGER NOT NULL,
            hash TEXT NOT NULL,
            PRIMARY KEY (snapshot_id, channel_id, role_id)
        );

        CREATE TABLE IF NOT EXISTS snapshot_bans (
            snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
            user_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            deleted INTEGER NOT NULL,
            hash TEXT NOT NULL,
            PRIMARY KEY (snapshot_id, user_id)
        );",
    )
}

/// Database handle. Open once per command, reuse across all operations.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    /// Persist one new generation: metadata row plus all delta rows, in a
    /// single transaction. Any insert failure rolls the whole generation
    /// back.
    pub fn insert_generation(
        &mut self,
        guild_id: &str,
        kind: SnapshotKind,
        created_at: i64,
        deltas: &GenerationDeltas,
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;

        let inserted: rusqlite::Result<i64> = (|| {
            tx.execute(
                "INSERT INTO snapshots (guild_id, kind, pinned, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![guild_id, kind.code(), created_at],
            )?;
            let snapshot_id = tx.last_insert_rowid();

            insert_channel_deltas(&tx, snapshot_id, &deltas.channels)?;
            insert_role_deltas(&tx, snapshot_id, &deltas.roles)?;
            insert_overwrite_deltas(&tx, snapshot_id, &deltas.overwrites)?;
            insert_ban_deltas(&tx, snapshot_id, &deltas.bans)?;

            Ok(snapshot_id)
        })();

        match inserted {
            Ok(snapshot_id) => {
                tx.commit().map_err(Error::Transaction)?;
                Ok(snapshot_id)
            }
            Err(e) => Err(Error::Transaction(e)),
        }
    }

    /// All snapshots owned by the guild, newest first.
    pub fn list_snapshots(&self, guild_id: &str) -> Result<Vec<SnapshotMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, guild_id, kind, pinned, created_at
             FROM snapshots
             WHERE guild_id = ?1
             ORDER BY id DESC",
        )?;

        let snapshots = stmt
            .query_map(params![guild_id], meta_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(snapshots)
    }

    pub fn get_snapshot(&self, id: i64) -> Result<Option<SnapshotMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, guild_id, kind, pinned, created_at
             FROM snapshots
             WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => Ok(Some(meta_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Guild id will be None only if the snapshot does not exist.
    pub fn guild_for_snapshot(&self, id: i64) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT guild_id FROM snapshots WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set_pinned(&mut self, id: i64, pinned: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE snapshots SET pinned = ?2 WHERE id = ?1",
            params![id, pinned],
        )?;
        Ok(())
    }

    pub fn generation_counts(&self, id: i64) -> Result<DeltaCounts> {
        let count = |table: &str| -> rusqlite::Result<usize> {
            self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE snapshot_id = ?1"),
                params![id],
                |row| row.get::<_, i64>(0).map(|n| n as usize),
            )
        };

        Ok(DeltaCounts {
            channels: count("snapshot_channels")?,
            roles: count("snapshot_roles")?,
            overwrites: count("snapshot_overwrites")?,
            bans: count("snapshot_bans")?,
        })
    }

    pub fn load_channel_rows(&self, snapshot_ids: &[i64]) -> Result<Vec<DeltaRow<Channel>>> {
        let sql = format!(
            "SELECT snapshot_id, deleted, hash, channel_id, kind, name, position, topic, nsfw, parent_id
             FROM snapshot_channels
             WHERE snapshot_id IN ({})
             ORDER BY snapshot_id ASC",
            id_list(snapshot_ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DeltaRow {
                    snapshot_id: row.get(0)?,
                    deleted: row.get(1)?,
                    hash: row.get(2)?,
                    entity: Channel {
                        id: row.get(3)?,
                        kind: row.get(4)?,
                        name: row.get(5)?,
                        position: row.get(6)?,
                        topic: row.get(7)?,
                        nsfw: row.get(8)?,
                        parent_id: row.get(9)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn load_role_rows(&self, snapshot_ids: &[i64]) -> Result<Vec<DeltaRow<Role>>> {
        let sql = format!(
            "SELECT snapshot_id, deleted, hash, role_id, name, color, hoist, position, permissions, managed
             FROM snapshot_roles
             WHERE snapshot_id IN ({})
             ORDER BY snapshot_id ASC",
            id_list(snapshot_ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let permissions: String = row.get(8)?;
                Ok(DeltaRow {
                    snapshot_id: row.get(0)?,
                    deleted: row.get(1)?,
                    hash: row.get(2)?,
                    entity: Role {
                        id: row.get(3)?,
                        name: row.get(4)?,
                        color: row.get(5)?,
                        hoist: row.get(6)?,
                        position: row.get(7)?,
                        permissions: permissions.parse().unwrap_or(0),
                        managed: row.get(9)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn load_overwrite_rows(&self, snapshot_ids: &[i64]) -> Result<Vec<DeltaRow<Overwrite>>> {
        let sql = format!(
            "SELECT snapshot_id, deleted, hash, channel_id, role_id, allow, deny
             FROM snapshot_overwrites
             WHERE snapshot_id IN ({})
             ORDER BY snapshot_id ASC",
            id_list(snapshot_ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let allow: String = row.get(5)?;
                let deny: String = row.get(6)?;
                Ok(DeltaRow {
                    snapshot_id: row.get(0)?,
                    deleted: row.get(1)?,
                    hash: row.get(2)?,
                    entity: Overwrite {
                        channel_id: row.get(3)?,
                        role_id: row.get(4)?,
                        allow: allow.parse().unwrap_or(0),
                        deny: deny.parse().unwrap_or(0),
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn load_ban_rows(&self, snapshot_ids: &[i64]) -> Result<Vec<DeltaRow<Ban>>> {
        let sql = format!(
            "SELECT snapshot_id, deleted, hash, user_id, reason
             FROM snapshot_bans
             WHERE snapshot_id IN ({})
             ORDER BY snapshot_id ASC",
            id_list(snapshot_ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DeltaRow {
                    snapshot_id: row.get(0)?,
                    deleted: row.get(1)?,
                    hash: row.get(2)?,
                    entity: Ban {
                        user_id: row.get(3)?,
                        reason: row.get(4)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete the newest generation of a guild: its delta rows carry no
    /// information any later generation depends on, so everything is dropped
    /// outright.
    pub fn remove_generation(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        let removed: rusqlite::Result<()> = (|| {
            for table in DELTA_TABLES {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE snapshot_id = ?1"),
                    params![id],
                )?;
            }
            tx.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
            Ok(())
        })();

        match removed {
            Ok(()) => tx.commit().map_err(Error::Transaction),
            Err(e) => Err(Error::Transaction(e)),
        }
    }

    /// Delete a non-newest generation, merging forward: rows whose key is
    /// superseded in the next generation are dropped, the rest are
    /// reassigned to the next generation so later reconstructions still see
    /// them.
    pub fn merge_generation_forward(&mut self, id: i64, next_id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        let merged: rusqlite::Result<()> = (|| {
            forward_merge_kind(&tx, "snapshot_channels", "channel_id", id, next_id)?;
            forward_merge_kind(&tx, "snapshot_roles", "role_id", id, next_id)?;
            forward_merge_overwrites(&tx, id, next_id)?;
            forward_merge_kind(&tx, "snapshot_bans", "user_id", id, next_id)?;
            tx.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
            Ok(())
        })();

        match merged {
            Ok(()) => tx.commit().map_err(Error::Transaction),
            Err(e) => Err(Error::Transaction(e)),
        }
    }
}

const DELTA_TABLES: [&str; 4] = [
    "snapshot_channels",
    "snapshot_roles",
    "snapshot_overwrites",
    "snapshot_bans",
];

fn forward_merge_kind(
    tx: &Transaction,
    table: &str,
    key_column: &str,
    id: i64,
    next_id: i64,
) -> rusqlite::Result<()> {
    // superseded: the next generation already has its own delta for this key
    tx.execute(
        &format!(
            "DELETE FROM {table}
             WHERE snapshot_id = ?1
               AND {key_column} IN (SELECT {key_column} FROM {table} WHERE snapshot_id = ?2)"
        ),
        params![id, next_id],
    )?;
    // still needed: carry forward into the next generation
    tx.execute(
        &format!("UPDATE {table} SET snapshot_id = ?2 WHERE snapshot_id = ?1"),
        params![id, next_id],
    )?;
    // safety net; the update above should leave nothing behind
    tx.execute(
        &format!("DELETE FROM {table} WHERE snapshot_id = ?1"),
        params![id],
    )?;
    Ok(())
}

fn forward_merge_overwrites(tx: &Transaction, id: i64, next_id: i64) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM snapshot_overwrites
         WHERE snapshot_id = ?1
           AND (channel_id, role_id) IN
               (SELECT channel_id, role_id FROM snapshot_overwrites WHERE snapshot_id = ?2)",
        params![id, next_id],
    )?;
    tx.execute(
        "UPDATE snapshot_overwrites SET snapshot_id = ?2 WHERE snapshot_id = ?1",
        params![id, next_id],
    )?;
    tx.execute(
        "DELETE FROM snapshot_overwrites WHERE snapshot_id = ?1",
        params![id],
    )?;
    Ok(())
}

fn insert_channel_deltas(
    tx: &Transaction,
    snapshot_id: i64,
    deltas: &[Delta<Channel>],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO snapshot_channels
            (snapshot_id, channel_id, kind, name, position, topic, nsfw, parent_id, deleted, hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for delta in deltas {
        let c = &delta.entity;
        stmt.execute(params![
            snapshot_id,
            c.id,
            c.kind,
            c.name,
            c.position,
            c.topic,
            c.nsfw,
            c.parent_id,
            delta.deleted,
            delta.hash,
        ])?;
    }
    Ok(())
}

fn insert_role_deltas(
    tx: &Transaction,
    snapshot_id: i64,
    deltas: &[Delta<Role>],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO snapshot_roles
            (snapshot_id, role_id, name, color, hoist, position, permissions, managed, deleted, hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for delta in deltas {
        let r = &delta.entity;
        stmt.execute(params![
            snapshot_id,
            r.id,
            r.name,
            r.color,
            r.hoist,
            r.position,
            r.permissions.to_string(),
            r.managed,
            delta.deleted,
            delta.hash,
        ])?;
    }
    Ok(())
}

fn insert_overwrite_deltas(
    tx: &Transaction,
    snapshot_id: i64,
    deltas: &[Delta<Overwrite>],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO snapshot_overwrites
            (snapshot_id, channel_id, role_id, allow, deny, deleted, hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for delta in deltas {
        let o = &delta.entity;
        stmt.execute(params![
            snapshot_id,
            o.channel_id,
            o.role_id,
            o.allow.to_string(),
            o.deny.to_string(),
            delta.deleted,
            delta.hash,
        ])?;
    }
    Ok(())
}

fn insert_ban_deltas(
    tx: &Transaction,
    snapshot_id: i64,
    deltas: &[Delta<Ban>],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO snapshot_bans (snapshot_id, user_id, reason, deleted, hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for delta in deltas {
        stmt.execute(params![
            snapshot_id,
            delta.entity.user_id,
            delta.entity.reason,
            delta.deleted,
            delta.hash,
        ])?;
    }
    Ok(())
}

fn id_list(ids: &[i64]) -> String {
    if ids.is_empty() {
        // `IN (NULL)` matches nothing; `IN ()` is a syntax error
        return "NULL".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn meta_from_row(row: &Row) -> rusqlite::Result<SnapshotMeta> {
    let kind_code: i64 = row.get(2)?;
    Ok(SnapshotMeta {
        id: row.get(0)?,
        guild_id: row.get(1)?,
        kind: SnapshotKind::from_code(kind_code).unwrap_or(SnapshotKind::Manual),
        pinned: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    fn channel(id: &str, name: &str) -> Channel {
        Channel {
            id: id.to_string(),
            kind: 0,
            name: name.to_string(),
            position: 0,
            topic: None,
            nsfw: false,
            parent_id: None,
        }
    }

    fn delta<T: Entity>(entity: T, deleted: bool) -> Delta<T> {
        let hash = entity.fingerprint().unwrap();
        Delta {
            deleted,
            hash,
            entity,
        }
    }

    fn generation_of_channels(channels: Vec<Delta<Channel>>) -> GenerationDeltas {
        GenerationDeltas {
            channels,
            ..GenerationDeltas::default()
        }
    }

    #[test]
    fn generations_get_monotonic_ids() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &GenerationDeltas::default())
            .unwrap();
        let second = store
            .insert_generation("g1", SnapshotKind::Manual, 200, &GenerationDeltas::default())
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn list_is_newest_first_and_per_guild() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &GenerationDeltas::default())
            .unwrap();
        let b = store
            .insert_generation("g1", SnapshotKind::Scheduled, 200, &GenerationDeltas::default())
            .unwrap();
        store
            .insert_generation("g2", SnapshotKind::Manual, 300, &GenerationDeltas::default())
            .unwrap();

        let list = store.list_snapshots("g1").unwrap();
        assert_eq!(list.iter().map(|s| s.id).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(list[0].kind, SnapshotKind::Scheduled);
    }

    #[test]
    fn delta_rows_round_trip() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation_of_channels(vec![
            delta(channel("1", "general"), false),
            delta(channel("2", "voice"), true),
        ]);
        let id = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &generation)
            .unwrap();

        let rows = store.load_channel_rows(&[id]).unwrap();
        assert_eq!(rows.len(), 2);
        let tombstone = rows.iter().find(|r| r.entity.id == "2").unwrap();
        assert!(tombstone.deleted);
        assert_eq!(rows[0].snapshot_id, id);
    }

    #[test]
    fn duplicate_key_in_one_generation_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation_of_channels(vec![
            delta(channel("1", "general"), false),
            delta(channel("1", "general"), false),
        ]);
        let err = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &generation)
            .unwrap_err();
        assert!(matches!(err, Error::Transaction(_)));

        // nothing from the failed generation is visible
        assert!(store.list_snapshots("g1").unwrap().is_empty());
    }

    #[test]
    fn guild_resolution() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &GenerationDeltas::default())
            .unwrap();
        assert_eq!(store.guild_for_snapshot(id).unwrap().as_deref(), Some("g1"));
        assert_eq!(store.guild_for_snapshot(id + 50).unwrap(), None);
    }

    #[test]
    fn pin_flag_persists() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &GenerationDeltas::default())
            .unwrap();
        store.set_pinned(id, true).unwrap();
        assert!(store.get_snapshot(id).unwrap().unwrap().pinned);
    }

    #[test]
    fn remove_generation_drops_rows_and_metadata() {
        let mut store = Store::open_in_memory().unwrap();
        let generation = generation_of_channels(vec![delta(channel("1", "general"), false)]);
        let id = store
            .insert_generation("g1", SnapshotKind::Manual, 100, &generation)
            .unwrap();

        store.remove_generation(id).unwrap();
        assert!(store.get_snapshot(id).unwrap().is_none());
        assert!(store.load_channel_rows(&[id]).unwrap().is_empty());
    }

    #[test]
    fn forward_merge_reassigns_unsuperseded_rows() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store
            .insert_generation(
                "g1",
                SnapshotKind::Manual,
                100,
                &generation_of_channels(vec![
                    delta(channel("1", "general"), false),
                    delta(channel("2", "voice"), false),
                ]),
            )
            .unwrap();
        // next generation supersedes channel 1 only
        let second = store
            .insert_generation(
                "g1",
                SnapshotKind::Manual,
                200,
                &generation_of_channels(vec![delta(channel("1", "renamed"), false)]),
            )
            .unwrap();

        store.merge_generation_forward(first, second).unwrap();

        assert!(store.get_snapshot(first).unwrap().is_none());
        let rows = store.load_channel_rows(&[second]).unwrap();
        assert_eq!(rows.len(), 2);
        let carried = rows.iter().find(|r| r.entity.id == "2").unwrap();
        assert_eq!(carried.snapshot_id, second);
        let superseded = rows.iter().find(|r| r.entity.id == "1").unwrap();
        assert_eq!(superseded.entity.name, "renamed");
    }
}
