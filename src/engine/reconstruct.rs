//! Point-in-time reconstruction.
//!
//! A snapshot's full state is the fold of every delta row at or before its
//! generation, applied in ascending generation order: a tombstone removes
//! the entity's key from the running map, anything else inserts or
//! overwrites it.

use std::collections::HashMap;

use serde::Serialize;

use crate::entity::{Ban, Channel, Entity, Overwrite, Role};
use crate::store::{DeltaRow, SnapshotMeta};

/// A reconstructed entity together with the fingerprint it was stored
/// under, so the next capture can compare without re-hashing stored state.
#[derive(Debug, Clone, Serialize)]
pub struct Versioned<T> {
    pub hash: String,
    #[serde(flatten)]
    pub entity: T,
}

/// The materialized point-in-time state of one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MaterializedSnapshot {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub channels: Vec<Versioned<Channel>>,
    pub roles: Vec<Versioned<Role>>,
    pub overwrites: Vec<Versioned<Overwrite>>,
    pub bans: Vec<Versioned<Ban>>,
}

impl MaterializedSnapshot {
    pub fn entity_count(&self) -> usize {
        self.channels.len() + self.roles.len() + self.overwrites.len() + self.bans.len()
    }
}

/// Fold delta rows (ascending generation order) into a keyed state map.
pub fn fold<T: Entity>(rows: Vec<DeltaRow<T>>) -> HashMap<String, Versioned<T>> {
    let mut state = HashMap::new();
    fold_into(&mut state, rows);
    state
}

/// Apply further generations on top of an existing state map.
pub fn fold_into<T: Entity>(state: &mut HashMap<String, Versioned<T>>, rows: Vec<DeltaRow<T>>) {
    for row in rows {
        let key = row.entity.key();
        if row.deleted {
            state.remove(&key);
        } else {
            state.insert(
                key,
                Versioned {
                    hash: row.hash,
                    entity: row.entity,
                },
            );
        }
    }
}

/// Key-index a materialized entity list for diffing.
pub fn index<T: Entity>(values: Vec<Versioned<T>>) -> HashMap<String, Versioned<T>> {
    values
        .into_iter()
        .map(|versioned| (versioned.entity.key(), versioned))
        .collect()
}

/// Deterministic output order, sorted by entity key.
pub(crate) fn sorted_values<T: Entity>(state: HashMap<String, Versioned<T>>) -> Vec<Versioned<T>> {
    let mut values: Vec<_> = state.into_values().collect();
    values.sort_by_key(|versioned| versioned.entity.key());
    values
}
