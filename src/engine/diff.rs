//! Live-state diffing.
//!
//! Compares normalized live entities against the reconstruction of the
//! latest generation and emits the minimal delta set: absent key means
//! CREATE, changed fingerprint means UPDATE, identical fingerprint emits
//! nothing, and keys present only in the prior state become tombstones.

use std::collections::{HashMap, HashSet};

use crate::entity::{Entity, Role};
use crate::error::Result;
use crate::store::Delta;

use super::reconstruct::Versioned;

/// Diff one entity kind. `suppress_tombstone` lets role diffing skip
/// tombstones for bot-managed roles, whose timelines end only with the
/// integration itself.
pub(crate) fn diff_entities<T: Entity + Clone>(
    live: &[T],
    prior: &HashMap<String, Versioned<T>>,
    suppress_tombstone: impl Fn(&T) -> bool,
) -> Result<Vec<Delta<T>>> {
    let mut deltas = Vec::new();
    let mut live_keys = HashSet::new();

    for entity in live {
        let key = entity.key();
        live_keys.insert(key.clone());

        let hash = entity.fingerprint()?;
        match prior.get(&key) {
            // unchanged: persisting it would only waste storage
            Some(existing) if existing.hash == hash => {}
            _ => deltas.push(Delta {
                deleted: false,
                hash,
                entity: entity.clone(),
            }),
        }
    }

    for (key, existing) in prior {
        if live_keys.contains(key) || suppress_tombstone(&existing.entity) {
            continue;
        }
        deltas.push(Delta {
            deleted: true,
            hash: existing.hash.clone(),
            entity: existing.entity.clone(),
        });
    }

    deltas.sort_by_key(|delta| delta.entity.key());
    Ok(deltas)
}

/// Discord moves the bot's own role around as a side effect of its role
/// management. If the bot's top role is not the highest in the guild,
/// virtually raise it above the current maximum before diffing so that
/// these reorderings never produce churn.
pub(crate) fn raise_bot_role(roles: &mut [Role], bot_role_ids: &HashSet<String>) {
    let Some(highest) = roles.iter().map(|role| role.position).max() else {
        return;
    };
    let Some(bot_top) = roles
        .iter()
        .enumerate()
        .filter(|(_, role)| bot_role_ids.contains(&role.id))
        .max_by_key(|(_, role)| role.position)
        .map(|(index, _)| index)
    else {
        return;
    };

    if roles[bot_top].position < highest {
        roles[bot_top].position = highest + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconstruct::index;
    use crate::entity::Channel;

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

    fn role(id: &str, position: i64, managed: bool) -> Role {
        Role {
            id: id.to_string(),
            name: format!("role-{id}"),
            color: 0,
            hoist: false,
            position,
            permissions: 0,
            managed,
        }
    }

    fn versioned<T: Entity>(entity: T) -> Versioned<T> {
        let hash = entity.fingerprint().unwrap();
        Versioned { hash, entity }
    }

    #[test]
    fn unknown_key_becomes_create() {
        let deltas = diff_entities(&[channel("1", "general")], &HashMap::new(), |_| false).unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(!deltas[0].deleted);
    }

    #[test]
    fn changed_fingerprint_becomes_update() {
        let prior = index(vec![versioned(channel("1", "general"))]);
        let deltas = diff_entities(&[channel("1", "renamed")], &prior, |_| false).unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(!deltas[0].deleted);
        assert_eq!(deltas[0].entity.name, "renamed");
    }

    #[test]
    fn identical_fingerprint_emits_nothing() {
        let prior = index(vec![versioned(channel("1", "general"))]);
        let deltas = diff_entities(&[channel("1", "general")], &prior, |_| false).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn missing_entity_becomes_tombstone() {
        let prior = index(vec![versioned(channel("1", "general"))]);
        let deltas = diff_entities(&[], &prior, |_| false).unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].deleted);
        assert_eq!(deltas[0].entity.id, "1");
    }

    #[test]
    fn managed_roles_are_never_tombstoned() {
        let prior = index(vec![
            versioned(role("bot", 1, true)),
            versioned(role("human", 2, false)),
        ]);
        let deltas = diff_entities(&[], &prior, |role: &Role| role.managed).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].entity.id, "human");
    }

    #[test]
    fn deltas_are_sorted_by_key() {
        let live = vec![channel("9", "a"), channel("1", "b"), channel("5", "c")];
        let deltas = diff_entities(&live, &HashMap::new(), |_| false).unwrap();
        let keys: Vec<String> = deltas.iter().map(|d| d.entity.id.clone()).collect();
        assert_eq!(keys, vec!["1", "5", "9"]);
    }

    #[test]
    fn bot_role_below_top_is_raised() {
        let mut roles = vec![role("admin", 5, false), role("bot", 2, true)];
        let bot_ids: HashSet<String> = ["bot".to_string()].into();
        raise_bot_role(&mut roles, &bot_ids);
        assert_eq!(roles[1].position, 6);
    }

    #[test]
    fn bot_role_already_on_top_is_untouched() {
        let mut roles = vec![role("admin", 5, false), role("bot", 9, true)];
        let bot_ids: HashSet<String> = ["bot".to_string()].into();
        raise_bot_role(&mut roles, &bot_ids);
        assert_eq!(roles[1].position, 9);
    }

    #[test]
    fn missing_bot_role_is_a_no_op() {
        let mut roles = vec![role("admin", 5, false)];
        raise_bot_role(&mut roles, &HashSet::new());
        assert_eq!(roles[0].position, 5);
    }
}
