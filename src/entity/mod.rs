//! Canonical entity shapes.
//!
//! Live API objects and stored snapshot rows both project into these minimal
//! shapes, with defaults filled for optional fields, so that fingerprints are
//! stable regardless of which side an entity came from. Permission bitfields
//! are held as unsigned integers internally and only rendered as base-10
//! strings at serialization boundaries.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::discord::{LiveBan, LiveChannel, LiveOverwrite, LiveRole};
use crate::error::{Error, Result};
use crate::hash;

/// Channel kinds eligible for capture: text, voice, category, announcement,
/// stage and forum. Threads and DM kinds are silently skipped.
pub const CAPTURED_CHANNEL_KINDS: [i64; 6] = [0, 2, 4, 5, 13, 15];

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_BAN_REASON: &str = "No reason provided";

/// Common surface of the four captured entity kinds: a stable key within the
/// guild and a flat field projection for fingerprinting.
pub trait Entity {
    fn key(&self) -> String;
    fn flat_fields(&self) -> Map<String, Value>;

    fn fingerprint(&self) -> Result<String> {
        hash::hash_fields(&self.flat_fields())
    }
}

/// Bitfields serialize as decimal strings; consumers on the far side of a
/// json boundary cannot be trusted with 64-bit numbers.
mod u64_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}

fn parse_bitfield(raw: Option<&str>, what: &str) -> Result<u64> {
    match raw {
        None => Ok(0),
        Some(text) => text
            .parse::<u64>()
            .map_err(|_| Error::upstream(0, format!("{what} bitfield is not a base-10 integer: {text:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: String,
    pub kind: i64,
    pub name: String,
    pub position: i64,
    pub topic: Option<String>,
    pub nsfw: bool,
    pub parent_id: Option<String>,
}

impl Channel {
    pub fn from_live(live: &LiveChannel) -> Self {
        Channel {
            id: live.id.clone(),
            kind: live.kind,
            name: live.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string()),
            position: live.position.unwrap_or(0),
            topic: live.topic.clone(),
            nsfw: live.nsfw.unwrap_or(false),
            parent_id: live.parent_id.clone(),
        }
    }

    pub fn is_captured_kind(kind: i64) -> bool {
        CAPTURED_CHANNEL_KINDS.contains(&kind)
    }
}

impl Entity for Channel {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn flat_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), json!(self.id));
        fields.insert("type".into(), json!(self.kind));
        fields.insert("name".into(), json!(self.name));
        fields.insert("position".into(), json!(self.position));
        fields.insert("topic".into(), json!(self.topic));
        fields.insert("nsfw".into(), json!(self.nsfw));
        fields.insert("parent_id".into(), json!(self.parent_id));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub color: i64,
    pub hoist: bool,
    pub position: i64,
    #[serde(with = "u64_string")]
    pub permissions: u64,
    pub managed: bool,
}

impl Role {
    pub fn from_live(live: &LiveRole) -> Result<Self> {
        Ok(Role {
            id: live.id.clone(),
            name: live.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string()),
            color: live.color,
            hoist: live.hoist,
            position: live.position,
            permissions: parse_bitfield(live.permissions.as_deref(), "role permissions")?,
            managed: live.managed,
        })
    }
}

impl Entity for Role {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn flat_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), json!(self.id));
        fields.insert("name".into(), json!(self.name));
        fields.insert("color".into(), json!(self.color));
        fields.insert("hoist".into(), json!(self.hoist));
        fields.insert("position".into(), json!(self.position));
        fields.insert("permissions".into(), json!(self.permissions.to_string()));
        fields.insert("managed".into(), json!(self.managed));
        fields
    }
}

/// Composite key for a channel-level permission overwrite.
pub fn overwrite_key(channel_id: &str, role_id: &str) -> String {
    format!("{channel_id}-{role_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overwrite {
    pub channel_id: String,
    pub role_id: String,
    #[serde(with = "u64_string")]
    pub allow: u64,
    #[serde(with = "u64_string")]
    pub deny: u64,
}

impl Overwrite {
    pub fn from_live(channel_id: &str, live: &LiveOverwrite) -> Result<Self> {
        Ok(Overwrite {
            channel_id: channel_id.to_string(),
            role_id: live.id.clone(),
            allow: parse_bitfield(live.allow.as_deref(), "overwrite allow")?,
            deny: parse_bitfield(live.deny.as_deref(), "overwrite deny")?,
        })
    }

    /// An overwrite that allows nothing and denies nothing carries no
    /// information; absence reconstructs identically, so these are never
    /// captured.
    pub fn is_default(&self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

impl Entity for Overwrite {
    fn key(&self) -> String {
        overwrite_key(&self.channel_id, &self.role_id)
    }

    fn flat_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), json!(self.key()));
        fields.insert("channel_id".into(), json!(self.channel_id));
        fields.insert("role_id".into(), json!(self.role_id));
        fields.insert("allow".into(), json!(self.allow.to_string()));
        fields.insert("deny".into(), json!(self.deny.to_string()));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ban {
    pub user_id: String,
    pub reason: String,
}

impl Ban {
    pub fn from_live(live: &LiveBan) -> Self {
        Ban {
            user_id: live.user.id.clone(),
            reason: live
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_BAN_REASON.to_string()),
        }
    }
}

impl Entity for Ban {
    fn key(&self) -> String {
        self.user_id.clone()
    }

    fn flat_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("user_id".into(), json!(self.user_id));
        fields.insert("reason".into(), json!(self.reason));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::LiveUser;

    fn bare_channel(id: &str) -> LiveChannel {
        LiveChannel {
            id: id.to_string(),
            kind: 0,
            name: None,
            position: None,
            topic: None,
            nsfw: None,
            parent_id: None,
            permission_overwrites: Vec::new(),
        }
    }

    #[test]
    fn channel_defaults_fill_missing_fields() {
        let channel = Channel::from_live(&bare_channel("42"));
        assert_eq!(channel.name, "Unknown");
        assert_eq!(channel.position, 0);
        assert_eq!(channel.topic, None);
        assert!(!channel.nsfw);
        assert_eq!(channel.key(), "42");
    }

    #[test]
    fn equal_channels_fingerprint_identically() {
        let a = Channel::from_live(&bare_channel("42"));
        let b = Channel {
            id: "42".to_string(),
            kind: 0,
            name: "Unknown".to_string(),
            position: 0,
            topic: None,
            nsfw: false,
            parent_id: None,
        };
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn role_parses_decimal_permission_strings() {
        let role = Role::from_live(&LiveRole {
            id: "1".to_string(),
            name: Some("mods".to_string()),
            color: 0xff0000,
            hoist: true,
            position: 3,
            permissions: Some("8".to_string()),
            managed: false,
        })
        .unwrap();
        assert_eq!(role.permissions, 8);
    }

    #[test]
    fn role_rejects_garbage_bitfields() {
        let result = Role::from_live(&LiveRole {
            id: "1".to_string(),
            name: None,
            color: 0,
            hoist: false,
            position: 0,
            permissions: Some("not-a-number".to_string()),
            managed: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn overwrite_key_is_composite() {
        let overwrite = Overwrite {
            channel_id: "10".to_string(),
            role_id: "20".to_string(),
            allow: 1,
            deny: 0,
        };
        assert_eq!(overwrite.key(), "10-20");
    }

    #[test]
    fn zero_bitmask_overwrite_is_default() {
        let overwrite = Overwrite {
            channel_id: "10".to_string(),
            role_id: "20".to_string(),
            allow: 0,
            deny: 0,
        };
        assert!(overwrite.is_default());
    }

    #[test]
    fn ban_reason_defaults() {
        let ban = Ban::from_live(&LiveBan {
            user: LiveUser {
                id: "7".to_string(),
            },
            reason: None,
        });
        assert_eq!(ban.reason, "No reason provided");
        assert_eq!(ban.key(), "7");
    }

    #[test]
    fn thread_kinds_are_not_captured() {
        assert!(Channel::is_captured_kind(0));
        assert!(Channel::is_captured_kind(15));
        assert!(!Channel::is_captured_kind(11)); // public thread
        assert!(!Channel::is_captured_kind(1)); // dm
    }

    #[test]
    fn permissions_serialize_as_strings() {
        let role = Role {
            id: "1".to_string(),
            name: "everyone".to_string(),
            color: 0,
            hoist: false,
            position: 0,
            permissions: u64::MAX,
            managed: false,
        };
        let rendered = serde_json::to_value(&role).unwrap();
        assert_eq!(rendered["permissions"], "18446744073709551615");
    }
}
