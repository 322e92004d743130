//! Canonical entity fingerprinting.
//!
//! Change detection between captures compares digests of flattened entity
//! records. Two representations of the same logical entity (live API shape
//! vs stored row) must hash identically, so entries are sorted by key before
//! digesting and the input is required to be flat.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Digest a flat field map: entries sorted by key, rendered as `key:value`
/// pairs joined by `,`, hashed with SHA-256, hex encoded.
///
/// A nested object or array value is a contract violation by the caller and
/// fails with `InvalidInput`.
pub fn hash_fields(fields: &Map<String, Value>) -> Result<String> {
    if let Some((key, _)) = fields
        .iter()
        .find(|(_, value)| value.is_object() || value.is_array())
    {
        return Err(Error::InvalidInput(format!(
            "field '{key}' is nested; hash_fields only accepts flattened structures"
        )));
    }

    let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let flat = entries
        .iter()
        .map(|(key, value)| format!("{key}:{}", render_scalar(value)))
        .collect::<Vec<_>>()
        .join(",");

    Ok(hex::encode(Sha256::digest(flat.as_bytes())))
}

/// Strings render without quotes so that `name:general` is stable regardless
/// of which side of the json boundary the value came from.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = fields(&[
            ("name", json!("general")),
            ("position", json!(3)),
            ("nsfw", json!(false)),
        ]);
        let b = fields(&[
            ("nsfw", json!(false)),
            ("name", json!("general")),
            ("position", json!(3)),
        ]);
        assert_eq!(hash_fields(&a).unwrap(), hash_fields(&b).unwrap());
    }

    #[test]
    fn digest_is_fixed_length_hex() {
        let digest = hash_fields(&fields(&[("id", json!("1"))])).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn value_changes_change_the_digest() {
        let a = fields(&[("name", json!("general"))]);
        let b = fields(&[("name", json!("renamed"))]);
        assert_ne!(hash_fields(&a).unwrap(), hash_fields(&b).unwrap());
    }

    #[test]
    fn null_and_absent_are_distinct() {
        let with_null = fields(&[("topic", json!(null))]);
        let empty = fields(&[]);
        assert_ne!(
            hash_fields(&with_null).unwrap(),
            hash_fields(&empty).unwrap()
        );
    }

    #[test]
    fn nested_object_is_rejected() {
        let nested = fields(&[("tags", json!({"bot_id": "1"}))]);
        let err = hash_fields(&nested).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn nested_array_is_rejected() {
        let nested = fields(&[("roles", json!(["1", "2"]))]);
        assert!(hash_fields(&nested).is_err());
    }
}
