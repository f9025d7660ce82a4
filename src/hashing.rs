//! Hashing System - SHA-256 over canonical JSON
//!
//! Two builds of the same configuration must hash identically, so every hash
//! is taken over key-sorted JSON with no whitespace.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::builder::PartSpec;
use crate::variants::VariantRecord;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sort_value(value)))
                    .collect(),
            )
        }
        // Feature order is meaningful; arrays keep theirs.
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Hash of the part itself: envelope, tags and face map.
pub fn fingerprint(part: &PartSpec) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(part)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Compute job hash for build logs
/// job_hash = sha256(variant_id + canonical_record + engine_version)
pub fn compute_job_hash(
    variant_id: &str,
    record: &VariantRecord,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_record = canonical_json(record)?;
    let combined = format!("{}:{}:{}", variant_id, canonical_record, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::{Family, FanParams};
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": {"y": [3, 1], "b": 2}});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":{"b":2,"y":[3,1]},"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_job_hash_tracks_record_and_engine() {
        let record = VariantRecord::new("fan", "Fan", Family::Fan(FanParams::new(80.0, 25.0)));
        let h1 = compute_job_hash("fan", &record, "1.0.0").unwrap();
        let h2 = compute_job_hash("fan", &record, "1.0.0").unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, compute_job_hash("fan", &record, "1.1.0").unwrap());

        let thinner = VariantRecord::new("fan", "Fan", Family::Fan(FanParams::new(80.0, 15.0)));
        assert_ne!(h1, compute_job_hash("fan", &thinner, "1.0.0").unwrap());
    }
}
