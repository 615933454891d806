//! Content hashing for configuration identity.
//!
//! A configuration's identity is the SHA-256 of its canonical JSON
//! rendering. `serde_json` maps are key-sorted, so two configurations
//! that serialize to the same JSON value share a hash regardless of how
//! they were constructed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A content-addressed hash of a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute a content hash from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{hash:x}"))
    }

    /// Hash the canonical JSON rendering of any serializable value.
    pub fn of_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_value(value)?;
        Ok(Self::from_bytes(&serde_json::to_vec(&canonical)?))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_hash() {
        let a: serde_json::Value = serde_json::from_str(r#"{"id":"x","version":"1"}"#).expect("json");
        let b: serde_json::Value = serde_json::from_str(r#"{"version":"1","id":"x"}"#).expect("json");
        assert_eq!(
            ContentHash::of_json(&a).expect("hash"),
            ContentHash::of_json(&b).expect("hash")
        );
    }

    #[test]
    fn content_change_changes_hash() {
        let a = ContentHash::of_json(&json!({"rules": []})).expect("hash");
        let b = ContentHash::of_json(&json!({"rules": [{"id": "r"}]})).expect("hash");
        assert_ne!(a, b);
        assert_eq!(a.0.len(), 64);
    }
}
