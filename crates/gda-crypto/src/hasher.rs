use gda_types::SchemaDigest;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a type schema and an arbitrary document with identical
/// bytes never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for type schemas.
    pub const TYPE_SCHEMA: Self = Self {
        domain: "gda-typeschema-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> SchemaDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        SchemaDigest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    ///
    /// `serde_json::Value` objects serialise with sorted keys, so two schema
    /// documents that differ only in key order hash identically.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<SchemaDigest, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let schema = b"structure { list<Feature> features; }";
        assert_eq!(
            ContentHasher::TYPE_SCHEMA.hash(schema),
            ContentHasher::TYPE_SCHEMA.hash(schema)
        );
    }

    #[test]
    fn domain_separates_from_raw_blake3() {
        let domain_hash = ContentHasher::TYPE_SCHEMA.hash(b"test");
        assert_ne!(domain_hash, SchemaDigest::from_bytes(b"test"));
        assert_ne!(domain_hash, ContentHasher { domain: "other-v1" }.hash(b"test"));
    }

    #[test]
    fn json_key_order_does_not_matter() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"features": "list", "id": "string"}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"id": "string", "features": "list"}"#).unwrap();
        assert_eq!(
            ContentHasher::TYPE_SCHEMA.hash_json(&a).unwrap(),
            ContentHasher::TYPE_SCHEMA.hash_json(&b).unwrap()
        );
    }
}
