//! Type strings and their canonical, content-addressed form.
//!
//! Objects are saved under a raw type string such as
//! `KBaseGenomes.Genome-8.2`. The version tag after `-` says nothing about
//! structure, so comparisons always go through a [`CanonicalType`]: the
//! qualified `Module.Type` name paired with the digest of its schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::SchemaDigest;
use crate::error::TypeError;

/// A parsed `Module.Type[-version]` string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeString {
    module: String,
    name: String,
    version: Option<String>,
}

impl TypeString {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `Module.Type` without the version tag.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl FromStr for TypeString {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| TypeError::InvalidTypeString {
            type_string: s.to_string(),
            reason: reason.to_string(),
        };

        let (qualified, version) = match s.split_once('-') {
            Some((q, v)) if v.is_empty() => return Err(fail(&format!("empty version after {q:?}"))),
            Some((q, v)) => (q, Some(v.to_string())),
            None => (s, None),
        };
        let (module, name) = qualified
            .split_once('.')
            .ok_or_else(|| fail("expected Module.Type"))?;
        if module.is_empty() || name.is_empty() || name.contains('.') {
            return Err(fail("expected Module.Type"));
        }
        let valid = |part: &str| part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid(module) || !valid(name) {
            return Err(fail("module and type names must be alphanumeric"));
        }

        Ok(Self {
            module: module.to_string(),
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for TypeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "-{version}")?;
        }
        Ok(())
    }
}

/// Content-addressed type identity.
///
/// Equality covers both the qualified name and the schema digest, so two
/// version tags of one type compare equal exactly when their schemas match.
/// `is_a` checks only the qualified name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalType {
    name: String,
    digest: SchemaDigest,
}

impl CanonicalType {
    pub fn new(qualified_name: impl Into<String>, digest: SchemaDigest) -> Self {
        Self {
            name: qualified_name.into(),
            digest,
        }
    }

    /// `Module.Type`.
    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    pub fn digest(&self) -> &SchemaDigest {
        &self.digest
    }

    pub fn is_a(&self, qualified_name: &str) -> bool {
        self.name == qualified_name
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.digest)
    }
}

impl FromStr for CanonicalType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: TypeString = s.parse()?;
        let hex = parsed.version().ok_or_else(|| TypeError::InvalidTypeString {
            type_string: s.to_string(),
            reason: "canonical types carry a schema digest".into(),
        })?;
        Ok(Self::new(parsed.qualified_name(), SchemaDigest::from_hex(hex)?))
    }
}

impl Serialize for CanonicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CanonicalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
