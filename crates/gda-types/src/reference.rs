//! Object references.
//!
//! Every stored object is addressed by a `(workspace, object, version)`
//! triple of numeric ids, written `ws/obj/ver`. Callers may also hand in
//! looser forms that a store has to resolve first:
//!
//! - `name` -- a bare object name
//! - `ws/obj` -- latest version, where either side is an id or a name
//! - `ws/obj/ver` -- a specific version, sides by id or name
//!
//! Segment names follow the store's naming rules: ASCII letters, digits and
//! `_ . | -`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A canonical, version-pinned object reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    workspace_id: u64,
    object_id: u64,
    version: u64,
}

impl ObjectRef {
    pub const fn new(workspace_id: u64, object_id: u64, version: u64) -> Self {
        Self {
            workspace_id,
            object_id,
            version,
        }
    }

    pub fn workspace_id(&self) -> u64 {
        self.workspace_id
    }

    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The `(workspace, object)` pair shared by all versions of this object.
    pub fn lineage(&self) -> (u64, u64) {
        (self.workspace_id, self.object_id)
    }

    /// Same object, different version.
    pub fn with_version(&self, version: u64) -> Self {
        Self { version, ..*self }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.workspace_id, self.object_id, self.version)
    }
}

impl FromStr for ObjectRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec: ReferenceSpec = s.parse()?;
        spec.as_versioned().ok_or_else(|| TypeError::InvalidReference {
            reference: s.to_string(),
            reason: "expected numeric ws/obj/ver".into(),
        })
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One segment of a loose reference: a numeric id or a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(u64),
    Name(String),
}

impl Locator {
    fn parse(segment: &str, reference: &str) -> Result<Self, TypeError> {
        if segment.is_empty() {
            return Err(invalid(reference, "reference segments must not be empty"));
        }
        if let Some(ch) = segment.chars().find(|c| !is_name_char(*c)) {
            return Err(invalid(
                reference,
                format!("segment {segment:?} contains forbidden character {ch:?}"),
            ));
        }
        if segment.chars().all(|c| c.is_ascii_digit()) {
            let id = segment
                .parse()
                .map_err(|_| invalid(reference, format!("id {segment:?} out of range")))?;
            return Ok(Self::Id(id));
        }
        Ok(Self::Name(segment.to_string()))
    }

    pub fn as_id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A syntactically valid reference that may still need resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceSpec {
    pub workspace: Option<Locator>,
    pub object: Locator,
    pub version: Option<u64>,
}

impl ReferenceSpec {
    /// The pinned reference, if every part is already numeric.
    pub fn as_versioned(&self) -> Option<ObjectRef> {
        let workspace = self.workspace.as_ref()?.as_id()?;
        let object = self.object.as_id()?;
        Some(ObjectRef::new(workspace, object, self.version?))
    }
}

impl From<ObjectRef> for ReferenceSpec {
    fn from(r: ObjectRef) -> Self {
        Self {
            workspace: Some(Locator::Id(r.workspace_id)),
            object: Locator::Id(r.object_id),
            version: Some(r.version),
        }
    }
}

impl FromStr for ReferenceSpec {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid(s, "reference must not be empty"));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            [object] => Ok(Self {
                workspace: None,
                object: Locator::parse(object, s)?,
                version: None,
            }),
            [workspace, object] => Ok(Self {
                workspace: Some(Locator::parse(workspace, s)?),
                object: Locator::parse(object, s)?,
                version: None,
            }),
            [workspace, object, version] => {
                let version = match version.parse::<u64>() {
                    Ok(v) if v > 0 => v,
                    _ => {
                        return Err(invalid(
                            s,
                            format!("version {version:?} must be a positive integer"),
                        ))
                    }
                };
                Ok(Self {
                    workspace: Some(Locator::parse(workspace, s)?),
                    object: Locator::parse(object, s)?,
                    version: Some(version),
                })
            }
            _ => Err(invalid(s, "at most three '/'-separated segments are allowed")),
        }
    }
}

impl fmt::Display for ReferenceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ws) = &self.workspace {
            write!(f, "{ws}/")?;
        }
        write!(f, "{}", self.object)?;
        if let Some(version) = self.version {
            write!(f, "/{version}")?;
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '|' | '-')
}

fn invalid(reference: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.into(),
    }
}
