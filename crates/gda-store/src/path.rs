//! Object paths and subset extraction.
//!
//! A path names one field inside a payload as `/`-separated keys, e.g.
//! `features/kb|g.0.CDS.1`. Keys may contain any character except `/`,
//! including the `.` and `|` common in feature ids. Paths address object
//! fields only; array elements are not addressable.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::StoreError;

/// A parsed `/`-delimited path into an object payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectPath(Vec<String>);

impl ObjectPath {
    /// A single top-level field.
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Extend the path by one key.
    pub fn child(mut self, key: impl Into<String>) -> Self {
        self.0.push(key.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Look the path up in `value`.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(value, |current, key| current.as_object()?.get(key))
    }
}

impl FromStr for ObjectPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(StoreError::InvalidPath {
                path: s.to_string(),
                reason: "path must name at least one field".into(),
            });
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::InvalidPath {
                path: s.to_string(),
                reason: "path segments must not be empty".into(),
            });
        }
        Ok(Self(segments))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Copy the requested paths out of `source`, preserving their nesting.
///
/// Paths that do not exist are left out. The result is always an object.
pub fn extract_subset(source: &Value, paths: &[ObjectPath]) -> Value {
    let mut out = Map::new();
    'paths: for path in paths {
        let Some(found) = path.resolve(source) else {
            continue;
        };
        let (leaf, parents) = match path.segments().split_last() {
            Some(split) => split,
            None => continue,
        };
        let mut cursor = &mut out;
        for key in parents {
            let slot = cursor
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            cursor = match slot {
                Value::Object(map) => map,
                _ => continue 'paths,
            };
        }
        cursor.insert(leaf.clone(), found.clone());
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "taxon_ref": "1/5/1",
            "features": {
                "kb|g.0.CDS.1": {"type": "CDS", "function": "kinase"},
                "kb|g.0.CDS.2": {"type": "CDS"}
            },
            "counts_map": {"CDS": 2}
        })
    }

    #[test]
    fn parse_and_display() {
        let path: ObjectPath = "features/kb|g.0.CDS.1".parse().unwrap();
        assert_eq!(path.segments(), ["features", "kb|g.0.CDS.1"]);
        assert_eq!(path.to_string(), "features/kb|g.0.CDS.1");
        let rooted: ObjectPath = "/taxon_ref".parse().unwrap();
        assert_eq!(rooted, ObjectPath::field("taxon_ref"));
    }

    #[test]
    fn empty_paths_are_rejected() {
        assert!("".parse::<ObjectPath>().is_err());
        assert!("/".parse::<ObjectPath>().is_err());
        assert!("features//x".parse::<ObjectPath>().is_err());
    }

    #[test]
    fn subset_keeps_only_requested_fields() {
        let paths = vec![
            ObjectPath::field("features").child("kb|g.0.CDS.1"),
            ObjectPath::field("taxon_ref"),
        ];
        let subset = extract_subset(&payload(), &paths);
        assert_eq!(
            subset,
            json!({
                "taxon_ref": "1/5/1",
                "features": {"kb|g.0.CDS.1": {"type": "CDS", "function": "kinase"}}
            })
        );
    }

    #[test]
    fn missing_paths_are_omitted() {
        let paths = vec![
            ObjectPath::field("features").child("nope"),
            ObjectPath::field("assembly_ref"),
        ];
        assert_eq!(extract_subset(&payload(), &paths), json!({}));
    }

    #[test]
    fn paths_do_not_descend_into_scalars() {
        let paths = vec![ObjectPath::field("taxon_ref").child("x")];
        assert_eq!(extract_subset(&payload(), &paths), json!({}));
    }

    #[test]
    fn overlapping_paths_merge() {
        let paths = vec![
            ObjectPath::field("features").child("kb|g.0.CDS.1"),
            ObjectPath::field("features").child("kb|g.0.CDS.2"),
        ];
        let subset = extract_subset(&payload(), &paths);
        assert_eq!(subset["features"].as_object().unwrap().len(), 2);
    }
}
