use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gda_types::{ObjectInfo, ObjectRef, ProvenanceAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored object version: metadata, payload, outgoing references and
/// provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub info: ObjectInfo,
    pub data: Value,
    /// Versions this object refers to. Drives referrer lookups.
    #[serde(default)]
    pub refs: Vec<ObjectRef>,
    #[serde(default)]
    pub provenance: Vec<ProvenanceAction>,
}

impl StoredRecord {
    /// Build a record with default metadata.
    ///
    /// The workspace is named `ws<id>`, the save date is the Unix epoch and
    /// outgoing references are collected from the payload.
    pub fn new(
        reference: ObjectRef,
        name: impl Into<String>,
        type_string: impl Into<String>,
        data: Value,
    ) -> Self {
        let refs = collect_refs(&data);
        Self {
            info: ObjectInfo {
                reference,
                name: name.into(),
                type_string: type_string.into(),
                save_date: DateTime::<Utc>::UNIX_EPOCH,
                saved_by: "gda".into(),
                workspace_name: format!("ws{}", reference.workspace_id()),
                checksum: String::new(),
                size: data.to_string().len() as u64,
                metadata: BTreeMap::new(),
            },
            data,
            refs,
            provenance: Vec::new(),
        }
    }

    pub fn in_workspace(mut self, name: impl Into<String>) -> Self {
        self.info.workspace_name = name.into();
        self
    }

    pub fn with_refs(mut self, refs: Vec<ObjectRef>) -> Self {
        self.refs = refs;
        self
    }

    pub fn with_provenance(mut self, provenance: Vec<ProvenanceAction>) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn reference(&self) -> ObjectRef {
        self.info.reference
    }
}

/// Every string in `value` that parses as a pinned `ws/obj/ver` reference,
/// deduplicated in first-seen order.
pub fn collect_refs(value: &Value) -> Vec<ObjectRef> {
    fn walk(value: &Value, out: &mut Vec<ObjectRef>) {
        match value {
            Value::String(s) => {
                if let Ok(r) = s.parse::<ObjectRef>() {
                    if !out.contains(&r) {
                        out.push(r);
                    }
                }
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(value, &mut out);
    out
}
