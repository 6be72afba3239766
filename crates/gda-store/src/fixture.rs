//! JSON fixtures for populating the in-memory stores.
//!
//! A fixture is either a bare list of objects or a document with `objects`,
//! optional `schemas` (type string to schema document) and optional
//! `handles` (handle reference to blob node id):
//!
//! ```json
//! {
//!   "objects": [
//!     {"ref": "1/2/1", "name": "kb|g.0", "type": "KBaseGenomes.Genome-8.0",
//!      "workspace": "ReferenceGenomes", "data": {"features": []}}
//!   ],
//!   "handles": {"KBH_7": "node-7"}
//! }
//! ```
//!
//! Outgoing references default to every pinned `ws/obj/ver` string found in
//! an object's `data`; list them under `refs` to override.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use gda_types::{ObjectRef, ProvenanceAction};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::blob::InMemoryHandleResolver;
use crate::error::StoreResult;
use crate::memory::InMemoryObjectStore;
use crate::record::StoredRecord;

/// One object entry in a fixture file.
#[derive(Clone, Debug, Deserialize)]
pub struct FixtureObject {
    #[serde(rename = "ref")]
    pub reference: ObjectRef,
    pub name: String,
    #[serde(rename = "type")]
    pub type_string: String,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub saved_by: Option<String>,
    #[serde(default)]
    pub save_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub refs: Option<Vec<ObjectRef>>,
    #[serde(default)]
    pub provenance: Vec<ProvenanceAction>,
    pub data: Value,
}

impl FixtureObject {
    fn into_record(self) -> StoredRecord {
        let mut record =
            StoredRecord::new(self.reference, self.name, self.type_string, self.data)
                .with_provenance(self.provenance);
        if let Some(workspace) = self.workspace {
            record = record.in_workspace(workspace);
        }
        if let Some(refs) = self.refs {
            record = record.with_refs(refs);
        }
        if let Some(saved_by) = self.saved_by {
            record.info.saved_by = saved_by;
        }
        if let Some(save_date) = self.save_date {
            record.info.save_date = save_date;
        }
        record.info.metadata = self.metadata;
        record
    }
}

/// A parsed fixture document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Fixture {
    pub objects: Vec<FixtureObject>,
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default)]
    pub handles: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureDocument {
    Objects(Vec<FixtureObject>),
    Full(Fixture),
}

impl Fixture {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(match serde_json::from_str(json)? {
            FixtureDocument::Objects(objects) => Self {
                objects,
                ..Self::default()
            },
            FixtureDocument::Full(fixture) => fixture,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Build the stores described by this fixture.
    pub fn into_stores(self) -> StoreResult<(InMemoryObjectStore, InMemoryHandleResolver)> {
        let store = InMemoryObjectStore::new();
        let objects = self.objects.len();
        for object in self.objects {
            store.insert(object.into_record())?;
        }
        for (type_string, schema) in self.schemas {
            store.register_schema(type_string, schema)?;
        }
        let handles = InMemoryHandleResolver::from_map(self.handles);
        info!(objects, "fixture loaded");
        Ok((store, handles))
    }
}
