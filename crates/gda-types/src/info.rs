use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::reference::ObjectRef;
use crate::typename::TypeString;

/// Metadata describing one stored object version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub reference: ObjectRef,
    pub name: String,
    /// Raw type string as saved, e.g. `KBaseGenomes.Genome-8.2`.
    pub type_string: String,
    pub save_date: DateTime<Utc>,
    pub saved_by: String,
    pub workspace_name: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ObjectInfo {
    pub fn parsed_type(&self) -> Result<TypeString, TypeError> {
        self.type_string.parse()
    }
}

/// One step of the provenance recorded when an object was saved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceAction {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub service_ver: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_refs: Vec<String>,
    #[serde(default)]
    pub resolved_refs: Vec<ObjectRef>,
}
