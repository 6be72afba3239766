use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use gda_crypto::ContentHasher;
use gda_types::{
    CanonicalType, Locator, ObjectInfo, ObjectRef, ProvenanceAction, ReferenceSpec, TypeString,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::path::{extract_subset, ObjectPath};
use crate::record::StoredRecord;
use crate::traits::ObjectStore;

/// One call made against an [`InMemoryObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreRequest {
    Resolve(String),
    GetObject(ObjectRef),
    GetSubset(ObjectRef, Vec<String>),
    Referrers(ObjectRef),
    TranslateType(String),
    Schema(String),
    History(ObjectRef),
    Provenance(ObjectRef),
}

/// In-memory versioned object store.
///
/// Intended for tests and local fixtures. Records are held behind a
/// `RwLock`; every trait call is appended to a request log so callers can
/// assert how many remote round trips an operation would have cost.
pub struct InMemoryObjectStore {
    records: RwLock<BTreeMap<ObjectRef, StoredRecord>>,
    schemas: RwLock<HashMap<String, Value>>,
    requests: Mutex<Vec<StoreRequest>>,
    available: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            schemas: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Add (or replace) one object version.
    pub fn insert(&self, record: StoredRecord) -> StoreResult<ObjectRef> {
        let reference = record.reference();
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(reference, record);
        Ok(reference)
    }

    /// Register the structural schema for a type string.
    ///
    /// A full type string (`Module.Type-1.0`) takes precedence over a bare
    /// qualified name (`Module.Type`).
    pub fn register_schema(&self, type_string: impl Into<String>, schema: Value) -> StoreResult<()> {
        let mut schemas = self.schemas.write().map_err(poisoned)?;
        schemas.insert(type_string.into(), schema);
        Ok(())
    }

    /// Simulate the store going offline. Every call fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of object versions held.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call made so far, oldest first.
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of logged calls matching `pred`.
    pub fn count_requests(&self, pred: impl Fn(&StoreRequest) -> bool) -> usize {
        self.requests().iter().filter(|r| pred(r)).count()
    }

    /// References fetched in full, in call order.
    pub fn full_fetches(&self) -> Vec<ObjectRef> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::GetObject(reference) => Some(reference),
                _ => None,
            })
            .collect()
    }

    /// Subset fetches as `(reference, paths)`, in call order.
    pub fn subset_fetches(&self) -> Vec<(ObjectRef, Vec<String>)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::GetSubset(reference, paths) => Some((reference, paths)),
                _ => None,
            })
            .collect()
    }

    /// Forget logged calls.
    pub fn clear_requests(&self) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.clear();
        }
    }

    fn record(&self, request: StoreRequest) -> StoreResult<()> {
        self.requests.lock().map_err(poisoned)?.push(request);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        }
    }

    fn with_record<T>(
        &self,
        reference: &ObjectRef,
        f: impl FnOnce(&StoredRecord) -> T,
    ) -> StoreResult<T> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(reference)
            .map(f)
            .ok_or(StoreError::ObjectNotFound(*reference))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn resolve_reference(&self, reference: &ReferenceSpec) -> StoreResult<Option<ObjectInfo>> {
        self.record(StoreRequest::Resolve(reference.to_string()))?;
        let records = self.records.read().map_err(poisoned)?;

        let matches_ws = |info: &ObjectInfo| match &reference.workspace {
            None => true,
            Some(Locator::Id(id)) => info.reference.workspace_id() == *id,
            Some(Locator::Name(name)) => info.workspace_name == *name,
        };
        let matches_obj = |info: &ObjectInfo| match &reference.object {
            Locator::Id(id) => info.reference.object_id() == *id,
            Locator::Name(name) => info.name == *name,
        };

        // Newest version per lineage among the candidates.
        let mut lineages: BTreeMap<(u64, u64), &ObjectInfo> = BTreeMap::new();
        for record in records.values() {
            let info = &record.info;
            if !matches_ws(info) || !matches_obj(info) {
                continue;
            }
            if let Some(version) = reference.version {
                if info.reference.version() != version {
                    continue;
                }
            }
            lineages
                .entry(info.reference.lineage())
                .and_modify(|best| {
                    if info.reference.version() > best.reference.version() {
                        *best = info;
                    }
                })
                .or_insert(info);
        }

        match lineages.len() {
            0 => Ok(None),
            1 => Ok(lineages.into_values().next().cloned()),
            candidates => Err(StoreError::AmbiguousReference {
                reference: reference.to_string(),
                candidates,
            }),
        }
    }

    fn get_object(&self, reference: &ObjectRef) -> StoreResult<Value> {
        self.record(StoreRequest::GetObject(*reference))?;
        debug!(reference = %reference, "full object read");
        self.with_record(reference, |r| r.data.clone())
    }

    fn get_object_subset(&self, reference: &ObjectRef, paths: &[ObjectPath]) -> StoreResult<Value> {
        self.record(StoreRequest::GetSubset(
            *reference,
            paths.iter().map(ToString::to_string).collect(),
        ))?;
        debug!(reference = %reference, paths = paths.len(), "subset read");
        self.with_record(reference, |r| extract_subset(&r.data, paths))
    }

    fn get_referrers(&self, reference: &ObjectRef) -> StoreResult<Vec<ObjectInfo>> {
        self.record(StoreRequest::Referrers(*reference))?;
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|r| r.refs.contains(reference))
            .map(|r| r.info.clone())
            .collect())
    }

    fn translate_type(&self, type_string: &str) -> StoreResult<CanonicalType> {
        self.record(StoreRequest::TranslateType(type_string.to_string()))?;
        let parsed: TypeString = type_string.parse()?;
        let qualified = parsed.qualified_name();
        let schemas = self.schemas.read().map_err(poisoned)?;
        let digest = match schemas.get(type_string).or_else(|| schemas.get(&qualified)) {
            Some(schema) => ContentHasher::TYPE_SCHEMA
                .hash_json(schema)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            // Unregistered types hash their name, so every version tag of
            // one type shares a canonical form.
            None => ContentHasher::TYPE_SCHEMA.hash(qualified.as_bytes()),
        };
        Ok(CanonicalType::new(qualified, digest))
    }

    fn get_schema(&self, type_string: &str) -> StoreResult<Option<Value>> {
        self.record(StoreRequest::Schema(type_string.to_string()))?;
        let qualified = type_string.parse::<TypeString>()?.qualified_name();
        let schemas = self.schemas.read().map_err(poisoned)?;
        Ok(schemas
            .get(type_string)
            .or_else(|| schemas.get(&qualified))
            .cloned())
    }

    fn get_history(&self, reference: &ObjectRef) -> StoreResult<Vec<ObjectInfo>> {
        self.record(StoreRequest::History(*reference))?;
        let records = self.records.read().map_err(poisoned)?;
        let history: Vec<ObjectInfo> = records
            .values()
            .filter(|r| r.info.reference.lineage() == reference.lineage())
            .map(|r| r.info.clone())
            .collect();
        if history.is_empty() {
            return Err(StoreError::ObjectNotFound(*reference));
        }
        Ok(history)
    }

    fn get_provenance(&self, reference: &ObjectRef) -> StoreResult<Vec<ProvenanceAction>> {
        self.record(StoreRequest::Provenance(*reference))?;
        self.with_record(reference, |r| r.provenance.clone())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn genome(ws: u64, obj: u64, ver: u64, name: &str) -> StoredRecord {
        StoredRecord::new(
            ObjectRef::new(ws, obj, ver),
            name,
            "KBaseGenomes.Genome-8.2",
            json!({"id": name, "version": ver}),
        )
    }

    fn store() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        store.insert(genome(1, 1, 1, "kb|g.1").in_workspace("Ref")).unwrap();
        store.insert(genome(1, 1, 2, "kb|g.1").in_workspace("Ref")).unwrap();
        store.insert(genome(1, 2, 1, "kb|g.2").in_workspace("Ref")).unwrap();
        store
    }

    fn spec(s: &str) -> ReferenceSpec {
        s.parse().unwrap()
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_pinned_reference() {
        let info = store().resolve_reference(&spec("1/1/1")).unwrap().unwrap();
        assert_eq!(info.reference, ObjectRef::new(1, 1, 1));
    }

    #[test]
    fn resolve_latest_by_name() {
        let store = store();
        let by_name = store.resolve_reference(&spec("Ref/kb|g.1")).unwrap().unwrap();
        assert_eq!(by_name.reference, ObjectRef::new(1, 1, 2));
        let bare = store.resolve_reference(&spec("kb|g.1")).unwrap().unwrap();
        assert_eq!(bare.reference, ObjectRef::new(1, 1, 2));
        let by_id = store.resolve_reference(&spec("1/1")).unwrap().unwrap();
        assert_eq!(by_id.reference, ObjectRef::new(1, 1, 2));
    }

    #[test]
    fn resolve_missing_is_none() {
        let store = store();
        assert!(store.resolve_reference(&spec("1/1/9")).unwrap().is_none());
        assert!(store.resolve_reference(&spec("Other/kb|g.1")).unwrap().is_none());
    }

    #[test]
    fn bare_name_in_two_workspaces_is_ambiguous() {
        let store = store();
        store.insert(genome(7, 1, 1, "kb|g.1")).unwrap();
        let err = store.resolve_reference(&spec("kb|g.1")).unwrap_err();
        assert!(matches!(err, StoreError::AmbiguousReference { candidates: 2, .. }));
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn get_object_and_subset() {
        let store = store();
        let r = ObjectRef::new(1, 1, 2);
        assert_eq!(store.get_object(&r).unwrap()["version"], 2);
        let subset = store
            .get_object_subset(&r, &[ObjectPath::field("id"), ObjectPath::field("missing")])
            .unwrap();
        assert_eq!(subset, json!({"id": "kb|g.1"}));
    }

    #[test]
    fn get_object_unknown_version_fails() {
        let err = store().get_object(&ObjectRef::new(1, 1, 5)).unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound(_)));
    }

    #[test]
    fn referrers_follow_payload_refs() {
        let store = store();
        let taxon = ObjectRef::new(1, 2, 1);
        store
            .insert(StoredRecord::new(
                ObjectRef::new(1, 3, 1),
                "hub",
                "KBaseGenomeAnnotations.GenomeAnnotation-1.0",
                json!({"taxon_ref": "1/2/1"}),
            ))
            .unwrap();
        let referrers = store.get_referrers(&taxon).unwrap();
        assert_eq!(referrers.len(), 1);
        assert_eq!(referrers[0].name, "hub");
        assert!(store.get_referrers(&ObjectRef::new(1, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn history_lists_all_versions_oldest_first() {
        let history = store().get_history(&ObjectRef::new(1, 1, 1)).unwrap();
        let versions: Vec<u64> = history.iter().map(|i| i.reference.version()).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    // -----------------------------------------------------------------------
    // Type translation
    // -----------------------------------------------------------------------

    #[test]
    fn unregistered_versions_share_canonical_type() {
        let store = store();
        let a = store.translate_type("KBaseGenomes.Genome-8.2").unwrap();
        let b = store.translate_type("KBaseGenomes.Genome-3.0").unwrap();
        assert_eq!(a, b);
        assert!(a.is_a("KBaseGenomes.Genome"));
    }

    #[test]
    fn registered_schemas_drive_equality() {
        let store = store();
        let schema = json!({"features": "list<Feature>"});
        store.register_schema("KBaseGenomes.Genome-8.2", schema.clone()).unwrap();
        store.register_schema("KBaseGenomes.Genome-9.0", schema).unwrap();
        store
            .register_schema("KBaseGenomes.Genome-10.0", json!({"features": "mapping"}))
            .unwrap();
        let v8 = store.translate_type("KBaseGenomes.Genome-8.2").unwrap();
        let v9 = store.translate_type("KBaseGenomes.Genome-9.0").unwrap();
        let v10 = store.translate_type("KBaseGenomes.Genome-10.0").unwrap();
        assert_eq!(v8, v9);
        assert_ne!(v8, v10);
        assert!(v10.is_a("KBaseGenomes.Genome"));
    }

    #[test]
    fn schema_lookup_falls_back_to_qualified_name() {
        let store = store();
        assert_eq!(store.get_schema("KBaseGenomes.Genome-8.2").unwrap(), None);
        store
            .register_schema("KBaseGenomes.Genome", json!({"features": "list<Feature>"}))
            .unwrap();
        store
            .register_schema("KBaseGenomes.Genome-9.0", json!({"features": "mapping"}))
            .unwrap();
        assert_eq!(
            store.get_schema("KBaseGenomes.Genome-8.2").unwrap(),
            Some(json!({"features": "list<Feature>"}))
        );
        assert_eq!(
            store.get_schema("KBaseGenomes.Genome-9.0").unwrap(),
            Some(json!({"features": "mapping"}))
        );
        assert!(store.get_schema("Genome").is_err());
    }

    #[test]
    fn malformed_type_string_is_rejected() {
        assert!(matches!(
            store().translate_type("Genome"),
            Err(StoreError::Type(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Accounting and outages
    // -----------------------------------------------------------------------

    #[test]
    fn requests_are_logged() {
        let store = store();
        let r = ObjectRef::new(1, 1, 1);
        store.get_object(&r).unwrap();
        store.get_object(&r).unwrap();
        store
            .get_object_subset(&r, &[ObjectPath::field("id")])
            .unwrap();
        assert_eq!(store.full_fetches(), vec![r, r]);
        assert_eq!(store.subset_fetches(), vec![(r, vec!["id".to_string()])]);
        store.clear_requests();
        assert!(store.requests().is_empty());
    }

    #[test]
    fn offline_store_fails_every_call() {
        let store = store();
        store.set_available(false);
        let err = store.get_object(&ObjectRef::new(1, 1, 1)).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.resolve_reference(&spec("1/1/1")).is_err());
        store.set_available(true);
        assert!(store.get_object(&ObjectRef::new(1, 1, 1)).is_ok());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let data = store.get_object(&ObjectRef::new(1, 2, 1)).unwrap();
                    assert_eq!(data["id"], "kb|g.2");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.full_fetches().len(), 8);
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", store());
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count: 3"));
    }
}
