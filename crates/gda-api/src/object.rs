use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use gda_store::ObjectPath;
use gda_types::{CanonicalType, ObjectInfo, ObjectRef, ProvenanceAction, ReferenceSpec};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cache::CacheSlot;
use crate::client::Services;
use crate::error::{ApiError, ApiResult};

/// Resolve a loose reference to the metadata of one pinned version.
///
/// Syntactically impossible references fail before any store call.
pub fn resolve(services: &Services, reference: &str) -> ApiResult<ObjectInfo> {
    let spec: ReferenceSpec = reference.parse()?;
    let info = services
        .objects()
        .resolve_reference(&spec)?
        .ok_or_else(|| ApiError::NotFound(reference.trim().to_string()))?;
    debug!(reference = %spec, resolved = %info.reference, "reference resolved");
    Ok(info)
}

/// One resolved, version-pinned object with lazily fetched payload,
/// history and provenance.
///
/// `info` is read at open time. The other slots are fetched on first use
/// and never refreshed.
pub struct ObjectHandle {
    services: Services,
    info: ObjectInfo,
    canonical: CanonicalType,
    data: CacheSlot<Value>,
    history: CacheSlot<Vec<ObjectInfo>>,
    provenance: CacheSlot<Vec<ProvenanceAction>>,
}

impl ObjectHandle {
    pub fn open(services: &Services, reference: &str) -> ApiResult<Self> {
        let info = resolve(services, reference)?;
        let canonical = services.objects().translate_type(&info.type_string)?;
        Ok(Self {
            services: services.clone(),
            info,
            canonical,
            data: CacheSlot::new(),
            history: CacheSlot::new(),
            provenance: CacheSlot::new(),
        })
    }

    pub fn open_ref(services: &Services, reference: ObjectRef) -> ApiResult<Self> {
        Self::open(services, &reference.to_string())
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn reference(&self) -> ObjectRef {
        self.info.reference
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn canonical_type(&self) -> &CanonicalType {
        &self.canonical
    }

    /// The raw type string the object was saved under.
    pub fn type_string(&self) -> &str {
        &self.info.type_string
    }

    /// The structural schema registered for this object's type, if any.
    pub fn schema(&self) -> ApiResult<Option<Value>> {
        debug!(
            reference = %self.info.reference,
            type_string = %self.info.type_string,
            "fetching schema"
        );
        Ok(self.services.objects().get_schema(&self.info.type_string)?)
    }

    /// The full payload, fetched once.
    pub fn data(&self) -> ApiResult<Arc<Value>> {
        self.data.get_or_try_fetch(|| {
            debug!(reference = %self.info.reference, "fetching full object");
            Ok(self.services.objects().get_object(&self.info.reference)?)
        })
    }

    /// Only the given paths; a fresh store call every time.
    pub fn data_subset(&self, paths: &[ObjectPath]) -> ApiResult<Value> {
        debug!(reference = %self.info.reference, paths = paths.len(), "fetching subset");
        Ok(self
            .services
            .objects()
            .get_object_subset(&self.info.reference, paths)?)
    }

    /// The full payload decoded as `T`.
    pub fn typed_data<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let data = self.data()?;
        self.decode(&data)
    }

    /// A subset decoded as `T`. Missing paths surface as missing fields.
    pub fn typed_subset<T: DeserializeOwned>(&self, paths: &[ObjectPath]) -> ApiResult<T> {
        let subset = self.data_subset(paths)?;
        self.decode(&subset)
    }

    /// A single top-level field, or `None` if the object lacks it.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> ApiResult<Option<T>> {
        let subset = self.data_subset(&[ObjectPath::field(name)])?;
        match subset.get(name) {
            Some(value) => self.decode(value).map(Some),
            None => Ok(None),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, value: &Value) -> ApiResult<T> {
        T::deserialize(value).map_err(|e| ApiError::Malformed {
            reference: self.info.reference.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn history(&self) -> ApiResult<Arc<Vec<ObjectInfo>>> {
        self.history
            .get_or_try_fetch(|| Ok(self.services.objects().get_history(&self.info.reference)?))
    }

    pub fn provenance(&self) -> ApiResult<Arc<Vec<ProvenanceAction>>> {
        self.provenance.get_or_try_fetch(|| {
            Ok(self
                .services
                .objects()
                .get_provenance(&self.info.reference)?)
        })
    }

    /// Objects referring to this one, grouped by their canonical type.
    ///
    /// With `most_recent`, only the newest version of each referring object
    /// is kept.
    pub fn referrers_with(
        &self,
        most_recent: bool,
    ) -> ApiResult<BTreeMap<CanonicalType, Vec<ObjectRef>>> {
        let objects = self.services.objects();
        let mut referrers = objects.get_referrers(&self.info.reference)?;
        if most_recent {
            let mut newest: BTreeMap<(u64, u64), ObjectInfo> = BTreeMap::new();
            for info in referrers {
                match newest.get(&info.reference.lineage()) {
                    Some(kept) if kept.reference.version() >= info.reference.version() => {}
                    _ => {
                        newest.insert(info.reference.lineage(), info);
                    }
                }
            }
            referrers = newest.into_values().collect();
        }

        let mut translated: HashMap<String, CanonicalType> = HashMap::new();
        let mut grouped: BTreeMap<CanonicalType, Vec<ObjectRef>> = BTreeMap::new();
        for info in referrers {
            let canonical = match translated.get(&info.type_string) {
                Some(t) => t.clone(),
                None => {
                    let t = objects.translate_type(&info.type_string)?;
                    translated.insert(info.type_string.clone(), t.clone());
                    t
                }
            };
            grouped.entry(canonical).or_default().push(info.reference);
        }
        debug!(
            reference = %self.info.reference,
            types = grouped.len(),
            "referrers grouped"
        );
        Ok(grouped)
    }

    /// [`referrers_with`](Self::referrers_with) using the configured default.
    pub fn referrers(&self) -> ApiResult<BTreeMap<CanonicalType, Vec<ObjectRef>>> {
        self.referrers_with(self.services.config().referrers_most_recent)
    }

    /// Referrers whose canonical type is one of `qualified_names`, in
    /// reference order.
    pub fn referrers_of_type(&self, qualified_names: &[&str]) -> ApiResult<Vec<ObjectRef>> {
        let mut refs: Vec<ObjectRef> = self
            .referrers()?
            .into_iter()
            .filter(|(t, _)| qualified_names.iter().any(|name| t.is_a(name)))
            .flat_map(|(_, refs)| refs)
            .collect();
        refs.sort();
        Ok(refs)
    }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("reference", &self.info.reference)
            .field("type", &self.canonical.qualified_name())
            .field("data_cached", &self.data.is_filled())
            .finish()
    }
}
