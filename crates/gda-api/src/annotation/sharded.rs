use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use gda_store::ObjectPath;
use gda_types::ObjectRef;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::exons::{mrna_exons, mrna_utrs};
use super::model::{
    Exon, FeatureContainerData, FeatureLink, FeatureRecord, FeatureView, MrnaUtrs, ProteinView,
};
use super::query::{
    id_filter, require_ids, select_features, FeatureFilters, FeatureIdResult, GroupBy,
};
use super::AnnotationQuery;
use crate::cache::CacheSlot;
use crate::error::{ApiError, ApiResult};
use crate::object::{resolve, ObjectHandle};

/// The small top-level fields of a hub, read once per adapter.
#[derive(Debug, Deserialize)]
struct HubRefs {
    #[serde(default)]
    taxon_ref: Option<String>,
    #[serde(default)]
    assembly_ref: Option<String>,
    #[serde(default)]
    feature_container_references: BTreeMap<String, String>,
    #[serde(default)]
    protein_container_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupSubset {
    #[serde(default)]
    feature_lookup: BTreeMap<String, Vec<FeatureLink>>,
}

#[derive(Debug, Default, Deserialize)]
struct CountsSubset {
    #[serde(default)]
    counts_map: Option<BTreeMap<String, u64>>,
}

/// A sharded `KBaseGenomeAnnotations.GenomeAnnotation`: a hub pointing at
/// one container per feature type and a protein container.
///
/// Containers are opened on demand and their handles kept for the life of
/// the adapter. Queries naming specific features read only those features'
/// paths from the lookup index and containers.
pub struct ShardedAnnotation {
    handle: ObjectHandle,
    hub: CacheSlot<HubRefs>,
    containers: Mutex<HashMap<String, Arc<ObjectHandle>>>,
}

impl ShardedAnnotation {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            hub: CacheSlot::new(),
            containers: Mutex::new(HashMap::new()),
        }
    }

    fn hub(&self) -> ApiResult<Arc<HubRefs>> {
        self.hub.get_or_try_fetch(|| {
            self.handle.typed_subset(&[
                ObjectPath::field("taxon_ref"),
                ObjectPath::field("assembly_ref"),
                ObjectPath::field("feature_container_references"),
                ObjectPath::field("protein_container_ref"),
            ])
        })
    }

    fn hub_ref(&self, field: &str, value: Option<&String>) -> ApiResult<ObjectRef> {
        let raw = value.ok_or_else(|| ApiError::Malformed {
            reference: self.handle.reference().to_string(),
            reason: format!("hub has no {field}"),
        })?;
        Ok(resolve(self.handle.services(), raw)?.reference)
    }

    fn container(&self, reference: &str) -> ApiResult<Arc<ObjectHandle>> {
        let mut containers = self
            .containers
            .lock()
            .map_err(|e| ApiError::Internal(format!("container cache poisoned: {e}")))?;
        if let Some(handle) = containers.get(reference) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(ObjectHandle::open(self.handle.services(), reference)?);
        debug!(container = %handle.reference(), "container opened");
        containers.insert(reference.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// The container holding `feature_type`, if the hub lists one.
    fn container_for(&self, feature_type: &str) -> ApiResult<Option<Arc<ObjectHandle>>> {
        match self.hub()?.feature_container_references.get(feature_type) {
            Some(reference) => self.container(reference).map(Some),
            None => Ok(None),
        }
    }

    fn all_features(&self, container: &ObjectHandle) -> ApiResult<FeatureContainerData> {
        container.typed_data()
    }

    /// Only the named features of one container.
    fn some_features<S: AsRef<str>>(
        &self,
        container: &ObjectHandle,
        ids: &[S],
    ) -> ApiResult<BTreeMap<String, FeatureRecord>> {
        let paths: Vec<ObjectPath> = ids
            .iter()
            .map(|id| ObjectPath::field("features").child(id.as_ref()))
            .collect();
        let subset: FeatureContainerData = container.typed_subset(&paths)?;
        Ok(subset.features)
    }

    /// Containers holding each requested feature, via the lookup index.
    fn locate(&self, ids: &[String]) -> ApiResult<BTreeMap<String, BTreeSet<String>>> {
        let paths: Vec<ObjectPath> = ids
            .iter()
            .map(|id| ObjectPath::field("feature_lookup").child(id.as_str()))
            .collect();
        let lookup: LookupSubset = self.handle.typed_subset(&paths)?;
        let mut located: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for id in ids {
            match lookup.feature_lookup.get(id) {
                Some(links) => {
                    for link in links {
                        located
                            .entry(link.container().to_string())
                            .or_default()
                            .insert(link.feature_id().to_string());
                    }
                }
                None => debug!(feature = %id, "feature not in lookup index"),
            }
        }
        Ok(located)
    }

    /// The records for `ids` (or every record) of one feature type.
    fn records_of_type(
        &self,
        feature_type: &str,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, FeatureRecord>> {
        let Some(container) = self.container_for(feature_type)? else {
            return Ok(BTreeMap::new());
        };
        match ids {
            None => Ok(self.all_features(&container)?.features),
            Some(ids) => self.some_features(&container, ids),
        }
    }

    /// Read one relationship off each requested record of `source_type`.
    /// Missing records and missing pointers both yield `T::default()`.
    fn linked<T, F>(
        &self,
        source_type: &str,
        ids: &[String],
        read: F,
    ) -> ApiResult<BTreeMap<String, T>>
    where
        T: Default,
        F: Fn(&FeatureRecord) -> Option<T>,
    {
        require_ids(ids, source_type)?;
        let records = self.records_of_type(source_type, Some(ids))?;
        Ok(ids
            .iter()
            .map(|id| {
                let value = records.get(id).and_then(&read).unwrap_or_default();
                (id.clone(), value)
            })
            .collect())
    }
}

fn link_id(link: &Option<FeatureLink>) -> Option<String> {
    link.as_ref().map(|l| l.feature_id().to_string())
}

fn link_ids(links: &[FeatureLink]) -> Vec<String> {
    links.iter().map(|l| l.feature_id().to_string()).collect()
}

impl AnnotationQuery for ShardedAnnotation {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_taxon_ref(&self) -> ApiResult<ObjectRef> {
        self.hub_ref("taxon_ref", self.hub()?.taxon_ref.as_ref())
    }

    fn get_assembly_ref(&self) -> ApiResult<ObjectRef> {
        self.hub_ref("assembly_ref", self.hub()?.assembly_ref.as_ref())
    }

    fn get_feature_types(&self) -> ApiResult<Vec<String>> {
        Ok(self
            .hub()?
            .feature_container_references
            .keys()
            .cloned()
            .collect())
    }

    fn get_feature_type_counts(
        &self,
        type_list: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, u64>> {
        let wanted = id_filter(type_list, "feature type")?;
        let stored: CountsSubset = self
            .handle
            .typed_subset(&[ObjectPath::field("counts_map")])?;
        let counts = match stored.counts_map {
            Some(counts) => counts,
            None => {
                debug!(reference = %self.handle.reference(), "no counts_map; counting containers");
                let mut counts = BTreeMap::new();
                for (feature_type, reference) in &self.hub()?.feature_container_references {
                    if wanted
                        .as_ref()
                        .map_or(true, |w| w.contains(feature_type.as_str()))
                    {
                        let container = self.container(reference)?;
                        let n = self.all_features(&container)?.features.len() as u64;
                        counts.insert(feature_type.clone(), n);
                    }
                }
                counts
            }
        };
        Ok(match wanted {
            None => counts,
            Some(wanted) => wanted
                .into_iter()
                .map(|t| (t.to_string(), counts.get(t).copied().unwrap_or(0)))
                .collect(),
        })
    }

    fn get_feature_ids(
        &self,
        filters: &FeatureFilters,
        group_by: GroupBy,
    ) -> ApiResult<FeatureIdResult> {
        filters.validate()?;
        let hub = self.hub()?;
        let mut containers = Vec::new();
        for (feature_type, reference) in &hub.feature_container_references {
            if !filters.admits_type(feature_type) {
                continue;
            }
            let data = self.all_features(&*self.container(reference)?)?;
            if let (Some(theirs), Some(ours)) = (&data.assembly_ref, &hub.assembly_ref) {
                if theirs != ours {
                    warn!(
                        container = %reference,
                        container_assembly = %theirs,
                        hub_assembly = %ours,
                        "container assembly differs from hub"
                    );
                }
            }
            containers.push(data);
        }
        let features = containers.iter().flat_map(|c| c.features.values());
        Ok(select_features(features, filters, group_by))
    }

    fn get_features(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, FeatureView>> {
        let mut views = BTreeMap::new();
        match ids {
            None => {
                for reference in self.hub()?.feature_container_references.values() {
                    let data = self.all_features(&*self.container(reference)?)?;
                    views.extend(data.features.values().map(|f| (f.feature_id.clone(), f.into())));
                }
            }
            Some(ids) => {
                require_ids(ids, "feature")?;
                for (reference, feature_ids) in self.locate(ids)? {
                    let container = self.container(&reference)?;
                    let ids: Vec<&String> = feature_ids.iter().collect();
                    let records = self.some_features(&container, &ids)?;
                    views.extend(records.values().map(|f| (f.feature_id.clone(), f.into())));
                }
            }
        }
        Ok(views)
    }

    fn get_proteins(&self) -> ApiResult<BTreeMap<String, ProteinView>> {
        let Some(reference) = self.hub()?.protein_container_ref.clone() else {
            debug!(reference = %self.handle.reference(), "hub has no protein container");
            return Ok(BTreeMap::new());
        };
        let container = self.container(&reference)?;
        let data = container.data()?;
        let malformed = |reason: String| ApiError::Malformed {
            reference: container.reference().to_string(),
            reason,
        };
        let proteins = match data.get("proteins") {
            Some(Value::Object(proteins)) => proteins,
            Some(_) => return Err(malformed("proteins is not a map".into())),
            None => return Ok(BTreeMap::new()),
        };
        proteins
            .iter()
            .map(|(key, record)| {
                let record = record
                    .as_object()
                    .ok_or_else(|| malformed(format!("protein {key} is not a record")))?;
                let view = ProteinView::from_stored(key, record)
                    .map_err(|e| malformed(format!("protein {key}: {e}")))?;
                Ok((key.clone(), view))
            })
            .collect()
    }

    fn get_mrna_exons(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, Vec<Exon>>> {
        id_filter(ids, "mRNA")?;
        Ok(self
            .records_of_type("mRNA", ids)?
            .into_iter()
            .map(|(id, f)| {
                let sequence = f.dna_sequence.as_deref().unwrap_or_default();
                (id, mrna_exons(&f.locations, sequence))
            })
            .collect())
    }

    fn get_mrna_utrs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, MrnaUtrs>> {
        id_filter(ids, "mRNA")?;
        let mrnas = self.records_of_type("mRNA", ids)?;
        let cds_of: BTreeMap<&str, String> = mrnas
            .iter()
            .filter_map(|(id, f)| {
                let cds = f.mrna_properties.as_ref()?.associated_cds.as_ref()?;
                Some((id.as_str(), cds.feature_id().to_string()))
            })
            .collect();
        if cds_of.is_empty() {
            return Ok(BTreeMap::new());
        }
        let cds_ids: Vec<String> = cds_of.values().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let cds = self.records_of_type("CDS", Some(cds_ids.as_slice()))?;

        let mut utrs = BTreeMap::new();
        for (mrna_id, cds_id) in cds_of {
            let (Some(mrna), Some(cds)) = (mrnas.get(mrna_id), cds.get(&cds_id)) else {
                debug!(mrna = mrna_id, cds = %cds_id, "associated CDS not found");
                continue;
            };
            let sequence = mrna.dna_sequence.as_deref().unwrap_or_default();
            match mrna_utrs(&mrna.locations, sequence, &cds.locations) {
                Some(found) => {
                    utrs.insert(mrna_id.to_string(), found);
                }
                None => warn!(mrna = mrna_id, cds = %cds_id, "CDS has no usable strand"),
            }
        }
        Ok(utrs)
    }

    fn get_cds_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.linked("mRNA", ids, |f| {
            Some(link_id(&f.mrna_properties.as_ref()?.associated_cds))
        })
    }

    fn get_mrna_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.linked("CDS", ids, |f| {
            Some(link_id(&f.cds_properties.as_ref()?.associated_mrna))
        })
    }

    fn get_gene_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.linked("CDS", ids, |f| {
            Some(link_id(&f.cds_properties.as_ref()?.parent_gene))
        })
    }

    fn get_gene_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.linked("mRNA", ids, |f| {
            Some(link_id(&f.mrna_properties.as_ref()?.parent_gene))
        })
    }

    fn get_cds_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.linked("gene", ids, |f| {
            Some(link_ids(&f.gene_properties.as_ref()?.children_cds))
        })
    }

    fn get_mrna_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.linked("gene", ids, |f| {
            Some(link_ids(&f.gene_properties.as_ref()?.children_mrna))
        })
    }
}

impl std::fmt::Debug for ShardedAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self.containers.lock().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("ShardedAnnotation")
            .field("handle", &self.handle)
            .field("open_containers", &open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::model::{Region, Strand};
    use crate::fixtures::{
        ids, World, CDS_CONTAINER, GENE_CONTAINER, HUB_ASSEMBLY, HUB_GENOME_V1, MRNA_CONTAINER,
        PROTEIN_CONTAINER, TAXON,
    };

    fn hub(world: &World) -> ShardedAnnotation {
        ShardedAnnotation::new(world.handle("Reference/hub_genome"))
    }

    // ---- Hub ----

    #[test]
    fn hub_references_resolve() {
        let world = World::new();
        let g = hub(&world);
        assert_eq!(g.get_taxon_ref().unwrap(), TAXON);
        assert_eq!(g.get_assembly_ref().unwrap(), HUB_ASSEMBLY);
        assert_eq!(g.get_feature_types().unwrap(), vec!["CDS", "gene", "mRNA"]);
    }

    #[test]
    fn counts_come_from_counts_map() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let counts = g.get_feature_type_counts(None).unwrap();
        assert_eq!(counts["CDS"], 2);
        assert_eq!(counts["mRNA"], 2);
        assert_eq!(counts["gene"], 1);
        assert!(world.objects.full_fetches().is_empty());
    }

    #[test]
    fn counts_fall_back_to_container_sizes() {
        let world = World::new();
        let g = ShardedAnnotation::new(world.handle(&HUB_GENOME_V1.to_string()));
        world.objects.clear_requests();
        let counts = g
            .get_feature_type_counts(Some(&ids(&["CDS", "pseudo"])))
            .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["CDS"], 2);
        assert_eq!(counts["pseudo"], 0);
        assert_eq!(world.objects.full_fetches(), vec![CDS_CONTAINER]);
    }

    // ---- Feature queries ----

    #[test]
    fn type_filter_bounds_container_fetches() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let result = g
            .get_feature_ids(&FeatureFilters::new().types(["gene"]), GroupBy::Type)
            .unwrap();
        let by_type = result.by_type.unwrap();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type["gene"], vec!["gene.1"]);
        assert_eq!(world.objects.full_fetches(), vec![GENE_CONTAINER]);
    }

    #[test]
    fn region_and_function_intersect() {
        let world = World::new();
        let filters = FeatureFilters::new()
            .regions([Region::new("contig_0", 110, Strand::Plus, 20)])
            .functions(["aspartokinase"]);
        let result = hub(&world)
            .get_feature_ids(&filters, GroupBy::Function)
            .unwrap();
        assert_eq!(result.by_function.unwrap()["aspartokinase I"], vec!["cds.1"]);
        assert!(result.intersect.is_some());
    }

    #[test]
    fn selected_features_read_only_their_paths() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let features = g
            .get_features(Some(&ids(&["cds.1", "missing"])))
            .unwrap();
        assert_eq!(features.len(), 1);
        let cds = &features["cds.1"];
        assert_eq!(cds.function, "aspartokinase I");
        assert_eq!(cds.md5, gda_crypto::sequence_md5("ATGCGAGTG"));
        assert!(world.objects.full_fetches().is_empty());
        assert!(world
            .objects
            .subset_fetches()
            .contains(&(CDS_CONTAINER, vec!["features/cds.1".to_string()])));
    }

    #[test]
    fn all_features_span_containers() {
        let world = World::new();
        let features = hub(&world).get_features(None).unwrap();
        let keys: Vec<&str> = features.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["cds.1", "cds.2", "gene.1", "mrna.1", "mrna.2"]);
    }

    #[test]
    fn proteins_are_normalised() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let proteins = g.get_proteins().unwrap();
        assert_eq!(world.objects.full_fetches(), vec![PROTEIN_CONTAINER]);
        assert_eq!(proteins.len(), 2);
        assert_eq!(proteins["protein.1"].function.as_deref(), Some("aspartokinase I"));
        let bare = &proteins["protein.2"];
        assert_eq!(bare.id, "protein.2");
        assert_eq!(bare.amino_acid_sequence, "MA");
        assert_eq!(
            bare.extra.get("protein_translation_derived"),
            Some(&Value::Bool(true))
        );
    }

    // ---- Exons and UTRs ----

    #[test]
    fn exons_slice_the_transcript() {
        let world = World::new();
        let exons = hub(&world).get_mrna_exons(Some(&ids(&["mrna.1"]))).unwrap();
        let mrna = &exons["mrna.1"];
        assert_eq!(mrna.len(), 2);
        assert_eq!(mrna[0].dna_sequence, format!("{}{}", "A".repeat(20), "C".repeat(30)));
        assert_eq!(mrna[1].dna_sequence.len(), 100);
    }

    #[test]
    fn all_exons_read_the_mrna_container() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let exons = g.get_mrna_exons(None).unwrap();
        assert_eq!(exons.len(), 2);
        assert_eq!(exons["mrna.2"].len(), 1);
        assert_eq!(world.objects.full_fetches(), vec![MRNA_CONTAINER]);
    }

    #[test]
    fn utrs_flank_the_cds() {
        let world = World::new();
        let utrs = hub(&world).get_mrna_utrs(None).unwrap();
        assert_eq!(utrs.len(), 1);
        let mrna = &utrs["mrna.1"];
        let five = mrna.five_prime.as_ref().unwrap();
        assert_eq!(five.locations, vec![Region::new("contig_0", 100, Strand::Plus, 20)]);
        assert_eq!(five.dna_sequence, "A".repeat(20));
        let three = mrna.three_prime.as_ref().unwrap();
        assert_eq!(three.locations, vec![Region::new("contig_0", 260, Strand::Plus, 40)]);
        assert_eq!(three.dna_sequence, "T".repeat(40));
    }

    #[test]
    fn mrna_without_cds_has_no_utrs() {
        let world = World::new();
        let utrs = hub(&world).get_mrna_utrs(Some(&ids(&["mrna.2"]))).unwrap();
        assert!(utrs.is_empty());
    }

    // ---- Relationships ----

    #[test]
    fn relationships_fetch_only_requested_ids() {
        let world = World::new();
        let g = hub(&world);
        world.objects.clear_requests();
        let genes = g.get_gene_by_cds(&ids(&["cds.1", "cds.9"])).unwrap();
        assert_eq!(genes["cds.1"].as_deref(), Some("gene.1"));
        assert_eq!(genes["cds.9"], None);
        assert!(world.objects.full_fetches().is_empty());
        assert!(world.objects.subset_fetches().contains(&(
            CDS_CONTAINER,
            vec!["features/cds.1".to_string(), "features/cds.9".to_string()]
        )));
    }

    #[test]
    fn gene_children_and_parents() {
        let world = World::new();
        let g = hub(&world);
        assert_eq!(g.get_cds_by_gene(&ids(&["gene.1"])).unwrap()["gene.1"], vec!["cds.1"]);
        assert_eq!(g.get_mrna_by_gene(&ids(&["gene.1"])).unwrap()["gene.1"], vec!["mrna.1"]);
        let parents = g.get_gene_by_mrna(&ids(&["mrna.1", "mrna.2"])).unwrap();
        assert_eq!(parents["mrna.1"].as_deref(), Some("gene.1"));
        assert_eq!(parents["mrna.2"], None);
    }

    #[test]
    fn empty_id_lists_are_rejected() {
        let world = World::new();
        let g = hub(&world);
        assert!(matches!(g.get_cds_by_mrna(&[]), Err(ApiError::InvalidArgument(_))));
        assert!(matches!(g.get_features(Some(&[])), Err(ApiError::InvalidArgument(_))));
    }
}
