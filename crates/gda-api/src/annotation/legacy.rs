use std::collections::BTreeMap;
use std::sync::Arc;

use gda_store::ObjectPath;
use gda_types::ObjectRef;
use serde::Deserialize;
use tracing::debug;

use super::exons::mrna_exons;
use super::model::{Exon, FeatureView, LegacyFeature, MrnaUtrs, ProteinView};
use super::query::{
    id_filter, require_ids, select_features, FeatureFilters, FeatureIdResult, GroupBy,
};
use super::AnnotationQuery;
use crate::cache::CacheSlot;
use crate::error::{ApiError, ApiResult};
use crate::object::{resolve, ObjectHandle};

#[derive(Debug, Deserialize)]
struct GenomeRecord {
    #[serde(default)]
    features: Vec<LegacyFeature>,
}

#[derive(Debug, Default, Deserialize)]
struct AssemblyRefs {
    #[serde(default)]
    contigset_ref: Option<String>,
    #[serde(default)]
    assembly_ref: Option<String>,
}

/// A monolithic `KBaseGenomes.Genome`: every feature inline in one list.
///
/// The genome records no feature relationships, and acts as its own taxon.
#[derive(Debug)]
pub struct LegacyGenome {
    handle: ObjectHandle,
    record: CacheSlot<GenomeRecord>,
}

impl LegacyGenome {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            record: CacheSlot::new(),
        }
    }

    fn record(&self) -> ApiResult<Arc<GenomeRecord>> {
        self.record.get_or_try_fetch(|| self.handle.typed_data())
    }

    fn no_relationships<T: Default>(
        &self,
        ids: &[String],
        what: &str,
    ) -> ApiResult<BTreeMap<String, T>> {
        require_ids(ids, what)?;
        debug!(
            reference = %self.handle.reference(),
            ids = ids.len(),
            "legacy genome records no feature relationships"
        );
        Ok(ids.iter().map(|id| (id.clone(), T::default())).collect())
    }
}

impl AnnotationQuery for LegacyGenome {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_taxon_ref(&self) -> ApiResult<ObjectRef> {
        Ok(self.handle.reference())
    }

    fn get_assembly_ref(&self) -> ApiResult<ObjectRef> {
        let refs: AssemblyRefs = self.handle.typed_subset(&[
            ObjectPath::field("contigset_ref"),
            ObjectPath::field("assembly_ref"),
        ])?;
        let raw = refs
            .contigset_ref
            .or(refs.assembly_ref)
            .ok_or_else(|| ApiError::Malformed {
                reference: self.handle.reference().to_string(),
                reason: "genome has neither contigset_ref nor assembly_ref".into(),
            })?;
        Ok(resolve(self.handle.services(), &raw)?.reference)
    }

    fn get_feature_types(&self) -> ApiResult<Vec<String>> {
        let mut types: Vec<String> = Vec::new();
        for feature in &self.record()?.features {
            if !types.contains(&feature.feature_type) {
                types.push(feature.feature_type.clone());
            }
        }
        Ok(types)
    }

    fn get_feature_type_counts(
        &self,
        type_list: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, u64>> {
        let wanted = id_filter(type_list, "feature type")?;
        let mut counts: BTreeMap<String, u64> = wanted
            .iter()
            .flatten()
            .map(|t| (t.to_string(), 0))
            .collect();
        for feature in &self.record()?.features {
            if wanted
                .as_ref()
                .map_or(true, |w| w.contains(feature.feature_type.as_str()))
            {
                *counts.entry(feature.feature_type.clone()).or_default() += 1;
            }
        }
        Ok(counts)
    }

    fn get_feature_ids(
        &self,
        filters: &FeatureFilters,
        group_by: GroupBy,
    ) -> ApiResult<FeatureIdResult> {
        filters.validate()?;
        let record = self.record()?;
        Ok(select_features(&record.features, filters, group_by))
    }

    fn get_features(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, FeatureView>> {
        let wanted = id_filter(ids, "feature")?;
        Ok(self
            .record()?
            .features
            .iter()
            .filter(|f| wanted.as_ref().map_or(true, |w| w.contains(f.id.as_str())))
            .map(|f| (f.id.clone(), FeatureView::from(f)))
            .collect())
    }

    fn get_proteins(&self) -> ApiResult<BTreeMap<String, ProteinView>> {
        Ok(self
            .record()?
            .features
            .iter()
            .filter_map(|f| {
                let translation = f.protein_translation.as_deref()?;
                (!translation.is_empty()).then(|| ProteinView::from_translation(&f.id, translation))
            })
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    fn get_mrna_exons(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, Vec<Exon>>> {
        let wanted = id_filter(ids, "mRNA")?;
        Ok(self
            .record()?
            .features
            .iter()
            .filter(|f| f.feature_type == "mRNA")
            .filter(|f| wanted.as_ref().map_or(true, |w| w.contains(f.id.as_str())))
            .filter_map(|f| {
                let sequence = f.dna_sequence.as_deref()?;
                (!f.location.is_empty())
                    .then(|| (f.id.clone(), mrna_exons(&f.location, sequence)))
            })
            .collect())
    }

    fn get_mrna_utrs(&self, _ids: Option<&[String]>) -> ApiResult<BTreeMap<String, MrnaUtrs>> {
        Err(ApiError::Unsupported {
            operation: "get_mrna_utrs",
            type_name: self.handle.canonical_type().qualified_name().to_string(),
        })
    }

    fn get_cds_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.no_relationships(ids, "mRNA")
    }

    fn get_mrna_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.no_relationships(ids, "CDS")
    }

    fn get_gene_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.no_relationships(ids, "CDS")
    }

    fn get_gene_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.no_relationships(ids, "mRNA")
    }

    fn get_cds_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.no_relationships(ids, "gene")
    }

    fn get_mrna_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.no_relationships(ids, "gene")
    }
}
