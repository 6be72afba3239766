//! Taxa.
//!
//! A taxon is either a `KBaseGenomeAnnotations.Taxon` record, linked to its
//! parent and referenced by its children and annotations, or a legacy
//! `KBaseGenomes.Genome` standing in as its own taxon. A genome carries the
//! naming fields only and has no place in the tree.

use std::sync::Arc;

use gda_store::ObjectPath;
use gda_types::ObjectRef;
use serde::Deserialize;
use tracing::debug;

use crate::cache::CacheSlot;
use crate::client::Services;
use crate::dispatch::{Shape, TypeFamily};
use crate::error::{ApiError, ApiResult};
use crate::object::{resolve, ObjectHandle};

pub trait TaxonQuery {
    fn handle(&self) -> &ObjectHandle;

    fn get_parent(&self) -> ApiResult<Option<ObjectRef>>;

    fn get_children(&self) -> ApiResult<Vec<ObjectRef>>;

    fn get_genome_annotations(&self) -> ApiResult<Vec<ObjectRef>>;

    fn get_scientific_lineage(&self) -> ApiResult<String>;

    fn get_scientific_name(&self) -> ApiResult<String>;

    /// `-1` when the record carries no usable id.
    fn get_taxonomic_id(&self) -> ApiResult<i64>;

    fn get_kingdom(&self) -> ApiResult<Option<String>>;

    fn get_domain(&self) -> ApiResult<String>;

    fn get_aliases(&self) -> ApiResult<Vec<String>>;

    fn get_genetic_code(&self) -> ApiResult<i64>;
}

#[derive(Debug, Default, Deserialize)]
struct GenomeNaming {
    #[serde(default)]
    taxonomy: Option<String>,
    #[serde(default)]
    scientific_name: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    genetic_code: Option<i64>,
}

/// A legacy genome read as a taxon.
#[derive(Debug)]
pub struct GenomeTaxon {
    handle: ObjectHandle,
}

impl GenomeTaxon {
    pub fn new(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    fn naming(&self, field: &str) -> ApiResult<GenomeNaming> {
        self.handle.typed_subset(&[ObjectPath::field(field)])
    }
}

impl TaxonQuery for GenomeTaxon {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_parent(&self) -> ApiResult<Option<ObjectRef>> {
        Ok(None)
    }

    fn get_children(&self) -> ApiResult<Vec<ObjectRef>> {
        Ok(Vec::new())
    }

    fn get_genome_annotations(&self) -> ApiResult<Vec<ObjectRef>> {
        Ok(Vec::new())
    }

    fn get_scientific_lineage(&self) -> ApiResult<String> {
        Ok(self.naming("taxonomy")?.taxonomy.unwrap_or_default())
    }

    fn get_scientific_name(&self) -> ApiResult<String> {
        Ok(self
            .naming("scientific_name")?
            .scientific_name
            .unwrap_or_default())
    }

    fn get_taxonomic_id(&self) -> ApiResult<i64> {
        let source_id = self.naming("source_id")?.source_id;
        Ok(source_id
            .and_then(|id| id.trim().parse().ok())
            .unwrap_or(-1))
    }

    fn get_kingdom(&self) -> ApiResult<Option<String>> {
        Ok(None)
    }

    fn get_domain(&self) -> ApiResult<String> {
        Ok(self.naming("domain")?.domain.unwrap_or_default())
    }

    fn get_aliases(&self) -> ApiResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn get_genetic_code(&self) -> ApiResult<i64> {
        Ok(self.naming("genetic_code")?.genetic_code.unwrap_or(-1))
    }
}

#[derive(Debug, Deserialize)]
struct TaxonRecord {
    #[serde(default)]
    parent_taxon_ref: Option<String>,
    #[serde(default)]
    scientific_lineage: String,
    #[serde(default)]
    scientific_name: String,
    #[serde(default)]
    taxonomy_id: Option<i64>,
    #[serde(default)]
    kingdom: Option<String>,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    genetic_code: Option<i64>,
}

/// A `KBaseGenomeAnnotations.Taxon` record. The record is small and read
/// whole on first use.
#[derive(Debug)]
pub struct TaxonNode {
    handle: ObjectHandle,
    record: CacheSlot<TaxonRecord>,
}

impl TaxonNode {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            record: CacheSlot::new(),
        }
    }

    fn record(&self) -> ApiResult<Arc<TaxonRecord>> {
        self.record.get_or_try_fetch(|| self.handle.typed_data())
    }
}

impl TaxonQuery for TaxonNode {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_parent(&self) -> ApiResult<Option<ObjectRef>> {
        match &self.record()?.parent_taxon_ref {
            Some(parent) => Ok(Some(resolve(self.handle.services(), parent)?.reference)),
            None => {
                debug!(reference = %self.handle.reference(), "taxon has no parent");
                Ok(None)
            }
        }
    }

    fn get_children(&self) -> ApiResult<Vec<ObjectRef>> {
        self.handle.referrers_of_type(TypeFamily::TAXON.current)
    }

    fn get_genome_annotations(&self) -> ApiResult<Vec<ObjectRef>> {
        let types: Vec<&str> = TypeFamily::GENOME_ANNOTATION.all().collect();
        self.handle.referrers_of_type(&types)
    }

    fn get_scientific_lineage(&self) -> ApiResult<String> {
        Ok(self.record()?.scientific_lineage.clone())
    }

    fn get_scientific_name(&self) -> ApiResult<String> {
        Ok(self.record()?.scientific_name.clone())
    }

    fn get_taxonomic_id(&self) -> ApiResult<i64> {
        Ok(self.record()?.taxonomy_id.unwrap_or(-1))
    }

    fn get_kingdom(&self) -> ApiResult<Option<String>> {
        Ok(self.record()?.kingdom.clone())
    }

    fn get_domain(&self) -> ApiResult<String> {
        Ok(self.record()?.domain.clone())
    }

    fn get_aliases(&self) -> ApiResult<Vec<String>> {
        Ok(self.record()?.aliases.clone().unwrap_or_default())
    }

    fn get_genetic_code(&self) -> ApiResult<i64> {
        self.record()?
            .genetic_code
            .ok_or_else(|| ApiError::Malformed {
                reference: self.handle.reference().to_string(),
                reason: "taxon has no genetic_code".into(),
            })
    }
}

/// A taxon in either stored shape.
#[derive(Debug)]
pub enum Taxon {
    Genome(GenomeTaxon),
    Node(TaxonNode),
}

impl Taxon {
    pub fn open(services: &Services, reference: &str) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open(services, reference)?)
    }

    pub fn open_ref(services: &Services, reference: ObjectRef) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open_ref(services, reference)?)
    }

    pub fn from_handle(handle: ObjectHandle) -> ApiResult<Self> {
        Ok(match TypeFamily::TAXON.classify(handle.canonical_type())? {
            Shape::Legacy => Self::Genome(GenomeTaxon::new(handle)),
            Shape::Current => Self::Node(TaxonNode::new(handle)),
        })
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Genome(_) => Shape::Legacy,
            Self::Node(_) => Shape::Current,
        }
    }

    fn inner(&self) -> &dyn TaxonQuery {
        match self {
            Self::Genome(t) => t,
            Self::Node(t) => t,
        }
    }
}

impl TaxonQuery for Taxon {
    fn handle(&self) -> &ObjectHandle {
        self.inner().handle()
    }

    fn get_parent(&self) -> ApiResult<Option<ObjectRef>> {
        self.inner().get_parent()
    }

    fn get_children(&self) -> ApiResult<Vec<ObjectRef>> {
        self.inner().get_children()
    }

    fn get_genome_annotations(&self) -> ApiResult<Vec<ObjectRef>> {
        self.inner().get_genome_annotations()
    }

    fn get_scientific_lineage(&self) -> ApiResult<String> {
        self.inner().get_scientific_lineage()
    }

    fn get_scientific_name(&self) -> ApiResult<String> {
        self.inner().get_scientific_name()
    }

    fn get_taxonomic_id(&self) -> ApiResult<i64> {
        self.inner().get_taxonomic_id()
    }

    fn get_kingdom(&self) -> ApiResult<Option<String>> {
        self.inner().get_kingdom()
    }

    fn get_domain(&self) -> ApiResult<String> {
        self.inner().get_domain()
    }

    fn get_aliases(&self) -> ApiResult<Vec<String>> {
        self.inner().get_aliases()
    }

    fn get_genetic_code(&self) -> ApiResult<i64> {
        self.inner().get_genetic_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{World, HUB_GENOME, PARENT_TAXON, TAXON};
    use gda_store::StoredRecord;
    use serde_json::json;

    #[test]
    fn taxon_record_fields() {
        let world = World::new();
        let taxon = world.api().taxon("Reference/taxon").unwrap();
        assert_eq!(taxon.shape(), Shape::Current);
        assert_eq!(taxon.get_scientific_name().unwrap(), "Escherichia coli");
        assert_eq!(taxon.get_taxonomic_id().unwrap(), 562);
        assert_eq!(taxon.get_kingdom().unwrap().as_deref(), Some("Bacteria"));
        assert_eq!(taxon.get_domain().unwrap(), "Bacteria");
        assert_eq!(taxon.get_genetic_code().unwrap(), 11);
        assert_eq!(taxon.get_aliases().unwrap(), vec!["E. coli"]);
        assert!(taxon.get_scientific_lineage().unwrap().contains("Enterobacteriaceae"));
    }

    #[test]
    fn tree_links() {
        let world = World::new();
        let api = world.api();
        let taxon = api.taxon("Reference/taxon").unwrap();
        assert_eq!(taxon.get_parent().unwrap(), Some(PARENT_TAXON));
        assert_eq!(taxon.get_genome_annotations().unwrap(), vec![HUB_GENOME]);
        assert!(taxon.get_children().unwrap().is_empty());

        let parent = api.taxon("Reference/parent_taxon").unwrap();
        assert_eq!(parent.get_parent().unwrap(), None);
        assert_eq!(parent.get_children().unwrap(), vec![TAXON]);
    }

    #[test]
    fn genome_as_taxon() {
        let world = World::new();
        let genome = world.api().taxon("Reference/legacy_genome").unwrap();
        assert_eq!(genome.shape(), Shape::Legacy);
        assert_eq!(genome.get_parent().unwrap(), None);
        assert!(genome.get_children().unwrap().is_empty());
        assert!(genome.get_genome_annotations().unwrap().is_empty());
        assert_eq!(genome.get_taxonomic_id().unwrap(), 83333);
        assert_eq!(genome.get_kingdom().unwrap(), None);
        assert_eq!(genome.get_domain().unwrap(), "Bacteria");
        assert_eq!(genome.get_genetic_code().unwrap(), 11);
        assert!(genome.get_aliases().unwrap().is_empty());
        assert!(genome.get_scientific_lineage().unwrap().starts_with("Bacteria"));
    }

    #[test]
    fn unparsable_source_id_is_minus_one() {
        let world = World::new();
        world
            .objects
            .insert(
                StoredRecord::new(
                    ObjectRef::new(1, 12, 1),
                    "odd_genome",
                    "KBaseGenomes.Genome-8.0",
                    json!({"source_id": "not-a-number", "domain": "Archaea"}),
                )
                .in_workspace("Reference"),
            )
            .unwrap();
        let genome = world.api().taxon("Reference/odd_genome").unwrap();
        assert_eq!(genome.get_taxonomic_id().unwrap(), -1);
    }
}
