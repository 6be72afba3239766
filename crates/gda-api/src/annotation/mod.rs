//! Genome annotations.
//!
//! [`GenomeAnnotation`] answers every feature query the same way for both
//! stored shapes: the monolithic `KBaseGenomes.Genome` ([`LegacyGenome`])
//! and the sharded `KBaseGenomeAnnotations.GenomeAnnotation`
//! ([`ShardedAnnotation`]). Callers program against [`AnnotationQuery`].

pub mod exons;
pub mod legacy;
pub mod model;
pub mod query;
pub mod sharded;

use std::collections::BTreeMap;

use gda_types::ObjectRef;
use serde_json::Value;

use crate::assembly::Assembly;
use crate::client::Services;
use crate::dispatch::{Shape, TypeFamily};
use crate::error::ApiResult;
use crate::object::ObjectHandle;
use crate::taxon::Taxon;

pub use legacy::LegacyGenome;
pub use model::{Exon, FeatureView, MrnaUtrs, ProteinView, Region, Strand, Utr};
pub use query::{FeatureFilters, FeatureIdResult, GroupBy};
pub use sharded::ShardedAnnotation;

/// Known feature type codes and what they mean.
pub const FEATURE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("CDS", "Coding Sequence"),
    ("PEG", "Protein Encoding Genes"),
    ("rna", "Ribonucliec Acid (RNA)"),
    ("crispr", "Clustered Regularly Interspaced Short Palindromic Repeats"),
    ("crs", "Clustered Regularly Interspaced Short Palindromic Repeats"),
    ("mRNA", "Messenger RNA"),
    ("sRNA", "Small RNA"),
    ("loci", "Loci or Genes (Genbank)"),
    ("locus", "Locus or Gene (Genbank)"),
    ("gene", "Gene"),
    ("opr", "Operons"),
    ("pbs", "Protein Binding Site"),
    ("bs", "Binding Site"),
    ("pseudo", "PseudoGenes"),
    ("att", "Attenuator"),
    ("prm", "Promoter"),
    ("trm", "Terminator"),
    ("pp", "Prophage"),
    ("pi", "Pathogenicity Island"),
    ("rsw", "Riboswitch"),
    ("trnspn", "Transposon"),
];

/// Queries every genome annotation answers, whatever its stored shape.
///
/// Id-keyed maps omit ids the annotation does not hold. Relationship
/// lookups instead keep every requested id, mapping it to `None` or an
/// empty list when no relationship is recorded.
pub trait AnnotationQuery {
    fn handle(&self) -> &ObjectHandle;

    fn get_taxon_ref(&self) -> ApiResult<ObjectRef>;

    fn get_assembly_ref(&self) -> ApiResult<ObjectRef>;

    fn get_feature_types(&self) -> ApiResult<Vec<String>>;

    /// Feature counts by type. With `type_list`, exactly those types are
    /// reported, zero included.
    fn get_feature_type_counts(
        &self,
        type_list: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, u64>>;

    fn get_feature_ids(
        &self,
        filters: &FeatureFilters,
        group_by: GroupBy,
    ) -> ApiResult<FeatureIdResult>;

    fn get_features(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, FeatureView>>;

    fn get_proteins(&self) -> ApiResult<BTreeMap<String, ProteinView>>;

    fn get_mrna_exons(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, Vec<Exon>>>;

    fn get_mrna_utrs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, MrnaUtrs>>;

    fn get_cds_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>>;

    fn get_mrna_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>>;

    fn get_gene_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>>;

    fn get_gene_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>>;

    fn get_cds_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>>;

    fn get_mrna_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>>;

    fn get_taxon(&self) -> ApiResult<Taxon> {
        Taxon::open_ref(self.handle().services(), self.get_taxon_ref()?)
    }

    fn get_assembly(&self) -> ApiResult<Assembly> {
        Assembly::open_ref(self.handle().services(), self.get_assembly_ref()?)
    }

    /// Descriptions of the requested type codes, or of every known code.
    /// Unknown codes are left out.
    fn get_feature_type_descriptions(
        &self,
        type_list: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, String>> {
        let wanted = query::id_filter(type_list, "feature type")?;
        Ok(FEATURE_DESCRIPTIONS
            .iter()
            .filter(|(code, _)| wanted.as_ref().map_or(true, |w| w.contains(code)))
            .map(|(code, text)| (code.to_string(), text.to_string()))
            .collect())
    }

    fn get_feature_locations(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Vec<Region>>> {
        project(self.get_features(ids)?, |f| f.locations)
    }

    fn get_feature_dna(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, String>> {
        project(self.get_features(ids)?, |f| f.dna_sequence)
    }

    fn get_feature_functions(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, String>> {
        project(self.get_features(ids)?, |f| f.function)
    }

    fn get_feature_aliases(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, BTreeMap<String, Vec<String>>>> {
        project(self.get_features(ids)?, |f| f.aliases)
    }

    fn get_feature_publications(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Vec<Value>>> {
        project(self.get_features(ids)?, |f| f.publications)
    }
}

fn project<T>(
    features: BTreeMap<String, FeatureView>,
    field: impl Fn(FeatureView) -> T,
) -> ApiResult<BTreeMap<String, T>> {
    Ok(features.into_iter().map(|(id, f)| (id, field(f))).collect())
}

/// A genome annotation in either stored shape.
#[derive(Debug)]
pub enum GenomeAnnotation {
    Legacy(LegacyGenome),
    Sharded(ShardedAnnotation),
}

impl GenomeAnnotation {
    pub fn open(services: &Services, reference: &str) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open(services, reference)?)
    }

    pub fn open_ref(services: &Services, reference: ObjectRef) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open_ref(services, reference)?)
    }

    pub fn from_handle(handle: ObjectHandle) -> ApiResult<Self> {
        Ok(
            match TypeFamily::GENOME_ANNOTATION.classify(handle.canonical_type())? {
                Shape::Legacy => Self::Legacy(LegacyGenome::new(handle)),
                Shape::Current => Self::Sharded(ShardedAnnotation::new(handle)),
            },
        )
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Legacy(_) => Shape::Legacy,
            Self::Sharded(_) => Shape::Current,
        }
    }

    fn inner(&self) -> &dyn AnnotationQuery {
        match self {
            Self::Legacy(g) => g,
            Self::Sharded(g) => g,
        }
    }
}

impl AnnotationQuery for GenomeAnnotation {
    fn handle(&self) -> &ObjectHandle {
        self.inner().handle()
    }

    fn get_taxon_ref(&self) -> ApiResult<ObjectRef> {
        self.inner().get_taxon_ref()
    }

    fn get_assembly_ref(&self) -> ApiResult<ObjectRef> {
        self.inner().get_assembly_ref()
    }

    fn get_feature_types(&self) -> ApiResult<Vec<String>> {
        self.inner().get_feature_types()
    }

    fn get_feature_type_counts(
        &self,
        type_list: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, u64>> {
        self.inner().get_feature_type_counts(type_list)
    }

    fn get_feature_ids(
        &self,
        filters: &FeatureFilters,
        group_by: GroupBy,
    ) -> ApiResult<FeatureIdResult> {
        self.inner().get_feature_ids(filters, group_by)
    }

    fn get_features(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, FeatureView>> {
        self.inner().get_features(ids)
    }

    fn get_proteins(&self) -> ApiResult<BTreeMap<String, ProteinView>> {
        self.inner().get_proteins()
    }

    fn get_mrna_exons(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, Vec<Exon>>> {
        self.inner().get_mrna_exons(ids)
    }

    fn get_mrna_utrs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, MrnaUtrs>> {
        self.inner().get_mrna_utrs(ids)
    }

    fn get_cds_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.inner().get_cds_by_mrna(ids)
    }

    fn get_mrna_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.inner().get_mrna_by_cds(ids)
    }

    fn get_gene_by_cds(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.inner().get_gene_by_cds(ids)
    }

    fn get_gene_by_mrna(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Option<String>>> {
        self.inner().get_gene_by_mrna(ids)
    }

    fn get_cds_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.inner().get_cds_by_gene(ids)
    }

    fn get_mrna_by_gene(&self, ids: &[String]) -> ApiResult<BTreeMap<String, Vec<String>>> {
        self.inner().get_mrna_by_gene(ids)
    }
}
