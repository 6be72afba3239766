//! Assemblies: contig metadata, statistics and sequences.
//!
//! [`Assembly`] serves the legacy `KBaseGenomes.ContigSet`, which stores
//! every sequence inline, and the current `KBaseGenomeAnnotations.Assembly`,
//! whose sequences live in a FASTA blob indexed by byte offsets.

pub mod contigset;
pub mod fetch;
pub mod hub;

use std::collections::BTreeMap;

use gda_types::ObjectRef;
use serde::{Deserialize, Serialize};

use crate::client::Services;
use crate::dispatch::{Shape, TypeFamily};
use crate::error::ApiResult;
use crate::object::ObjectHandle;

pub use contigset::ContigSetAssembly;
pub use fetch::FetchPlan;
pub use hub::HubAssembly;

/// One contig with its sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContigRecord {
    pub contig_id: String,
    pub sequence: String,
    pub length: i64,
    pub gc_content: Option<f64>,
    pub md5: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_complete: Option<bool>,
    pub is_circular: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyStats {
    #[serde(default)]
    pub gc_content: Option<f64>,
    #[serde(default)]
    pub dna_size: u64,
    #[serde(default)]
    pub num_contigs: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSourceInfo {
    #[serde(default)]
    pub external_source: String,
    #[serde(default)]
    pub external_source_id: String,
    #[serde(default)]
    pub external_source_origination_date: String,
}

/// Queries every assembly answers, whatever its stored shape.
///
/// Contig-keyed maps omit ids the assembly does not hold.
pub trait AssemblyQuery {
    fn handle(&self) -> &ObjectHandle;

    fn get_assembly_id(&self) -> ApiResult<String>;

    fn get_external_source_info(&self) -> ApiResult<ExternalSourceInfo>;

    fn get_stats(&self) -> ApiResult<AssemblyStats>;

    fn get_contig_ids(&self) -> ApiResult<Vec<String>>;

    fn get_contig_lengths(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, i64>>;

    fn get_contig_gc_content(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Option<f64>>>;

    fn get_contigs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, ContigRecord>>;

    fn get_number_contigs(&self) -> ApiResult<u64> {
        Ok(self.get_stats()?.num_contigs)
    }

    fn get_gc_content(&self) -> ApiResult<Option<f64>> {
        Ok(self.get_stats()?.gc_content)
    }

    fn get_dna_size(&self) -> ApiResult<u64> {
        Ok(self.get_stats()?.dna_size)
    }

    /// Annotations built on this assembly.
    fn get_genome_annotations(&self) -> ApiResult<Vec<ObjectRef>> {
        let types: Vec<&str> = TypeFamily::GENOME_ANNOTATION.all().collect();
        self.handle().referrers_of_type(&types)
    }
}

/// An assembly in either stored shape.
#[derive(Debug)]
pub enum Assembly {
    Legacy(ContigSetAssembly),
    Current(HubAssembly),
}

impl Assembly {
    pub fn open(services: &Services, reference: &str) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open(services, reference)?)
    }

    pub fn open_ref(services: &Services, reference: ObjectRef) -> ApiResult<Self> {
        Self::from_handle(ObjectHandle::open_ref(services, reference)?)
    }

    pub fn from_handle(handle: ObjectHandle) -> ApiResult<Self> {
        Ok(match TypeFamily::ASSEMBLY.classify(handle.canonical_type())? {
            Shape::Legacy => Self::Legacy(ContigSetAssembly::new(handle)),
            Shape::Current => Self::Current(HubAssembly::new(handle)),
        })
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Legacy(_) => Shape::Legacy,
            Self::Current(_) => Shape::Current,
        }
    }

    fn inner(&self) -> &dyn AssemblyQuery {
        match self {
            Self::Legacy(a) => a,
            Self::Current(a) => a,
        }
    }
}

impl AssemblyQuery for Assembly {
    fn handle(&self) -> &ObjectHandle {
        self.inner().handle()
    }

    fn get_assembly_id(&self) -> ApiResult<String> {
        self.inner().get_assembly_id()
    }

    fn get_external_source_info(&self) -> ApiResult<ExternalSourceInfo> {
        self.inner().get_external_source_info()
    }

    fn get_stats(&self) -> ApiResult<AssemblyStats> {
        self.inner().get_stats()
    }

    fn get_contig_ids(&self) -> ApiResult<Vec<String>> {
        self.inner().get_contig_ids()
    }

    fn get_contig_lengths(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, i64>> {
        self.inner().get_contig_lengths(ids)
    }

    fn get_contig_gc_content(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Option<f64>>> {
        self.inner().get_contig_gc_content(ids)
    }

    fn get_contigs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, ContigRecord>> {
        self.inner().get_contigs(ids)
    }
}
