//! Uniform read access to genome annotations, assemblies and taxa.
//!
//! Each logical entity is stored in one of two physical shapes, a legacy
//! monolithic record or a current sharded one. This crate hides the
//! difference: open a reference through [`DataApi`] and query the returned
//! adapter through its trait.
//!
//! # Key Types
//!
//! - [`DataApi`] -- entry point; opens references as handles or adapters
//! - [`ObjectHandle`] -- one pinned object with memoized payload, history
//!   and provenance
//! - [`GenomeAnnotation`] / [`AnnotationQuery`] -- features, proteins,
//!   exons, UTRs and feature relationships
//! - [`Assembly`] / [`AssemblyQuery`] -- contig metadata, statistics and
//!   sequences
//! - [`Taxon`] / [`TaxonQuery`] -- naming fields and tree links
//! - [`ApiConfig`] -- tunables, loadable from TOML
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gda_api::{AnnotationQuery, DataApi, FeatureFilters, GroupBy, Services};
//! use gda_store::{DirBlobStore, Fixture};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (objects, handles) = Fixture::load("reference.json")?.into_stores()?;
//! let services = Services::new(Arc::new(objects), Arc::new(DirBlobStore::new("blobs")))
//!     .with_handle_resolver(Arc::new(handles));
//! let api = DataApi::new(services)?;
//!
//! let genome = api.genome_annotation("ReferenceGenomes/kb|g.0")?;
//! let cds = genome.get_feature_ids(&FeatureFilters::new().types(["CDS"]), GroupBy::Type)?;
//! println!("{:?}", cds.by_type);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod assembly;
pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod object;
pub mod taxon;

#[cfg(test)]
pub(crate) mod fixtures;

pub use annotation::{
    AnnotationQuery, FeatureFilters, FeatureIdResult, FeatureView, GenomeAnnotation, GroupBy,
    ProteinView, Region, Strand, FEATURE_DESCRIPTIONS,
};
pub use assembly::{Assembly, AssemblyQuery, AssemblyStats, ContigRecord, ExternalSourceInfo};
pub use cache::CacheSlot;
pub use client::{DataApi, Services};
pub use config::ApiConfig;
pub use dispatch::{Shape, TypeFamily};
pub use error::{ApiError, ApiResult};
pub use object::ObjectHandle;
pub use taxon::{Taxon, TaxonQuery};
