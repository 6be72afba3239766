//! Schema dispatch.
//!
//! Every logical entity the API serves exists in two physical shapes: the
//! legacy monolithic record and the current sharded one. A [`TypeFamily`]
//! names the accepted qualified type names of each shape and classifies a
//! canonical type into a [`Shape`].

use gda_types::CanonicalType;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Legacy,
    Current,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeFamily {
    pub kind: &'static str,
    pub legacy: &'static [&'static str],
    pub current: &'static [&'static str],
}

impl TypeFamily {
    pub const GENOME_ANNOTATION: TypeFamily = TypeFamily {
        kind: "genome annotation",
        legacy: &["KBaseGenomes.Genome"],
        current: &["KBaseGenomeAnnotations.GenomeAnnotation"],
    };

    pub const ASSEMBLY: TypeFamily = TypeFamily {
        kind: "assembly",
        legacy: &["KBaseGenomes.ContigSet"],
        current: &["KBaseGenomeAnnotations.Assembly"],
    };

    pub const TAXON: TypeFamily = TypeFamily {
        kind: "taxon",
        legacy: &["KBaseGenomes.Genome"],
        current: &[
            "KBaseGenomeAnnotations.Taxon",
            "KBaseGenomesCondensedPrototypeV2.Taxon",
        ],
    };

    /// Every accepted qualified name, legacy first.
    pub fn all(&self) -> impl Iterator<Item = &'static str> {
        self.legacy.iter().chain(self.current.iter()).copied()
    }

    pub fn contains(&self, canonical: &CanonicalType) -> bool {
        self.all().any(|name| canonical.is_a(name))
    }

    pub fn classify(&self, canonical: &CanonicalType) -> ApiResult<Shape> {
        let shape = if self.legacy.iter().any(|name| canonical.is_a(name)) {
            Shape::Legacy
        } else if self.current.iter().any(|name| canonical.is_a(name)) {
            Shape::Current
        } else {
            return Err(ApiError::UnsupportedType {
                found: canonical.qualified_name().to_string(),
                legacy: self.legacy.iter().map(|s| s.to_string()).collect(),
                current: self.current.iter().map(|s| s.to_string()).collect(),
            });
        };
        debug!(kind = self.kind, canonical = %canonical, ?shape, "dispatched");
        Ok(shape)
    }
}
