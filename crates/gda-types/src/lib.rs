//! Foundation types for the genome data API.
//!
//! Every other `gda-*` crate depends on `gda-types`.
//!
//! # Key Types
//!
//! - [`ObjectRef`] -- version-pinned `(workspace, object, version)` reference
//! - [`ReferenceSpec`] -- syntactically valid reference awaiting resolution
//! - [`ObjectInfo`] -- metadata for one stored object version
//! - [`ProvenanceAction`] -- one step of an object's provenance
//! - [`TypeString`] -- parsed raw type string (`Module.Type-version`)
//! - [`CanonicalType`] -- content-addressed type identity used for `is-a` checks
//! - [`SchemaDigest`] -- BLAKE3 digest of a type's structural schema

pub mod digest;
pub mod error;
pub mod info;
pub mod reference;
pub mod typename;

pub use digest::SchemaDigest;
pub use error::TypeError;
pub use info::{ObjectInfo, ProvenanceAction};
pub use reference::{Locator, ObjectRef, ReferenceSpec};
pub use typename::{CanonicalType, TypeString};
