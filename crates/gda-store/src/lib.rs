//! Object and blob store interfaces for the genome data API.
//!
//! The data API never talks to a transport directly. It reads through three
//! seams:
//!
//! - [`ObjectStore`] -- versioned objects: reference resolution, full and
//!   subset reads, referrers, type canonicalisation, history, provenance
//! - [`BlobStore`] -- whole and byte-range reads of sequence files
//! - [`HandleResolver`] -- the hop from a stored handle reference to a blob
//!   node id
//!
//! # Backends
//!
//! - [`InMemoryObjectStore`], [`InMemoryBlobStore`], [`InMemoryHandleResolver`]
//!   -- for tests and local fixtures; every call is logged
//! - [`DirBlobStore`] -- blobs as files in one directory
//! - [`Fixture`] -- JSON documents that populate the in-memory stores
//!
//! # Design Rules
//!
//! 1. Stored versions are immutable; pinned reads are repeatable.
//! 2. Absent objects are `Ok(None)` at resolution and `ObjectNotFound` after.
//! 3. Subset reads omit missing paths instead of failing.
//! 4. All backend errors are propagated, never silently ignored.

pub mod blob;
pub mod error;
pub mod fixture;
pub mod fs;
pub mod memory;
pub mod path;
pub mod record;
pub mod traits;

pub use blob::{BlobRequest, InMemoryBlobStore, InMemoryHandleResolver};
pub use error::{StoreError, StoreResult};
pub use fixture::{Fixture, FixtureObject};
pub use fs::DirBlobStore;
pub use memory::{InMemoryObjectStore, StoreRequest};
pub use path::{extract_subset, ObjectPath};
pub use record::{collect_refs, StoredRecord};
pub use traits::{BlobStore, HandleResolver, ObjectStore};
