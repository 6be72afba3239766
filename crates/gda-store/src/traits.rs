use bytes::Bytes;
use gda_types::{CanonicalType, ObjectInfo, ObjectRef, ProvenanceAction, ReferenceSpec};
use serde_json::Value;

use crate::error::StoreResult;
use crate::path::ObjectPath;

/// Versioned object store.
///
/// Implementations must satisfy these invariants:
/// - Stored object versions are immutable; a pinned [`ObjectRef`] always
///   yields the same payload.
/// - `resolve_reference` returns `Ok(None)` for an absent object and `Err`
///   only when the store itself fails.
/// - `get_object_subset` omits paths that do not exist instead of failing.
/// - Transport or backend failures are returned, never swallowed.
pub trait ObjectStore: Send + Sync {
    /// Resolve a loose reference to the metadata of one pinned version.
    fn resolve_reference(&self, reference: &ReferenceSpec) -> StoreResult<Option<ObjectInfo>>;

    /// Fetch the full payload of a pinned version.
    fn get_object(&self, reference: &ObjectRef) -> StoreResult<Value>;

    /// Fetch only the requested paths of a pinned version.
    ///
    /// The result mirrors the payload's nesting and contains just the paths
    /// that exist.
    fn get_object_subset(&self, reference: &ObjectRef, paths: &[ObjectPath]) -> StoreResult<Value>;

    /// Metadata of every stored object version that refers to `reference`.
    fn get_referrers(&self, reference: &ObjectRef) -> StoreResult<Vec<ObjectInfo>>;

    /// Translate a raw type string into its canonical form.
    fn translate_type(&self, type_string: &str) -> StoreResult<CanonicalType>;

    /// The structural schema registered for a type string, if any.
    fn get_schema(&self, type_string: &str) -> StoreResult<Option<Value>>;

    /// Every version of the referenced object, oldest first.
    fn get_history(&self, reference: &ObjectRef) -> StoreResult<Vec<ObjectInfo>>;

    /// Provenance recorded when the referenced version was saved.
    fn get_provenance(&self, reference: &ObjectRef) -> StoreResult<Vec<ProvenanceAction>>;
}

/// Byte-addressed blob store holding sequence files.
pub trait BlobStore: Send + Sync {
    /// Fetch a whole blob.
    fn fetch_whole(&self, node: &str) -> StoreResult<Bytes>;

    /// Fetch `length` bytes starting at `start`.
    fn fetch_range(&self, node: &str, start: u64, length: u64) -> StoreResult<Bytes>;
}

/// Maps a handle reference stored in an object to a blob node id.
pub trait HandleResolver: Send + Sync {
    /// Returns `Ok(None)` if the handle is not known.
    fn resolve_handle(&self, handle: &str) -> StoreResult<Option<String>>;
}
