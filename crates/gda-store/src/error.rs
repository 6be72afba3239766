use gda_types::{ObjectRef, TypeError};

/// Errors from object and blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A pinned reference names a version the store does not hold.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectRef),

    /// A loose reference matched more than one object.
    #[error("ambiguous reference {reference:?}: matches {candidates} objects")]
    AmbiguousReference { reference: String, candidates: usize },

    /// No blob is stored under the given node id.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// A byte range reaches past the end of a blob.
    #[error("range {start}+{length} out of bounds for blob {node} ({size} bytes)")]
    RangeOutOfBounds {
        node: String,
        start: u64,
        length: u64,
        size: u64,
    },

    /// An object path or blob node id is not well formed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Reference or type string rejected by the type layer.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
