use gda_store::StoreError;
use gda_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("unsupported type {found}: expected one of {legacy:?} or {current:?}")]
    UnsupportedType {
        found: String,
        legacy: Vec<String>,
        current: Vec<String>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} is not supported for {type_name} objects")]
    Unsupported {
        operation: &'static str,
        type_name: String,
    },

    #[error("malformed object {reference}: {reason}")]
    Malformed { reference: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ObjectNotFound(reference) => Self::NotFound(reference.to_string()),
            StoreError::BlobNotFound(node) => Self::NotFound(format!("blob {node}")),
            StoreError::AmbiguousReference { .. } | StoreError::Type(_) => {
                Self::InvalidArgument(e.to_string())
            }
            other => Self::Store(other),
        }
    }
}

impl From<TypeError> for ApiError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
