use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Behaviour switches for a [`DataApi`](crate::DataApi) instance.
///
/// Passed explicitly at construction; there is no process-wide
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Keep only the newest version of each referring object.
    pub referrers_most_recent: bool,
    /// Fetch a whole sequence blob when more than `total / divisor` contigs
    /// are requested; otherwise fetch byte ranges.
    pub whole_fetch_divisor: u64,
    /// Send blob handle references through the handle resolver before
    /// reading from the blob store.
    pub resolve_blob_handles: bool,
    /// Check each fetched contig against its declared MD5.
    pub verify_contig_md5: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            referrers_most_recent: true,
            whole_fetch_divisor: 3,
            resolve_blob_handles: true,
            verify_contig_md5: true,
        }
    }
}

impl ApiConfig {
    pub fn from_toml_str(s: &str) -> ApiResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.whole_fetch_divisor == 0 {
            return Err(ApiError::Config("whole_fetch_divisor must be positive".into()));
        }
        Ok(())
    }
}
