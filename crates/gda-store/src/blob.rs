use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobStore, HandleResolver};

/// One call made against an [`InMemoryBlobStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobRequest {
    Whole { node: String },
    Range { node: String, start: u64, length: u64 },
}

/// In-memory blob store keyed by node id, with a request log.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
    requests: Mutex<Vec<BlobRequest>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, node: impl Into<String>, data: impl Into<Bytes>) -> StoreResult<()> {
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(node.into(), data.into());
        Ok(())
    }

    /// Every call made so far, oldest first.
    pub fn requests(&self) -> Vec<BlobRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.clear();
        }
    }

    fn get(&self, node: &str) -> StoreResult<Bytes> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(node)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(node.to_string()))
    }

    fn log(&self, request: BlobRequest) -> StoreResult<()> {
        self.requests.lock().map_err(poisoned)?.push(request);
        Ok(())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn fetch_whole(&self, node: &str) -> StoreResult<Bytes> {
        self.log(BlobRequest::Whole {
            node: node.to_string(),
        })?;
        let blob = self.get(node)?;
        debug!(node, bytes = blob.len(), "whole blob read");
        Ok(blob)
    }

    fn fetch_range(&self, node: &str, start: u64, length: u64) -> StoreResult<Bytes> {
        self.log(BlobRequest::Range {
            node: node.to_string(),
            start,
            length,
        })?;
        let blob = self.get(node)?;
        let size = blob.len() as u64;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= size)
            .ok_or_else(|| StoreError::RangeOutOfBounds {
                node: node.to_string(),
                start,
                length,
                size,
            })?;
        debug!(node, start, length, "blob range read");
        Ok(blob.slice(start as usize..end as usize))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.blobs.read().map(|b| b.len()).unwrap_or(0);
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}

/// In-memory handle table mapping handle references to node ids.
#[derive(Debug, Default)]
pub struct InMemoryHandleResolver {
    handles: RwLock<HashMap<String, String>>,
    lookups: Mutex<Vec<String>>,
}

impl InMemoryHandleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(handles: HashMap<String, String>) -> Self {
        Self {
            handles: RwLock::new(handles),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, handle: impl Into<String>, node: impl Into<String>) -> StoreResult<()> {
        self.handles
            .write()
            .map_err(poisoned)?
            .insert(handle.into(), node.into());
        Ok(())
    }

    /// Handles looked up so far, oldest first.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl HandleResolver for InMemoryHandleResolver {
    fn resolve_handle(&self, handle: &str) -> StoreResult<Option<String>> {
        self.lookups.lock().map_err(poisoned)?.push(handle.to_string());
        Ok(self.handles.read().map_err(poisoned)?.get(handle).cloned())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}
