use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Blob store backed by a directory: node `abc` is the file `<root>/abc`.
#[derive(Clone, Debug)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node_path(&self, node: &str) -> StoreResult<PathBuf> {
        let valid = !node.is_empty()
            && node != "."
            && node != ".."
            && !node.contains(['/', '\\'])
            && !node.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidPath {
                path: node.to_string(),
                reason: "node ids must be plain file names".into(),
            });
        }
        Ok(self.root.join(node))
    }

    fn open(&self, node: &str) -> StoreResult<File> {
        let path = self.node_path(node)?;
        File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::BlobNotFound(node.to_string()),
            _ => StoreError::Io(e),
        })
    }
}

impl BlobStore for DirBlobStore {
    fn fetch_whole(&self, node: &str) -> StoreResult<Bytes> {
        let mut file = self.open(node)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        debug!(node, bytes = buf.len(), "whole blob read from disk");
        Ok(Bytes::from(buf))
    }

    fn fetch_range(&self, node: &str, start: u64, length: u64) -> StoreResult<Bytes> {
        let mut file = self.open(node)?;
        let size = file.metadata()?.len();
        if start.checked_add(length).map_or(true, |end| end > size) {
            return Err(StoreError::RangeOutOfBounds {
                node: node.to_string(),
                start,
                length,
                size,
            });
        }
        let len = usize::try_from(length).map_err(|_| StoreError::RangeOutOfBounds {
            node: node.to_string(),
            start,
            length,
            size,
        })?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        debug!(node, start, length, "blob range read from disk");
        Ok(Bytes::from(buf))
    }
}
