use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::TransferError;

/// Where an item's bytes are read from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file on the local filesystem, read chunk by chunk.
    File(PathBuf),
    /// An in-memory buffer; chunks are zero-copy slices of it.
    Memory(Bytes),
}

/// One file selected for upload.
///
/// Built once at selection time and never mutated; the orchestrator
/// consumes it. `size` is captured up front because the batch progress
/// denominator is the sum of all item sizes.
#[derive(Debug, Clone)]
pub struct UploadItem {
    name: String,
    relative_path: Option<String>,
    size: u64,
    source: UploadSource,
}

impl UploadItem {
    /// Creates an item for a file on disk, reading its size from metadata.
    pub fn from_path(path: &Path) -> Result<Self, TransferError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidPath(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TransferError::InvalidPath(format!("no file name: {}", path.display()))
            })?;

        Ok(Self {
            name,
            relative_path: None,
            size: metadata.len(),
            source: UploadSource::File(path.to_path_buf()),
        })
    }

    /// Creates an item backed by an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            relative_path: None,
            size: data.len() as u64,
            source: UploadSource::Memory(data),
        }
    }

    /// Attaches the path of this file relative to a dropped/selected folder
    /// (including the folder's own name, e.g. `photos/2024/a.jpg`).
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    /// Size in bytes as known at selection time.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &UploadSource {
        &self.source
    }
}
