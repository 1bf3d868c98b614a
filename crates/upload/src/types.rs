//! Data types for the upload flow.

use seeker_protocol::{CHUNK_SIZE, CONCURRENCY};

/// Tunables for one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Bytes per chunk (the last chunk of a file may be shorter).
    pub chunk_size: usize,
    /// Maximum chunk requests in flight for one file.
    pub concurrency: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            concurrency: CONCURRENCY,
        }
    }
}

/// Lifecycle of one file's upload.
///
/// `Init → Uploading → Finalizing → Done` on success; any state may end
/// in `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Init,
    Uploading,
    Finalizing,
    Done,
    Failed,
    Cancelled,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Done | FileState::Failed | FileState::Cancelled)
    }
}

/// Lifecycle event emitted while a batch runs.
///
/// Byte progress is published separately, see
/// [`UploadOrchestrator::progress`](crate::UploadOrchestrator::progress).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A file is about to be initialised. `index` is zero-based.
    FileStarted {
        index: usize,
        total: usize,
        name: String,
    },
    /// A file was finalized by the server.
    FileCompleted { name: String },
    /// A file failed; the batch continues with the next one.
    FileFailed { name: String, error: String },
    /// The batch was cancelled; no further files will start.
    Cancelled,
}

/// Outcome of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
}

impl FileResult {
    pub fn succeeded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// `true` iff every file succeeded.
    pub success: bool,
    pub results: Vec<FileResult>,
}

impl BatchResult {
    pub fn from_results(results: Vec<FileResult>) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            results,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Error message of the first failed file, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}
