//! Client-side building blocks of the chunked upload pipeline.
//!
//! - [`UploadItem`]: one selected file and where its bytes come from.
//! - [`ChunkPlan`] / [`read_chunk`]: splitting a file into fixed-size chunks
//!   and reading one chunk's slice on demand.
//! - [`GlobalProgress`] / [`ChunkProgress`]: delta-accumulated byte counter
//!   shared by every concurrent chunk transfer of a batch.
//! - [`destination_for`]: mapping an item's relative path onto the
//!   destination directory and filename sent to the server.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkPlan, read_chunk};
pub use progress::{ChunkProgress, GlobalProgress, ProgressCallback};
pub use types::{UploadItem, UploadSource};
pub use validation::{destination_for, normalize_relative_path};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk range {start}..{end} is outside the {len}-byte source")]
    OutOfRange { start: u64, end: u64, len: u64 },
}
