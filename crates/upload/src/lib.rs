//! Chunked, cancellable upload client for the Seeker file API.
//!
//! This crate holds the **orchestration logic** of an upload batch. It has
//! no UI dependencies: callers observe progress through an event channel
//! and receive a [`BatchResult`] at the end. The transport is abstracted
//! behind [`UploadApi`]; [`HttpUploadApi`] is the reqwest implementation.
//!
//! # Pipeline
//!
//! 1. **Init**: open a server-side session for one file
//! 2. **Chunks**: send the file's chunks, at most `concurrency` at a time
//! 3. **Finalize**: have the server assemble the file (no request timeout)
//!
//! Files run one after another; a failing file is recorded and the batch
//! moves on. Cancellation stops the batch and asks the server to discard
//! every session still open.

pub mod api;
pub mod chunk;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod pool;
pub mod scanner;
pub mod session;
pub mod types;

// Re-export primary types for convenience.
pub use api::{ApiFuture, UploadApi};
pub use chunk::ChunkTask;
pub use error::UploadError;
pub use http::{HttpUploadApi, HttpUploadApiBuilder};
pub use orchestrator::UploadOrchestrator;
pub use scanner::{collect_upload_items, total_size};
pub use session::{ActiveSessions, FileUpload};
pub use types::{BatchResult, FileResult, FileState, UploadEvent, UploadOptions};

pub use seeker_transfer::{ChunkProgress, UploadItem, UploadSource};
