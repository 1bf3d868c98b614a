//! Upload API trait.
//!
//! `UploadApi` is implemented by [`HttpUploadApi`](crate::HttpUploadApi)
//! for the real server. Keeping the transport behind a trait keeps the
//! orchestration logic testable with mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use seeker_protocol::{
    CancelUploadResponse, FinalizeUploadRequest, FinalizeUploadResponse, InitUploadRequest,
    InitUploadResponse,
};
use seeker_transfer::ChunkProgress;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// Boxed future returned by [`UploadApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Abstract connection to the upload endpoints.
pub trait UploadApi: Send + Sync {
    /// Opens a session for one destination file.
    fn init_upload(&self, req: &InitUploadRequest) -> ApiFuture<'_, InitUploadResponse>;

    /// Sends one chunk.
    ///
    /// Implementations report the number of chunk bytes sent so far via
    /// [`ChunkProgress::observe`] as the body goes out. Success means the
    /// server answered 2xx.
    fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u64,
        data: Bytes,
        progress: Arc<ChunkProgress>,
    ) -> ApiFuture<'_, ()>;

    /// Asks the server to assemble the session into the destination file.
    ///
    /// Must not apply a request timeout.
    fn finalize_upload(&self, req: &FinalizeUploadRequest) -> ApiFuture<'_, FinalizeUploadResponse>;

    /// Discards a session.
    fn cancel_upload(&self, upload_id: &str) -> ApiFuture<'_, CancelUploadResponse>;
}

/// Races `fut` against `cancel`.
///
/// Cancellation wins ties. Losing the race drops `fut`, which aborts the
/// underlying request.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, UploadError>>,
) -> Result<T, UploadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UploadError::Cancelled),
        result = fut => result,
    }
}
