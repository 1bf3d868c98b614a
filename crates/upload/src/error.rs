//! Upload error types.

use seeker_transfer::TransferError;

/// Errors produced while uploading.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The server answered but refused the operation (`success: false`).
    #[error("{0}")]
    Protocol(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("upload cancelled")]
    Cancelled,

    #[error("invalid API token")]
    InvalidToken,
}

impl UploadError {
    /// Whether this error is the batch cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }
}
