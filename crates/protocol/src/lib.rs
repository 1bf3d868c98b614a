//! Wire protocol for the Seeker chunked upload API.
//!
//! Four calls, all `POST` relative to the API base URL:
//!
//! | Call     | Path                    | Body                                  |
//! |----------|-------------------------|---------------------------------------|
//! | init     | `files/upload/init`     | JSON [`InitUploadRequest`]            |
//! | chunk    | `files/upload/chunk`    | multipart `uploadId`, `chunkIndex`, `chunk` |
//! | finalize | `files/upload/finalize` | JSON [`FinalizeUploadRequest`]        |
//! | cancel   | `files/upload/cancel`   | JSON [`CancelUploadRequest`]          |

pub mod constants;
pub mod messages;

pub use constants::{
    CHUNK_SIZE, CONCURRENCY, DEFAULT_REQUEST_TIMEOUT, Endpoint, FIELD_CHUNK, FIELD_CHUNK_INDEX,
    FIELD_UPLOAD_ID,
};
pub use messages::{
    CancelUploadRequest, CancelUploadResponse, FinalizeUploadRequest, FinalizeUploadResponse,
    InitUploadRequest, InitUploadResponse,
};
