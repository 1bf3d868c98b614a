use std::time::Duration;

/// Size of one upload chunk (10 MiB). The last chunk of a file may be shorter.
pub const CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Maximum chunk requests in flight for a single file.
pub const CONCURRENCY: usize = 4;

/// Timeout for init, chunk and cancel requests. Finalize has none.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Multipart field carrying the session identifier.
pub const FIELD_UPLOAD_ID: &str = "uploadId";

/// Multipart field carrying the zero-based chunk index.
pub const FIELD_CHUNK_INDEX: &str = "chunkIndex";

/// Multipart field carrying the chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";

/// Upload API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Init,
    Chunk,
    Finalize,
    Cancel,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Init => "files/upload/init",
            Endpoint::Chunk => "files/upload/chunk",
            Endpoint::Finalize => "files/upload/finalize",
            Endpoint::Cancel => "files/upload/cancel",
        }
    }

    /// Whether the default request timeout applies to this call.
    pub fn has_timeout(self) -> bool {
        !matches!(self, Endpoint::Finalize)
    }
}
