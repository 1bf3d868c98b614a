use std::io::SeekFrom;
use std::ops::Range;

use bytes::Bytes;
use seeker_protocol::CHUNK_SIZE;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;
use crate::types::UploadSource;

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Fixed-size split of one file into chunks.
///
/// Every chunk is `chunk_size` bytes except the last, which holds the
/// remainder. A zero-byte file has zero chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Plans `file_size` bytes in chunks of `chunk_size`.
    ///
    /// If `chunk_size` is 0, [`CHUNK_SIZE`] (10 MiB) is used.
    pub fn new(file_size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };
        Self {
            file_size,
            chunk_size: chunk_size as u64,
        }
    }

    /// `ceil(file_size / chunk_size)`.
    pub fn total_chunks(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size)
    }

    /// Byte range of chunk `index`, or `None` past the last chunk.
    pub fn chunk_range(&self, index: u64) -> Option<Range<u64>> {
        if index >= self.total_chunks() {
            return None;
        }
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.file_size);
        Some(start..end)
    }

    /// Length of chunk `index` (0 past the last chunk).
    pub fn chunk_len(&self, index: u64) -> u64 {
        self.chunk_range(index).map_or(0, |r| r.end - r.start)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

// ---------------------------------------------------------------------------
// Chunk reading
// ---------------------------------------------------------------------------

/// Reads the bytes of `range` from `source`.
///
/// Files are opened per call so concurrent chunks of the same file never
/// share a cursor. Memory sources are sliced without copying.
pub async fn read_chunk(source: &UploadSource, range: Range<u64>) -> Result<Bytes, TransferError> {
    let len = range.end.saturating_sub(range.start);

    match source {
        UploadSource::Memory(data) => {
            let source_len = data.len() as u64;
            if range.start > range.end || range.end > source_len {
                return Err(TransferError::OutOfRange {
                    start: range.start,
                    end: range.end,
                    len: source_len,
                });
            }
            Ok(data.slice(range.start as usize..range.end as usize))
        }
        UploadSource::File(path) => {
            let mut file = tokio::fs::File::open(path).await?;
            file.seek(SeekFrom::Start(range.start)).await?;
            let mut buf = vec![0u8; len as usize];
            file.read_exact(&mut buf).await?;
            Ok(Bytes::from(buf))
        }
    }
}
