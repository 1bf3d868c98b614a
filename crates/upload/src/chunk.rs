//! Upload of a single chunk.

use std::ops::Range;
use std::sync::Arc;

use seeker_transfer::{ChunkPlan, GlobalProgress, UploadSource, read_chunk};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{UploadApi, cancellable};
use crate::error::UploadError;

/// One chunk of one session, ready to be sent.
#[derive(Debug, Clone)]
pub struct ChunkTask<'a> {
    upload_id: &'a str,
    index: u64,
    range: Range<u64>,
    source: &'a UploadSource,
}

impl<'a> ChunkTask<'a> {
    /// Selects chunk `index` of `plan`.
    pub fn new(
        upload_id: &'a str,
        source: &'a UploadSource,
        plan: &ChunkPlan,
        index: u64,
    ) -> Result<Self, UploadError> {
        let range = plan.chunk_range(index).ok_or_else(|| {
            UploadError::Protocol(format!(
                "chunk {index} out of range ({} chunks)",
                plan.total_chunks()
            ))
        })?;
        Ok(Self {
            upload_id,
            index,
            range,
            source,
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the chunk's bytes and sends them.
    ///
    /// Transport progress is folded into `progress` as deltas. When the
    /// server accepts the chunk, any bytes the progress reports missed are
    /// credited so the chunk counts exactly its length.
    pub async fn run(
        self,
        api: &dyn UploadApi,
        progress: &Arc<GlobalProgress>,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let tracker = Arc::new(progress.chunk(self.len()));

        cancellable(cancel, async {
            let data = read_chunk(self.source, self.range.clone()).await?;
            api.upload_chunk(self.upload_id, self.index, data, Arc::clone(&tracker))
                .await
        })
        .await?;

        let correction = tracker.complete();
        debug!(
            upload_id = self.upload_id,
            chunk = self.index,
            bytes = self.len(),
            correction,
            "chunk uploaded"
        );
        Ok(())
    }
}
