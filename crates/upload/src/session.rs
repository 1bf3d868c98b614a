//! Per-file init → chunks → finalize protocol.

use std::sync::{Arc, Mutex, PoisonError};

use seeker_protocol::{FinalizeUploadRequest, InitUploadRequest};
use seeker_transfer::{ChunkPlan, GlobalProgress, UploadItem, destination_for};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{UploadApi, cancellable};
use crate::chunk::ChunkTask;
use crate::error::UploadError;
use crate::pool::run_pool;
use crate::types::{FileState, UploadOptions};

/// Upload ids the server holds open for the current batch.
///
/// An id is added once init succeeds and removed once finalize succeeds.
/// Whatever is left when the batch is cancelled gets a cancel request.
#[derive(Debug, Clone, Default)]
pub struct ActiveSessions {
    ids: Arc<Mutex<Vec<String>>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, upload_id: impl Into<String>) {
        self.lock().push(upload_id.into());
    }

    /// Returns whether `upload_id` was tracked.
    pub fn remove(&self, upload_id: &str) -> bool {
        let mut ids = self.lock();
        match ids.iter().position(|id| id == upload_id) {
            Some(pos) => {
                ids.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes and returns every tracked id.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs the three-phase protocol for one file.
pub struct FileUpload<'a> {
    api: &'a dyn UploadApi,
    options: UploadOptions,
    cancel: &'a CancellationToken,
    sessions: &'a ActiveSessions,
    state: FileState,
}

impl<'a> FileUpload<'a> {
    pub fn new(
        api: &'a dyn UploadApi,
        options: UploadOptions,
        cancel: &'a CancellationToken,
        sessions: &'a ActiveSessions,
    ) -> Self {
        Self {
            api,
            options,
            cancel,
            sessions,
            state: FileState::Init,
        }
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Uploads `item` into `destination`.
    ///
    /// Returns the server-side path of the assembled file. On error the
    /// state is `Cancelled` for [`UploadError::Cancelled`] and `Failed`
    /// otherwise.
    pub async fn run(
        &mut self,
        destination: &str,
        item: &UploadItem,
        progress: &Arc<GlobalProgress>,
    ) -> Result<String, UploadError> {
        let result = self.run_phases(destination, item, progress).await;
        self.state = match &result {
            Ok(_) => FileState::Done,
            Err(e) if e.is_cancelled() => FileState::Cancelled,
            Err(_) => FileState::Failed,
        };
        result
    }

    async fn run_phases(
        &mut self,
        destination: &str,
        item: &UploadItem,
        progress: &Arc<GlobalProgress>,
    ) -> Result<String, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let (path, filename) = destination_for(destination, item)?;
        let plan = ChunkPlan::new(item.size(), self.options.chunk_size);

        // 1. Init
        self.state = FileState::Init;
        let init = InitUploadRequest {
            path: path.clone(),
            filename: filename.clone(),
            total_chunks: plan.total_chunks(),
        };
        let resp = cancellable(self.cancel, self.api.init_upload(&init)).await?;
        if !resp.success {
            return Err(UploadError::Protocol(
                resp.error
                    .unwrap_or_else(|| "failed to initialize upload".into()),
            ));
        }
        let upload_id = resp
            .upload_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UploadError::Protocol("server returned no upload id".into()))?;
        self.sessions.insert(upload_id.clone());

        debug!(
            upload_id = %upload_id,
            path = %path,
            filename = %filename,
            chunks = plan.total_chunks(),
            "upload session opened"
        );

        // 2. Chunks
        self.state = FileState::Uploading;
        let api = self.api;
        let cancel = self.cancel;
        let id = upload_id.as_str();
        let source = item.source();
        run_pool(plan.total_chunks(), self.options.concurrency, cancel, |index| async move {
            ChunkTask::new(id, source, &plan, index)?
                .run(api, progress, cancel)
                .await
        })
        .await?;

        // 3. Finalize
        self.state = FileState::Finalizing;
        let finalize = FinalizeUploadRequest {
            upload_id: upload_id.clone(),
            path: path.clone(),
            filename: filename.clone(),
        };
        let resp = cancellable(self.cancel, self.api.finalize_upload(&finalize)).await?;
        if !resp.success {
            return Err(UploadError::Protocol(
                resp.error.unwrap_or_else(|| "failed to finalize upload".into()),
            ));
        }
        self.sessions.remove(&upload_id);

        let final_path = resp.path.unwrap_or_else(|| join_path(&path, &filename));
        debug!(upload_id = %upload_id, path = %final_path, "upload finalized");
        Ok(final_path)
    }
}

fn join_path(dir: &str, filename: &str) -> String {
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), filename)
    }
}
