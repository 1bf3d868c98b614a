//! Binding between an upload batch and the notification surface.
//!
//! The controller owns the busy guard (one batch at a time), opens the
//! progress notification, scales raw transfer progress into the
//! notification's range and turns the batch outcome into one terminal
//! notification.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use seeker_upload::{
    BatchResult, UploadApi, UploadError, UploadEvent, UploadItem, UploadOptions,
    UploadOrchestrator,
};
use tracing::{debug, info, warn};

use crate::notifier::{Notifier, ProgressUpdate};

/// Shown when an upload is started while another one runs.
pub const BUSY_MESSAGE: &str = "Please wait for the current upload to finish";

/// Shown once the transfer is complete and the server assembles files.
pub const PROCESSING_MESSAGE: &str = "Processing files...";

/// Share of the progress bar given to the byte transfer.
const TRANSFER_SHARE: f64 = 0.9;

/// Raw percentage at which the transfer counts as complete.
const TRANSFER_DONE: f64 = 99.9;

/// Boxed error returned by a [`DirectoryRefresher`].
pub type RefreshError = Box<dyn Error + Send + Sync>;

/// Directory listing that should be reloaded after an upload.
pub trait DirectoryRefresher: Send + Sync {
    fn refresh<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RefreshError>> + Send + 'a>>;
}

/// How a call to [`UploadController::upload`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Another batch was running; nothing was uploaded.
    Busy,
    /// The batch ran to the end (some files may have failed).
    Completed(BatchResult),
    /// The user cancelled the batch.
    Cancelled,
    /// The batch stopped on an unexpected error.
    Failed(String),
}

/// Runs upload batches on behalf of a UI.
pub struct UploadController {
    api: Arc<dyn UploadApi>,
    notifier: Arc<dyn Notifier>,
    refresher: Option<Arc<dyn DirectoryRefresher>>,
    options: UploadOptions,
    current: Mutex<Option<u64>>,
}

impl UploadController {
    pub fn new(api: Arc<dyn UploadApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            refresher: None,
            options: UploadOptions::default(),
            current: Mutex::new(None),
        }
    }

    /// Directory listing reloaded after a batch that uploaded something.
    pub fn with_refresher(mut self, refresher: Arc<dyn DirectoryRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Id of the progress notification of the running batch, if any.
    pub fn current_upload(&self) -> Option<u64> {
        *self.lock_current()
    }

    pub fn is_busy(&self) -> bool {
        self.current_upload().is_some()
    }

    /// Uploads `items` into `destination`, reporting through the notifier.
    ///
    /// Returns once the batch is over and, if it was cancelled, once the
    /// server-side cleanup requests have settled.
    pub async fn upload(&self, destination: &str, items: Vec<UploadItem>) -> UploadOutcome {
        let mut orch = UploadOrchestrator::with_options(Arc::clone(&self.api), self.options);
        let Some(mut events) = orch.take_events() else {
            return UploadOutcome::Failed("upload events unavailable".into());
        };

        let file_count = items.len();
        let Some(guard) = self.acquire(file_count, &orch) else {
            self.notifier.info(BUSY_MESSAGE);
            return UploadOutcome::Busy;
        };
        let toast_id = guard.toast_id;

        let mut scaler = ProgressScaler::default();
        let mut progress = orch.progress();
        let batch = orch.upload(destination, items);
        tokio::pin!(batch);

        let result = loop {
            tokio::select! {
                result = &mut batch => break result,
                Some(event) = events.recv() => self.on_event(toast_id, &scaler, event),
                Ok(()) = progress.changed() => {
                    let raw = *progress.borrow_and_update();
                    self.on_progress(toast_id, &mut scaler, raw);
                }
            }
        };
        while let Ok(event) = events.try_recv() {
            self.on_event(toast_id, &scaler, event);
        }
        if progress.has_changed().unwrap_or(false) {
            let raw = *progress.borrow_and_update();
            self.on_progress(toast_id, &mut scaler, raw);
        }

        match result {
            Ok(batch) => {
                self.notifier
                    .update(toast_id, ProgressUpdate::progress(100.0));
                self.notifier.dismiss(toast_id);
                self.notify_summary(&batch);

                if batch.succeeded() > 0 {
                    self.refresh(destination).await;
                }
                UploadOutcome::Completed(batch)
            }
            Err(UploadError::Cancelled) => {
                self.notifier.dismiss(toast_id);
                self.notifier.info("Upload cancelled");
                orch.wait_for_cleanup().await;
                UploadOutcome::Cancelled
            }
            Err(e) => {
                let msg = e.to_string();
                self.notifier.dismiss(toast_id);
                self.notifier.error(&msg);
                UploadOutcome::Failed(msg)
            }
        }
    }

    /// Claims the busy slot and opens the progress notification.
    fn acquire(&self, file_count: usize, orch: &UploadOrchestrator) -> Option<BusyGuard<'_>> {
        let mut current = self.lock_current();
        if current.is_some() {
            return None;
        }

        let cancel = orch.cancel_token();
        let toast_id = self.notifier.progress(
            &format!("Uploading {file_count} file(s)..."),
            0.0,
            Box::new(move || cancel.cancel()),
        );
        *current = Some(toast_id);

        Some(BusyGuard {
            slot: &self.current,
            toast_id,
        })
    }

    fn on_progress(&self, toast_id: u64, scaler: &mut ProgressScaler, raw: f64) {
        if let Some(update) = scaler.scale(raw) {
            self.notifier.update(toast_id, update);
        }
    }

    fn on_event(&self, toast_id: u64, scaler: &ProgressScaler, event: UploadEvent) {
        match event {
            UploadEvent::FileStarted { index, total, name } => {
                if !scaler.processing() {
                    self.notifier.update(
                        toast_id,
                        ProgressUpdate::message(format!(
                            "Uploading {name} ({}/{total})",
                            index + 1
                        )),
                    );
                }
            }
            UploadEvent::FileCompleted { name } => debug!(file = %name, "file uploaded"),
            UploadEvent::FileFailed { name, error } => {
                debug!(file = %name, error = %error, "file failed")
            }
            UploadEvent::Cancelled => debug!("batch cancelled"),
        }
    }

    fn notify_summary(&self, batch: &BatchResult) {
        let total = batch.results.len();
        let succeeded = batch.succeeded();
        let failed = batch.failed();
        info!(total, succeeded, failed, "upload finished");

        if failed == 0 {
            self.notifier
                .success(&format!("Uploaded {succeeded} file(s)"));
        } else if succeeded == 0 {
            self.notifier
                .error(batch.first_error().unwrap_or("Upload failed"));
        } else {
            self.notifier.error(&format!(
                "{succeeded} of {total} files uploaded, {failed} failed"
            ));
        }
    }

    async fn refresh(&self, destination: &str) {
        let Some(refresher) = &self.refresher else {
            return;
        };
        if let Err(e) = refresher.refresh(destination).await {
            warn!(path = %destination, error = %e, "failed to refresh directory listing");
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<u64>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the busy slot when dropped, whatever the outcome.
struct BusyGuard<'a> {
    slot: &'a Mutex<Option<u64>>,
    toast_id: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Maps raw transfer progress onto the notification's 0–90% range.
///
/// Once the transfer is complete the notification switches to
/// [`PROCESSING_MESSAGE`] at 90% and later raw updates are ignored.
#[derive(Debug, Default)]
pub struct ProgressScaler {
    processing: bool,
}

impl ProgressScaler {
    /// Returns the update to apply for raw percentage `raw`, if any.
    pub fn scale(&mut self, raw: f64) -> Option<ProgressUpdate> {
        if self.processing {
            return None;
        }
        if raw >= TRANSFER_DONE {
            self.processing = true;
            return Some(
                ProgressUpdate::message(PROCESSING_MESSAGE).with_progress(TRANSFER_SHARE * 100.0),
            );
        }
        Some(ProgressUpdate::progress(raw.max(0.0) * TRANSFER_SHARE))
    }

    pub fn processing(&self) -> bool {
        self.processing
    }
}
