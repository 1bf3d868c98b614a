//! Upload notifications.
//!
//! - [`ToastQueue`]: in-memory toast list with progress toasts.
//! - [`Notifier`]: the notification surface an upload reports to;
//!   [`ToastCenter`] is the thread-safe toast-backed implementation.
//! - [`UploadController`]: runs one batch at a time against a notifier,
//!   scaling transfer progress and summarizing the outcome.

pub mod controller;
pub mod notifier;
pub mod toast;

pub use controller::{
    BUSY_MESSAGE, DirectoryRefresher, PROCESSING_MESSAGE, ProgressScaler, RefreshError,
    UploadController, UploadOutcome,
};
pub use notifier::{CancelAction, Notifier, ProgressUpdate, ToastCenter};
pub use toast::{Toast, ToastQueue, ToastType};
