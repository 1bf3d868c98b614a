//! Notification surface used by the upload controller.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::toast::{Toast, ToastQueue};

/// Action run when the user cancels a progress notification.
pub type CancelAction = Box<dyn Fn() + Send + Sync>;

/// Partial change to a progress notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub message: Option<String>,
    pub progress: Option<f64>,
}

impl ProgressUpdate {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            progress: None,
        }
    }

    pub fn progress(percent: f64) -> Self {
        Self {
            message: None,
            progress: Some(percent),
        }
    }

    pub fn with_progress(mut self, percent: f64) -> Self {
        self.progress = Some(percent);
        self
    }
}

/// Something that can show upload notifications to the user.
pub trait Notifier: Send + Sync {
    /// Opens a progress notification and returns its id.
    ///
    /// `on_cancel` runs when the user cancels it.
    fn progress(&self, message: &str, initial_percent: f64, on_cancel: CancelAction) -> u64;

    fn update(&self, id: u64, update: ProgressUpdate);

    fn dismiss(&self, id: u64);

    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn info(&self, message: &str);
}

/// Thread-safe [`Notifier`] backed by a [`ToastQueue`].
///
/// Cancel actions are kept alongside the queue until the toast is
/// dismissed; [`cancel`](Self::cancel) is what a UI's cancel button calls.
#[derive(Default)]
pub struct ToastCenter {
    queue: Mutex<ToastQueue>,
    cancel_actions: Mutex<HashMap<u64, CancelAction>>,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the cancel action of a progress toast.
    ///
    /// Returns `false` if the toast has no cancel action (or is gone).
    pub fn cancel(&self, id: u64) -> bool {
        let actions = self.actions();
        match actions.get(&id) {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Copy of the toasts currently shown.
    pub fn snapshot(&self) -> Vec<Toast> {
        self.queue().iter().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<Toast> {
        self.queue().get(id).cloned()
    }

    /// Removes a toast without running its cancel action.
    pub fn remove(&self, id: u64) -> bool {
        self.actions().remove(&id);
        self.queue().remove(id)
    }

    fn queue(&self) -> MutexGuard<'_, ToastQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn actions(&self) -> MutexGuard<'_, HashMap<u64, CancelAction>> {
        self.cancel_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for ToastCenter {
    fn progress(&self, message: &str, initial_percent: f64, on_cancel: CancelAction) -> u64 {
        let id = self.queue().progress(message, initial_percent);
        self.actions().insert(id, on_cancel);
        id
    }

    fn update(&self, id: u64, update: ProgressUpdate) {
        self.queue().update(id, update.message, update.progress);
    }

    fn dismiss(&self, id: u64) {
        self.remove(id);
    }

    fn success(&self, message: &str) {
        self.queue().success(message);
    }

    fn error(&self, message: &str) {
        self.queue().error(message);
    }

    fn info(&self, message: &str) {
        self.queue().info(message);
    }
}
