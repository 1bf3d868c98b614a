/// Default toast display duration in milliseconds.
const DEFAULT_DURATION_MS: u64 = 4000;

/// Error toast display duration in milliseconds (longer for visibility).
const ERROR_DURATION_MS: u64 = 6000;

/// The visual category of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    Success,
    Error,
    Info,
    /// Long-running operation with a progress bar and a cancel action.
    Progress,
}

/// A toast notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub toast_type: ToastType,
    pub message: String,
    /// Percentage shown by progress toasts, 0–100.
    pub progress: Option<f64>,
    /// Display duration; 0 means the toast stays until dismissed.
    pub duration_ms: u64,
}

/// In-memory toast queue with monotonic ID assignment.
///
/// Timer-based auto-dismissal is a UI concern. This struct just holds the
/// queue and exposes add/update/remove.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self {
            toasts: Vec::new(),
            next_id: 0,
        }
    }

    /// Pushes a toast and returns its ID.
    pub fn push(
        &mut self,
        toast_type: ToastType,
        message: impl Into<String>,
        progress: Option<f64>,
        duration_ms: u64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            toast_type,
            message: message.into(),
            progress: progress.map(clamp_percent),
            duration_ms,
        });
        id
    }

    /// Pushes a success toast with default duration (4s).
    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastType::Success, message, None, DEFAULT_DURATION_MS)
    }

    /// Pushes an error toast with extended duration (6s).
    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastType::Error, message, None, ERROR_DURATION_MS)
    }

    /// Pushes an info toast with default duration (4s).
    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastType::Info, message, None, DEFAULT_DURATION_MS)
    }

    /// Pushes a sticky progress toast.
    pub fn progress(&mut self, message: impl Into<String>, percent: f64) -> u64 {
        self.push(ToastType::Progress, message, Some(percent), 0)
    }

    /// Changes the message and/or percentage of a toast.
    ///
    /// Returns `false` if the toast no longer exists.
    pub fn update(&mut self, id: u64, message: Option<String>, progress: Option<f64>) -> bool {
        let Some(toast) = self.toasts.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Some(message) = message {
            toast.message = message;
        }
        if let Some(progress) = progress {
            toast.progress = Some(clamp_percent(progress));
        }
        true
    }

    /// Removes a toast by ID. Returns `true` if found and removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let len_before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != len_before
    }

    pub fn get(&self, id: u64) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id == id)
    }

    /// Iterates over toasts in insertion order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_percent(percent: f64) -> f64 {
    percent.clamp(0.0, 100.0)
}
