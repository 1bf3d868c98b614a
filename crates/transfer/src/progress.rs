use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Callback invoked with the recomputed batch percentage (0–100).
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

// ---------------------------------------------------------------------------
// GlobalProgress
// ---------------------------------------------------------------------------

/// Byte counter for one upload batch.
///
/// Shared by every concurrently running chunk transfer. The counter only
/// ever moves by deltas ([`add`](Self::add)); there is no absolute setter,
/// so interleaved progress from several in-flight chunks stays correct.
/// Callbacks see a non-decreasing percentage even when chunks report
/// from different threads.
pub struct GlobalProgress {
    total: u64,
    uploaded: AtomicU64,
    reported: Mutex<f64>,
    callbacks: RwLock<Vec<ProgressCallback>>,
}

impl GlobalProgress {
    /// Creates a counter for a batch of `total` bytes.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            uploaded: AtomicU64::new(0),
            reported: Mutex::new(0.0),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Registers a progress callback.
    pub fn on_progress(&self, callback: ProgressCallback) {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        callbacks.push(callback);
    }

    /// Adds `bytes` to the counter and notifies callbacks.
    pub fn add(&self, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let uploaded = self.uploaded.fetch_add(bytes, Ordering::AcqRel) + bytes;

        // Held while notifying so callbacks run in order.
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);
        let percent = self.percent_of(uploaded).max(*reported);
        *reported = percent;

        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        for cb in callbacks.iter() {
            cb(percent);
        }
    }

    /// Starts tracking one chunk of `len` bytes.
    pub fn chunk(self: &Arc<Self>, len: u64) -> ChunkProgress {
        ChunkProgress {
            len,
            counted: AtomicU64::new(0),
            global: Arc::clone(self),
        }
    }

    /// Bytes counted so far.
    ///
    /// After a file failure this includes the whole failed file (see
    /// `UploadOrchestrator`), so it is an estimate and may exceed
    /// [`total`](Self::total).
    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current percentage, clamped to 0–100. 0 for an empty batch.
    pub fn percent(&self) -> f64 {
        self.percent_of(self.uploaded())
    }

    fn percent_of(&self, uploaded: u64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (uploaded as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

// ---------------------------------------------------------------------------
// ChunkProgress
// ---------------------------------------------------------------------------

/// Progress of a single chunk request, folded into a [`GlobalProgress`].
///
/// The transport reports the absolute number of bytes sent so far for
/// this chunk; only the positive delta over what was already counted is
/// added to the batch counter. Reports are clamped to the chunk length,
/// and a report lower than an earlier one contributes nothing.
pub struct ChunkProgress {
    len: u64,
    counted: AtomicU64,
    global: Arc<GlobalProgress>,
}

impl ChunkProgress {
    /// Records that `loaded` bytes of this chunk have been sent.
    pub fn observe(&self, loaded: u64) {
        let loaded = loaded.min(self.len);
        let previous = self.counted.fetch_max(loaded, Ordering::AcqRel);
        self.global.add(loaded.saturating_sub(previous));
    }

    /// Marks the chunk as accepted by the server.
    ///
    /// Credits whatever part of the chunk the progress reports did not
    /// cover, so the chunk contributes exactly `len` bytes in total.
    /// Returns the correction that was applied.
    pub fn complete(&self) -> u64 {
        let previous = self.counted.swap(self.len, Ordering::AcqRel);
        let remaining = self.len.saturating_sub(previous);
        self.global.add(remaining);
        remaining
    }

    /// Bytes of this chunk counted so far.
    pub fn counted(&self) -> u64 {
        self.counted.load(Ordering::Acquire)
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
