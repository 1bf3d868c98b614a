//! Terminal [`Notifier`] drawing progress with indicatif.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use seeker_notify::{CancelAction, Notifier, ProgressUpdate};

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Progress bars on stderr, summaries on stdout.
#[derive(Default)]
pub struct TerminalNotifier {
    next_id: AtomicU64,
    bars: Mutex<HashMap<u64, ProgressBar>>,
    cancel_actions: Mutex<HashMap<u64, CancelAction>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the cancel action of every open progress bar.
    ///
    /// Returns how many actions ran.
    pub fn cancel_all(&self) -> usize {
        let actions = self.actions();
        for action in actions.values() {
            action();
        }
        actions.len()
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<u64, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn actions(&self) -> MutexGuard<'_, HashMap<u64, CancelAction>> {
        self.cancel_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

impl Notifier for TerminalNotifier {
    fn progress(&self, message: &str, initial_percent: f64, on_cancel: CancelAction) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(message.to_string());
        bar.set_position(to_position(initial_percent));

        self.bars().insert(id, bar);
        self.actions().insert(id, on_cancel);
        id
    }

    fn update(&self, id: u64, update: ProgressUpdate) {
        let bars = self.bars();
        let Some(bar) = bars.get(&id) else {
            return;
        };
        if let Some(message) = update.message {
            bar.set_message(message);
        }
        if let Some(percent) = update.progress {
            bar.set_position(to_position(percent));
        }
    }

    fn dismiss(&self, id: u64) {
        self.actions().remove(&id);
        if let Some(bar) = self.bars().remove(&id) {
            bar.finish_and_clear();
        }
    }

    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }
}
