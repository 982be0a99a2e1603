// src/progress.rs
//
// Progress reporting for bulk operations. The engine only pushes counts
// into a reporter; it never reads them back.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sink for progress notifications, owned by the caller.
///
/// `start` is called once per operation with the number of work units, or 0
/// when the total is not known up front (listing-driven operations). `add`
/// is called from worker tasks as units complete.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64);
    fn add(&self, n: u64);
    fn finish(&self);
}

/// Terminal progress bar in the warp-style format used by the CLI.
pub struct BarProgress {
    operation: String,
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            bar: ProgressBar::hidden(),
        }
    }

    fn bar_style(&self) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{}: {{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} objects ({{per_sec}}, ETA: {{eta}})",
                self.operation
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
    }

    fn spinner_style(&self) -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template(&format!("{}: {{spinner:.green}} [{{elapsed_precise}}] {{pos}} objects ({{per_sec}})", self.operation))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: u64) {
        if total > 0 {
            self.bar.set_length(total);
            self.bar.set_style(self.bar_style());
        } else {
            self.bar.set_style(self.spinner_style());
            self.bar.enable_steady_tick(Duration::from_millis(100));
        }
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn add(&self, n: u64) {
        self.bar.inc(n);
    }

    fn finish(&self) {
        self.bar.finish_with_message(format!("{} complete", self.operation));
    }
}

/// Counting reporter, useful for tests and for callers that poll.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    completed: AtomicU64,
    starts: AtomicU64,
    finished: AtomicU64,
}

impl CountingProgress {
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn start_calls(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed) > 0
    }
}

impl ProgressReporter for CountingProgress {
    fn start(&self, total: u64) {
        self.starts.fetch_add(1, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn add(&self, n: u64) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}
