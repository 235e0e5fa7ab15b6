//! Progress indicators for CLI mode
//!
//! This module provides progress display using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress tracker for benchmark iterations
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a tracker over `total` timed invocations.
    ///
    /// When `visible` is false (JSON output, non-terminal stderr) the bar is
    /// hidden so nothing leaks into machine-readable output.
    pub fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total);
        let template = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(template);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the algorithm currently being measured
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Count one finished invocation
    pub fn advance(&self) {
        self.bar.inc(1);
    }

    /// Skip the remaining invocations of an algorithm that will not run
    pub fn skip(&self, count: u64) {
        self.bar.inc(count);
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Create a simple spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(template);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
