//! Terminal progress rendering for archive extraction.
//!
//! [`ExtractionProgressBar`] implements [`ProgressReporter`] on top of an
//! `indicatif` bar. It switches between a file counter and a spinner
//! depending on whether the number of entries is known.

use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;
use unbox_archive::{ExtractionProgress, ProgressReporter};

/// Renders extraction ticks as a progress bar.
pub struct ExtractionProgressBar {
    bar: ProgressBar,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    ticks: u64,
    last: Option<ExtractionProgress>,
}

impl ExtractionProgressBar {
    /// A bar drawing to stderr, prefixed with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_bar(ProgressBar::new(0), label)
    }

    /// A bar that renders nothing, for quiet or non-interactive output.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()), "")
    }

    fn with_bar(bar: ProgressBar, label: impl Into<String>) -> Self {
        bar.set_prefix(label.into());
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            state: Mutex::new(State::default()),
        }
    }

    /// Number of ticks received so far.
    pub fn ticks(&self) -> u64 {
        self.state.lock().ticks
    }

    /// The most recent tick.
    pub fn last_progress(&self) -> Option<ExtractionProgress> {
        self.state.lock().last.clone()
    }

    /// Clears the bar, e.g. after a failure.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressReporter for ExtractionProgressBar {
    fn on_start(&self, total_files: u64, _total_bytes: u64) {
        if total_files > 0 {
            self.bar.set_length(total_files);
            self.bar.set_style(bar_style());
        }
    }

    fn on_progress(&self, progress: ExtractionProgress) {
        let mut state = self.state.lock();
        state.ticks += 1;

        if progress.total_files() > 0 {
            self.bar.set_length(progress.total_files());
        }
        self.bar.set_position(progress.files_processed());
        self.bar.set_message(describe(&progress));
        state.last = Some(progress);
    }

    fn on_finish(&self, message: &str) {
        let state = self.state.lock();
        let written = state
            .last
            .as_ref()
            .map(ExtractionProgress::bytes_processed)
            .filter(|bytes| *bytes > 0);
        let message = match written {
            Some(bytes) => format!("{message} ({})", format_size(bytes, DECIMAL)),
            None => message.to_string(),
        };
        self.bar.finish_with_message(message);
    }
}

/// The message shown next to the bar for a tick.
pub fn describe(progress: &ExtractionProgress) -> String {
    let file = progress.current_file();
    if progress.total_bytes() > 0 {
        format!(
            "{} / {} {file}",
            format_size(progress.bytes_processed(), DECIMAL),
            format_size(progress.total_bytes(), DECIMAL)
        )
    } else {
        file.to_string()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold.dim} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos:>5}/{len:5} {wide_msg}",
    )
    .expect("the template is valid")
    .progress_chars("#>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {wide_msg}")
        .expect("the template is valid")
}
