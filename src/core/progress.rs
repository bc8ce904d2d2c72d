//! Progress reporting using indicatif.
//!
//! Class reading is the only phase long enough to warrant a bar; everything
//! after it runs on in-memory graphs.

use indicatif::{ProgressBar, ProgressStyle};

/// Standard progress bar style for file processing.
pub fn file_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Check if stderr is a TTY (for deciding whether to show progress bars).
pub fn is_tty() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Create a progress bar, hidden when stderr is not a terminal.
pub fn create_progress(total: usize, message: &str) -> ProgressBar {
    if is_tty() {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(file_progress_style());
        bar.set_message(message.to_string());
        bar
    } else {
        ProgressBar::hidden()
    }
}

/// Adapts a progress bar to the `Fn(current, total)` callback shape used by
/// [`AnalysisContext`](super::AnalysisContext).
pub fn callback(bar: &ProgressBar) -> impl Fn(usize, usize) + '_ {
    move |current, total| {
        bar.set_length(total as u64);
        bar.set_position(current as u64);
    }
}
