//! Terminal progress reporting for CLI runs.

use indicatif::{ProgressBar, ProgressStyle};
use rental_sync_source::progress::ProgressCallback;
use std::time::Duration;

/// Renders import progress as an `indicatif` bar. Phases without a
/// known total (CSV parsing, provenance deletes) show as a spinner.
pub struct ImportProgressBar {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl ImportProgressBar {
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));

        let bar_style = ProgressStyle::with_template(
            "{bar:30.cyan/dim} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        Self { bar, bar_style }
    }

    /// Clears the bar once the import finishes.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ImportProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ImportProgressBar {
    fn report(&self, message: &str, current: u64, total: u64) {
        if total > 0 {
            if self.bar.length().is_none() {
                self.bar.disable_steady_tick();
                self.bar.set_style(self.bar_style.clone());
            }
            self.bar.set_length(total);
            self.bar.set_position(current);
        }
        self.bar.set_message(message.to_string());
    }
}
