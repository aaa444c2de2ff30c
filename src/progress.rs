use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::core::renderer_events::PreloadProgress;

/// Terminal progress for a preload cycle, with a status line above the bar
#[derive(Debug, Clone)]
pub struct LoadProgress {
    log_line: ProgressBar,
    progress_bar: ProgressBar,
}

impl LoadProgress {
    /// Create new progress tracker with separate status and progress lines
    pub fn new(total_frames: usize) -> Self {
        let multi = MultiProgress::new();

        let log_line = multi.add(ProgressBar::new_spinner());
        log_line.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        log_line.set_message("Loading frames...");

        let progress_bar = multi.add(ProgressBar::new(total_frames as u64));
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        Self {
            log_line,
            progress_bar,
        }
    }

    /// Hidden tracker (no terminal output)
    pub fn hidden() -> Self {
        Self {
            log_line: ProgressBar::hidden(),
            progress_bar: ProgressBar::hidden(),
        }
    }

    /// Apply one progress event
    pub fn update(&self, event: &PreloadProgress) {
        self.progress_bar.set_length(event.total as u64);
        self.progress_bar.set_position(event.loaded as u64);
        self.progress_bar.set_message(format!("{}%", event.percent));
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.log_line.finish_with_message(message.into());
        self.progress_bar.finish();
    }

    /// Stop where it is, leaving the bar short of full
    pub fn abandon(&self, message: impl Into<String>) {
        self.log_line.abandon_with_message(message.into());
        self.progress_bar.abandon();
    }
}
