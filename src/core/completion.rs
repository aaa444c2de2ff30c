//! Completion gate - retires the canvas layer near the end of the sequence
//!
//! Presentation only: frame selection keeps working above the threshold.

use super::scroll::ScrollProgress;

/// Default threshold at which the sequence counts as finished
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionGate {
    threshold: f64,
    complete: bool,
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_THRESHOLD)
    }
}

impl CompletionGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            complete: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pure threshold test
    pub fn gate(&self, progress: ScrollProgress) -> bool {
        progress.value() >= self.threshold
    }

    /// Feed a new progress value. Returns Some(flag) when the flag flips.
    pub fn update(&mut self, progress: ScrollProgress) -> Option<bool> {
        let complete = self.gate(progress);
        if complete == self.complete {
            return None;
        }
        self.complete = complete;
        Some(complete)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
