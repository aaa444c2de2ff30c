//! Scroll progress → frame index
//!
//! `index = round(progress * (total - 1))`, clamped to the sequence.
//! Rounding gives the first and last frame half-width scroll bands; interior
//! frames get full bands.

use super::scroll::ScrollProgress;

/// Linear progress-to-frame mapping for a sequence of `total` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMapper {
    total: usize,
}

impl FrameMapper {
    /// `total` of zero is treated as a single frame.
    pub fn new(total: usize) -> Self {
        Self { total: total.max(1) }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn last_index(&self) -> usize {
        self.total - 1
    }

    pub fn map(&self, progress: ScrollProgress) -> usize {
        let last = self.last_index();
        let index = (progress.value() * last as f64).round();
        (index.max(0.0) as usize).min(last)
    }

    /// Clamp an arbitrary index into the sequence
    pub fn clamp(&self, index: usize) -> usize {
        index.min(self.last_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(total: usize, p: f64) -> usize {
        FrameMapper::new(total).map(ScrollProgress::new(p))
    }

    /// Test: Four-frame scroll sequence
    /// Validates: [0, 0.3, 0.6, 1.0] → [0, 1, 2, 3]
    #[test]
    fn test_four_frame_sequence() {
        let frames: Vec<usize> = [0.0, 0.3, 0.6, 1.0].iter().map(|&p| map(4, p)).collect();
        assert_eq!(frames, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(map(120, 0.0), 0);
        assert_eq!(map(120, 1.0), 119);
        assert_eq!(map(1, 0.7), 0);
        assert_eq!(FrameMapper::new(0).total(), 1);
    }

    /// Test: Dense sweep over [0,1]
    /// Validates: Always in range and monotonically non-decreasing
    #[test]
    fn test_range_and_monotonic() {
        let mapper = FrameMapper::new(120);
        let mut prev = 0;
        for step in 0..=10_000 {
            let index = mapper.map(ScrollProgress::new(step as f64 / 10_000.0));
            assert!(index <= 119);
            assert!(index >= prev, "non-monotonic at step {}", step);
            prev = index;
        }
        assert_eq!(prev, 119);
    }

    /// Test: Band widths
    /// Validates: End frames get half the scroll band of interior frames
    #[test]
    fn test_end_bands_are_half_width() {
        let mapper = FrameMapper::new(5);
        let samples = 8_000;
        let mut counts = [0usize; 5];
        for step in 0..samples {
            counts[mapper.map(ScrollProgress::new((step as f64 + 0.5) / samples as f64))] += 1;
        }
        assert_eq!(counts, [1000, 2000, 2000, 2000, 1000]);
    }

    #[test]
    fn test_out_of_range_input_clamped() {
        assert_eq!(map(10, -3.0), 0);
        assert_eq!(map(10, 42.0), 9);
        assert_eq!(FrameMapper::new(10).clamp(500), 9);
    }
}
