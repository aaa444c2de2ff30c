//! Scroll sampler - container scroll position to normalized progress
//!
//! **Why**: The host only knows pixels (document scroll offset, container box,
//! viewport height). Playback needs a single number in [0,1] describing how far
//! the tracked container has travelled between two configured intersections.
//!
//! An intersection pairs a point on the container (`target`, fraction of its
//! height) with a point on the viewport (`viewport`, fraction of its height).
//! "start start" means the container top meets the viewport top; "end end" means
//! the container bottom meets the viewport bottom.
//!
//! Raw progress overshoots during elastic overscroll; `ScrollProgress` is always clamped.

use std::fmt;
use std::str::FromStr;

use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// Normalized scroll progress, always within [0,1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct ScrollProgress(f64);

impl ScrollProgress {
    pub const START: ScrollProgress = ScrollProgress(0.0);
    pub const END: ScrollProgress = ScrollProgress(1.0);

    /// Clamp a raw value into [0,1]. NaN maps to 0.
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            return Self::START;
        }
        Self(raw.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// One host measurement of the tracked container, in document pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Document scroll offset (top of the viewport)
    pub scroll_y: f64,
    /// Container top in document coordinates
    pub container_top: f64,
    pub container_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    fn is_finite(&self) -> bool {
        self.scroll_y.is_finite()
            && self.container_top.is_finite()
            && self.container_height.is_finite()
            && self.viewport_height.is_finite()
    }
}

/// Point where a container edge meets a viewport edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Intersection {
    /// Fraction of the container height (0 = top, 1 = bottom)
    pub target: f64,
    /// Fraction of the viewport height (0 = top, 1 = bottom)
    pub viewport: f64,
}

impl Intersection {
    pub const START_START: Intersection = Intersection::new(0.0, 0.0);
    pub const START_END: Intersection = Intersection::new(0.0, 1.0);
    pub const CENTER_CENTER: Intersection = Intersection::new(0.5, 0.5);
    pub const END_START: Intersection = Intersection::new(1.0, 0.0);
    pub const END_END: Intersection = Intersection::new(1.0, 1.0);

    pub const fn new(target: f64, viewport: f64) -> Self {
        Self { target, viewport }
    }

    /// Document scroll offset at which this intersection happens
    pub fn scroll_position(&self, metrics: &ScrollMetrics) -> f64 {
        metrics.container_top + self.target * metrics.container_height
            - self.viewport * metrics.viewport_height
    }
}

fn parse_edge(word: &str) -> Result<f64, String> {
    match word {
        "start" => Ok(0.0),
        "center" => Ok(0.5),
        "end" => Ok(1.0),
        other => {
            let v: f64 = other.parse().map_err(|_| format!("unknown edge '{}'", other))?;
            if (0.0..=1.0).contains(&v) {
                Ok(v)
            } else {
                Err(format!("edge fraction {} outside [0,1]", v))
            }
        }
    }
}

fn edge_name(v: f64) -> String {
    if v == 0.0 {
        "start".to_string()
    } else if v == 0.5 {
        "center".to_string()
    } else if v == 1.0 {
        "end".to_string()
    } else {
        v.to_string()
    }
}

impl FromStr for Intersection {
    type Err = String;

    /// Parse `"<target> <viewport>"`, each `start|center|end` or a fraction
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let (Some(t), Some(v), None) = (words.next(), words.next(), words.next()) else {
            return Err(format!("expected '<target> <viewport>', got '{}'", s));
        };
        Ok(Self::new(parse_edge(t)?, parse_edge(v)?))
    }
}

impl fmt::Display for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", edge_name(self.target), edge_name(self.viewport))
    }
}

impl TryFrom<String> for Intersection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Intersection> for String {
    fn from(i: Intersection) -> Self {
        i.to_string()
    }
}

/// Tracked scroll range: progress 0 at `start`, 1 at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub start: Intersection,
    pub end: Intersection,
}

impl Default for ScrollOffset {
    /// Container top at viewport top → container bottom at viewport bottom
    fn default() -> Self {
        Self {
            start: Intersection::START_START,
            end: Intersection::END_END,
        }
    }
}

impl ScrollOffset {
    pub const fn new(start: Intersection, end: Intersection) -> Self {
        Self { start, end }
    }

    /// Unclamped progress. May leave [0,1] during overscroll.
    ///
    /// A zero-length range behaves like a step at its position.
    pub fn raw_progress(&self, metrics: &ScrollMetrics) -> f64 {
        let s0 = self.start.scroll_position(metrics);
        let s1 = self.end.scroll_position(metrics);
        let span = s1 - s0;
        if span.abs() < f64::EPSILON {
            return if metrics.scroll_y >= s0 { 1.0 } else { 0.0 };
        }
        (metrics.scroll_y - s0) / span
    }

    /// Scroll offset that yields `progress` for the given container layout.
    ///
    /// `metrics.scroll_y` is ignored. Used to drive the renderer without a real host.
    pub fn scroll_for_progress(&self, progress: ScrollProgress, metrics: &ScrollMetrics) -> f64 {
        let s0 = self.start.scroll_position(metrics);
        let s1 = self.end.scroll_position(metrics);
        s0 + progress.value() * (s1 - s0)
    }
}

/// Stateful sampler: turns host measurements into progress changes.
#[derive(Debug, Clone)]
pub struct ScrollSampler {
    offset: ScrollOffset,
    last: Option<ScrollProgress>,
}

impl ScrollSampler {
    pub fn new(offset: ScrollOffset) -> Self {
        Self { offset, last: None }
    }

    pub fn offset(&self) -> ScrollOffset {
        self.offset
    }

    /// Last sampled progress (START before the first sample)
    pub fn progress(&self) -> ScrollProgress {
        self.last.unwrap_or(ScrollProgress::START)
    }

    /// Sample a measurement. Returns the new progress if it changed.
    ///
    /// Non-finite measurements are dropped.
    pub fn sample(&mut self, metrics: &ScrollMetrics) -> Option<ScrollProgress> {
        if !metrics.is_finite() {
            warn!("ScrollSampler: dropping non-finite measurement {:?}", metrics);
            return None;
        }

        let raw = self.offset.raw_progress(metrics);
        let progress = ScrollProgress::new(raw);
        trace!("ScrollSampler: scroll_y={:.1} raw={:.4} -> {:.4}", metrics.scroll_y, raw, progress.value());

        if self.last == Some(progress) {
            return None;
        }
        self.last = Some(progress);
        Some(progress)
    }

    /// Forget the last sample (next sample always reports)
    pub fn reset(&mut self) {
        self.last = None;
    }
}
