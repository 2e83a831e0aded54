//! Variability pattern detection.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use attune_types::{Pattern, PatternKind};

use crate::window::RollingWindow;

/// Thresholds and limits for pattern detection.
///
/// Thresholds are in the metric's native unit (milliseconds for the
/// latency window).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum samples before any pattern is emitted.
    pub min_samples: usize,
    /// Stddev below this classifies as `Stable`.
    pub stable_below: f64,
    /// Stddev below this (and at or above `stable_below`) classifies as
    /// `Variable`; at or above it, `Unstable`.
    pub variable_below: f64,
    /// Confidence is `1 - stddev / confidence_scale`, clamped to [0, 1].
    pub confidence_scale: f64,
    /// Detected patterns retained, oldest evicted.
    pub history_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            stable_below: 5.0,
            variable_below: 15.0,
            confidence_scale: 50.0,
            history_capacity: 100,
        }
    }
}

/// Classifies window variability into confidence-scored patterns.
///
/// `observe` is the only write path into the pattern history.
#[derive(Debug)]
pub struct PatternDetector {
    config: DetectorConfig,
    history: VecDeque<Pattern>,
}

impl PatternDetector {
    /// Create a detector with the given configuration.
    pub fn new(config: DetectorConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_capacity);
        Self { config, history }
    }

    /// Classify the window's current variability.
    ///
    /// Returns `None` (not a low-confidence guess) below the minimum
    /// sample count. A returned pattern has already been appended to the
    /// history.
    pub fn observe(&mut self, window: &RollingWindow) -> Option<Pattern> {
        if window.len() < self.config.min_samples {
            return None;
        }

        let stddev = window.stddev();
        let kind = if stddev < self.config.stable_below {
            PatternKind::Stable
        } else if stddev < self.config.variable_below {
            PatternKind::Variable
        } else {
            PatternKind::Unstable
        };

        let confidence = (1.0 - stddev / self.config.confidence_scale).clamp(0.0, 1.0);
        let pattern = Pattern::new(kind, window.mean(), confidence)
            .with_metadata("stddev", stddev)
            .with_metadata("samples", window.len() as f64);

        debug!(
            kind = %pattern.kind,
            confidence = pattern.confidence,
            stddev = stddev,
            "pattern detected"
        );

        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(pattern.clone());

        Some(pattern)
    }

    /// The most recently detected pattern.
    pub fn latest(&self) -> Option<&Pattern> {
        self.history.back()
    }

    /// The newest `n` patterns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Pattern> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Number of patterns retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_with(values: &[f64]) -> RollingWindow {
        let mut window = RollingWindow::new(values.len().max(1));
        for &v in values {
            window.push(v);
        }
        window
    }

    #[test]
    fn no_pattern_below_minimum_samples() {
        let mut detector = PatternDetector::default();
        let window = window_with(&[10.0; 9]);
        assert!(detector.observe(&window).is_none());
        assert_eq!(detector.history_len(), 0);
    }

    #[test]
    fn low_stddev_classifies_stable() {
        let mut detector = PatternDetector::default();
        // 12 samples alternating 27/33: mean 30, sample stddev ~3.13.
        let values: Vec<f64> = (0..12).map(|i| if i % 2 == 0 { 27.0 } else { 33.0 }).collect();
        let window = window_with(&values);

        let pattern = detector.observe(&window).expect("pattern");
        assert_eq!(pattern.kind, PatternKind::Stable);
        assert_eq!(pattern.average_value, 30.0);
        let stddev = window.stddev();
        assert!((pattern.confidence - (1.0 - stddev / 50.0)).abs() < 1e-12);
    }

    #[test]
    fn stable_confidence_matches_formula() {
        let mut detector = PatternDetector::default();
        // Construct a 12-sample window with stddev exactly 3: alternate
        // mean +/- d where d^2 * 12/11 = 9.
        let d = (9.0f64 * 11.0 / 12.0).sqrt();
        let values: Vec<f64> = (0..12)
            .map(|i| if i % 2 == 0 { 50.0 - d } else { 50.0 + d })
            .collect();
        let window = window_with(&values);
        assert!((window.stddev() - 3.0).abs() < 1e-9);

        let pattern = detector.observe(&window).expect("pattern");
        assert_eq!(pattern.kind, PatternKind::Stable);
        assert!((pattern.confidence - 0.94).abs() < 1e-9);
    }

    #[test]
    fn moderate_stddev_classifies_variable() {
        let mut detector = PatternDetector::default();
        let d: f64 = 8.0;
        let values: Vec<f64> = (0..12)
            .map(|i| if i % 2 == 0 { 50.0 - d } else { 50.0 + d })
            .collect();
        let window = window_with(&values);
        let stddev = window.stddev();
        assert!((5.0..15.0).contains(&stddev));

        let pattern = detector.observe(&window).expect("pattern");
        assert_eq!(pattern.kind, PatternKind::Variable);
    }

    #[test]
    fn high_stddev_classifies_unstable_with_floored_confidence() {
        let mut detector = PatternDetector::default();
        let d: f64 = 60.0;
        let values: Vec<f64> = (0..12)
            .map(|i| if i % 2 == 0 { 100.0 - d } else { 100.0 + d })
            .collect();
        let window = window_with(&values);
        assert!(window.stddev() >= 50.0);

        let pattern = detector.observe(&window).expect("pattern");
        assert_eq!(pattern.kind, PatternKind::Unstable);
        assert_eq!(pattern.confidence, 0.0);
    }

    #[test]
    fn history_is_bounded_and_ordered() {
        let mut detector = PatternDetector::new(DetectorConfig {
            history_capacity: 3,
            ..DetectorConfig::default()
        });
        for i in 0..5 {
            let base = 10.0 * (i + 1) as f64;
            let window = window_with(&vec![base; 10]);
            detector.observe(&window).expect("pattern");
        }
        assert_eq!(detector.history_len(), 3);
        let recent = detector.recent(3);
        assert_eq!(recent[0].average_value, 30.0);
        assert_eq!(recent[2].average_value, 50.0);
        assert_eq!(detector.latest().unwrap().average_value, 50.0);
    }

    #[test]
    fn metadata_carries_stddev_and_sample_count() {
        let mut detector = PatternDetector::default();
        let window = window_with(&[25.0; 10]);
        let pattern = detector.observe(&window).expect("pattern");
        assert_eq!(pattern.metadata.get("stddev"), Some(&0.0));
        assert_eq!(pattern.metadata.get("samples"), Some(&10.0));
    }
}
