//! Classified variability regimes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The variability regime a window was classified into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    /// Low variability; conditions are steady.
    Stable,
    /// Moderate variability.
    Variable,
    /// High variability; conditions are erratic.
    Unstable,
    /// Application-defined classification.
    Custom(String),
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Stable => write!(f, "stable"),
            PatternKind::Variable => write!(f, "variable"),
            PatternKind::Unstable => write!(f, "unstable"),
            PatternKind::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// A detected pattern. Read-only after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// The classified regime.
    pub kind: PatternKind,
    /// Mean of the window that produced the classification.
    pub average_value: f64,
    /// Classification confidence in [0, 1].
    pub confidence: f64,
    /// When the pattern was detected.
    pub detected_at: DateTime<Utc>,
    /// Auxiliary scalars (e.g. the stddev that drove the classification).
    pub metadata: BTreeMap<String, f64>,
}

impl Pattern {
    /// Create a pattern stamped with the current time.
    ///
    /// Confidence is clamped to [0, 1].
    pub fn new(kind: PatternKind, average_value: f64, confidence: f64) -> Self {
        Self {
            kind,
            average_value,
            confidence: confidence.clamp(0.0, 1.0),
            detected_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata scalar.
    pub fn with_metadata(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
