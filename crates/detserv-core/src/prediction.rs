//! Detected object (validated on construction).

use serde::Serialize;

use crate::error::{DetectError, Result};

/// One detected object.
///
/// Invariants (checked by [`Prediction::new`]):
/// - `0 <= x_min <= x_max`, `0 <= y_min <= y_max`
/// - `label` is non-empty
/// - `0 < confidence < 1`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
    label: String,
    confidence: f64,
}

impl Prediction {
    pub fn new(
        x_min: i64,
        x_max: i64,
        y_min: i64,
        y_max: i64,
        label: impl Into<String>,
        confidence: f64,
    ) -> Result<Self> {
        let label = label.into();

        if !(0 <= x_min && x_min <= x_max) {
            return Err(DetectError::InvalidPrediction(format!(
                "expected 0 <= x_min <= x_max, got x_min={x_min} x_max={x_max}"
            )));
        }
        if !(0 <= y_min && y_min <= y_max) {
            return Err(DetectError::InvalidPrediction(format!(
                "expected 0 <= y_min <= y_max, got y_min={y_min} y_max={y_max}"
            )));
        }
        if label.is_empty() {
            return Err(DetectError::InvalidPrediction("label must not be empty".into()));
        }
        // NaN fails both comparisons.
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(DetectError::InvalidPrediction(format!(
                "expected 0 < confidence < 1, got {confidence}"
            )));
        }

        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
            label,
            confidence,
        })
    }

    pub fn x_min(&self) -> i64 {
        self.x_min
    }
    pub fn x_max(&self) -> i64 {
        self.x_max
    }
    pub fn y_min(&self) -> i64 {
        self.y_min
    }
    pub fn y_max(&self) -> i64 {
        self.y_max
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence as a truncated integer percentage (0..=99).
    pub fn confidence_percent(&self) -> i64 {
        (self.confidence * 100.0) as i64
    }
}
