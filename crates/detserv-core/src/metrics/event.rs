//! Event counter keyed by `(field, tag set)`.

use std::sync::Arc;

use indexmap::IndexMap;

use super::clock::{Clock, SystemClock};
use super::point::{MetricPoint, Tags};
use super::MetricField;
use crate::error::{DetectError, Result};

/// Accumulates integer values per `(field, tags)` and flattens them into
/// one point per key. Keys keep first-seen order.
pub struct EventMetricsTracker<F: MetricField> {
    clock: Arc<dyn Clock>,
    values: IndexMap<(F, Tags), i64>,
}

impl<F: MetricField> Default for EventMetricsTracker<F> {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock::default()))
    }
}

impl<F: MetricField> EventMetricsTracker<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            values: IndexMap::new(),
        }
    }

    /// Set the value for `(field, tags)`, replacing what was there.
    pub fn record(&mut self, field: F, value: i64, tags: Tags) {
        self.values.insert((field, tags), value);
    }

    /// Add `amount` to `(field, tags)`; an absent value counts as zero.
    pub fn increment_by(&mut self, field: F, amount: i64, tags: Tags) {
        let v = self.values.entry((field, tags)).or_insert(0);
        *v = v.saturating_add(amount);
    }

    pub fn increment(&mut self, field: F, tags: Tags) {
        self.increment_by(field, 1, tags);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One point per key, all stamped with the same wall time.
    ///
    /// `extra_tags` are added to every point; a key's own tag wins when both
    /// define the same tag name.
    pub fn finalize(&self, measurement: &str, extra_tags: &Tags) -> Result<Vec<MetricPoint>> {
        if self.values.is_empty() {
            return Err(DetectError::TrackerMisuse("Nothing to finalize".into()));
        }

        let timestamp_ns = self.clock.wall_ns();
        let points = self
            .values
            .iter()
            .map(|((field, tags), value)| {
                MetricPoint::new(measurement, timestamp_ns)
                    .field(field.name(), *value)
                    .merge_tags(tags)
                    .merge_tags(extra_tags)
            })
            .collect();
        Ok(points)
    }
}
