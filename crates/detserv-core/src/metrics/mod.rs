//! Request-scoped metric trackers.
//!
//! Trackers are plain per-request values. They produce [`MetricPoint`]s that
//! are handed to whatever sink the caller owns; nothing here does I/O.

pub mod clock;
pub mod event;
pub mod performance;
pub mod point;

use std::hash::Hash;

pub use clock::{Clock, ScriptedClock, SystemClock};
pub use event::EventMetricsTracker;
pub use performance::{CheckpointGuard, PerformanceTracker};
pub use point::{tags, MetricPoint, TagValue, Tags};

/// Closed set of phases timed by a [`PerformanceTracker`].
pub trait Checkpoint: Copy + Eq + Hash + Send + 'static {
    /// Lowercase name; the point field is `<name>_ns`.
    fn name(&self) -> &'static str;
}

/// Closed set of fields counted by an [`EventMetricsTracker`].
pub trait MetricField: Copy + Eq + Hash + Send + 'static {
    /// Lowercase field name used in the point.
    fn name(&self) -> &'static str;
}
