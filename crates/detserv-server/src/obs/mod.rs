//! Metric sinks for tracker output.
//!
//! Trackers build points per request; a sink is the one shared, append-only
//! destination. Which sink is used is decided once at startup.

pub mod sink;

pub use sink::{LineProtocolSink, MemorySink, MetricsSink, NullSink};
