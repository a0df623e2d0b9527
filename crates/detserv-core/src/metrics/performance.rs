//! Per-request phase timer keyed by checkpoints.
//!
//! Two ways to time a checkpoint:
//! - scoped: [`PerformanceTracker::open`] returns a guard that records the
//!   stop timestamp when dropped (normal exit, `?`, or unwinding alike);
//! - manual: [`PerformanceTracker::start`] / [`PerformanceTracker::stop`].
//!
//! Mixing the two on one checkpoint is rejected. Open scopes live on a stack,
//! so scopes may nest but a checkpoint can be open only once at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::clock::{Clock, SystemClock};
use super::point::{MetricPoint, Tags};
use super::Checkpoint;
use crate::error::{DetectError, Result};

/// Which form started a checkpoint; the matching stop must use the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Scoped,
    Manual,
}

struct State<C> {
    starts: HashMap<C, u64>,
    stops: HashMap<C, u64>,
    origin: HashMap<C, Form>,
    open: Vec<C>,
}

impl<C: Checkpoint> State<C> {
    /// Started manually and not stopped yet.
    fn manual_pending(&self, checkpoint: &C) -> bool {
        self.origin.get(checkpoint) == Some(&Form::Manual) && !self.stops.contains_key(checkpoint)
    }

    fn begin(&mut self, checkpoint: C, form: Form, now: u64) {
        self.starts.insert(checkpoint, now);
        self.stops.remove(&checkpoint);
        self.origin.insert(checkpoint, form);
    }
}

pub struct PerformanceTracker<C: Checkpoint> {
    clock: Arc<dyn Clock>,
    state: Mutex<State<C>>,
}

impl<C: Checkpoint> Default for PerformanceTracker<C> {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock::default()))
    }
}

impl<C: Checkpoint> PerformanceTracker<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State {
                starts: HashMap::new(),
                stops: HashMap::new(),
                origin: HashMap::new(),
                open: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a scoped checkpoint. The stop is recorded when the guard drops.
    ///
    /// Re-opening a closed checkpoint replaces its previous start/stop pair.
    /// Fails while the checkpoint is open or manually started and not stopped.
    pub fn open(&self, checkpoint: C) -> Result<CheckpointGuard<'_, C>> {
        let mut st = self.lock();
        if st.open.contains(&checkpoint) {
            return Err(DetectError::TrackerMisuse(format!(
                "{} is already being tracked",
                checkpoint.name()
            )));
        }
        if st.manual_pending(&checkpoint) {
            return Err(DetectError::TrackerMisuse(format!(
                "{} is already being tracked without context",
                checkpoint.name()
            )));
        }
        st.open.push(checkpoint);
        let now = self.clock.monotonic_ns();
        st.begin(checkpoint, Form::Scoped, now);
        Ok(CheckpointGuard {
            tracker: self,
            checkpoint,
        })
    }

    pub fn start(&self, checkpoint: C) -> Result<()> {
        let mut st = self.lock();
        if st.open.contains(&checkpoint) {
            return Err(DetectError::TrackerMisuse(format!(
                "{} is already being tracked with context",
                checkpoint.name()
            )));
        }
        if st.manual_pending(&checkpoint) {
            return Err(DetectError::TrackerMisuse(format!(
                "{} is already being tracked",
                checkpoint.name()
            )));
        }
        let now = self.clock.monotonic_ns();
        st.begin(checkpoint, Form::Manual, now);
        Ok(())
    }

    /// Fails for a checkpoint that was started by [`PerformanceTracker::open`].
    pub fn stop(&self, checkpoint: C) -> Result<()> {
        let mut st = self.lock();
        if st.open.contains(&checkpoint) || st.origin.get(&checkpoint) == Some(&Form::Scoped) {
            return Err(DetectError::TrackerMisuse(format!(
                "{} should only be stopped with context",
                checkpoint.name()
            )));
        }
        st.stops.insert(checkpoint, self.clock.monotonic_ns());
        Ok(())
    }

    fn close(&self, checkpoint: C) {
        let mut st = self.lock();
        if let Some(pos) = st.open.iter().rposition(|c| *c == checkpoint) {
            st.open.remove(pos);
        }
        st.stops.insert(checkpoint, self.clock.monotonic_ns());
    }

    /// Number of scoped checkpoints currently open.
    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    /// Flatten into one point with a `<checkpoint>_ns` field per checkpoint.
    pub fn finalize(&self, measurement: &str, tags: &Tags) -> Result<MetricPoint> {
        let st = self.lock();

        if !st.open.is_empty() {
            return Err(DetectError::TrackerMisuse(format!(
                "Cannot finalize before stop tracking {} checkpoints",
                st.open.len()
            )));
        }

        let started: HashSet<&C> = st.starts.keys().collect();
        let stopped: HashSet<&C> = st.stops.keys().collect();
        if started != stopped {
            return Err(DetectError::TrackerMisuse("Start/stop calls do not pair".into()));
        }
        if st.starts.is_empty() {
            return Err(DetectError::TrackerMisuse("Nothing to finalize".into()));
        }

        let mut point = MetricPoint::new(measurement, self.clock.wall_ns()).merge_tags(tags);
        for (checkpoint, start) in &st.starts {
            let stop = st.stops.get(checkpoint).copied().unwrap_or(*start);
            let elapsed = i128::from(stop) - i128::from(*start);
            let elapsed = i64::try_from(elapsed).unwrap_or(i64::MAX);
            point = point.field(format!("{}_ns", checkpoint.name()), elapsed);
        }
        Ok(point)
    }
}

/// Scope handle for an open checkpoint.
#[must_use = "the checkpoint stops as soon as the guard is dropped"]
pub struct CheckpointGuard<'a, C: Checkpoint> {
    tracker: &'a PerformanceTracker<C>,
    checkpoint: C,
}

impl<C: Checkpoint> CheckpointGuard<'_, C> {
    pub fn checkpoint(&self) -> C {
        self.checkpoint
    }
}

impl<C: Checkpoint> Drop for CheckpointGuard<'_, C> {
    fn drop(&mut self) {
        self.tracker.close(self.checkpoint);
    }
}
