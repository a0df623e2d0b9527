//! Time sources for trackers.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic + wall clock pair.
pub trait Clock: Send + Sync {
    /// Monotonic reading in nanoseconds. Only differences are meaningful.
    fn monotonic_ns(&self) -> u64;
    /// Wall clock as nanoseconds since the Unix epoch.
    fn wall_ns(&self) -> i64;
}

/// Process clock backed by `Instant` and `SystemTime`.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn monotonic_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn wall_ns(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_nanos()).ok())
            .unwrap_or_default()
    }
}

/// Replays a fixed list of monotonic readings; the wall clock is frozen.
///
/// Once the list is exhausted the last reading repeats.
#[derive(Debug)]
pub struct ScriptedClock {
    readings: Mutex<(VecDeque<u64>, u64)>,
    wall_ns: i64,
}

impl ScriptedClock {
    pub fn new(readings: impl IntoIterator<Item = u64>, wall_ns: i64) -> Self {
        Self {
            readings: Mutex::new((readings.into_iter().collect(), 0)),
            wall_ns,
        }
    }
}

impl Clock for ScriptedClock {
    fn monotonic_ns(&self) -> u64 {
        let mut guard = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        let (queue, last) = &mut *guard;
        if let Some(next) = queue.pop_front() {
            *last = next;
        }
        *last
    }

    fn wall_ns(&self) -> i64 {
        self.wall_ns
    }
}
