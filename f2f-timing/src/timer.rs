use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock used to schedule dwell transitions.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
}

/// Nanoseconds since construction, backed by `Instant`.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can hold one handle and advance the clock seen by the code under test.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let t = ManualTimer::new();
        let handle = t.clone();
        let start = t.now();
        handle.advance(Duration::from_millis(1500));
        assert_eq!(t.elapsed(start), Duration::from_millis(1500));
        t.advance(Duration::from_millis(500));
        assert_eq!(handle.now(), 2_000_000_000);
    }

    #[test]
    fn high_precision_clones_share_their_origin() {
        let t = HighPrecisionTimer::new();
        let later = t.clone();
        let stamp = t.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(later.elapsed(stamp) >= Duration::from_millis(5));
        assert!(later.now() >= stamp);
    }
}
