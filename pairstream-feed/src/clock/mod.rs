//! Time sources for pacing feed producers

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Time source used by feed producers to pace emission.
///
/// Production code runs on [`SystemClock`]; tests substitute
/// [`VirtualClock`] so pacing can be asserted without real waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock that advances only when slept on
#[derive(Debug)]
pub struct VirtualClock {
    now: Mutex<Instant>,
    slept: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Durations passed to [`Clock::sleep`], in call order
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.slept.lock().iter().sum()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock() += duration;
        self.slept.lock().push(duration);
    }
}
