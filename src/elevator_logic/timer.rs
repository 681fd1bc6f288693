//! Time source for the simulation.
//!
//! Every delay in the state machine (floor travel, doors, boarding, settle) and every
//! timestamp goes through a [Clock]. [TokioClock] runs on `tokio::time`, so tests driven by
//! a paused runtime (`#[tokio::test(start_paused = true)]`) advance in virtual time and
//! never wait for real.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Timer interface used by the dispatch loop.
pub trait Clock: std::fmt::Debug + Send + Sync + 'static {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends the caller for `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// [Clock::now] in whole milliseconds.
    fn now_ms(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by `tokio::time`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    start_time: tokio::time::Instant,
}

impl TokioClock {
    /// A clock starting at zero now.
    pub fn new() -> Self {
        Self { start_time: tokio::time::Instant::now() }
    }

    /// Same as [TokioClock::new], boxed into a [SharedClock].
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        tokio::time::Instant::now() - self.start_time
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
