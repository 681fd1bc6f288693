//! Background tasks that move queued writes into the [Store].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{Store, StoreEvent};
use crate::config;
use crate::elevator_logic::timer::SharedClock;
use crate::print;

/// How often and how patiently a failed store write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap on the delay between retries
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: config::PERSIST_MAX_ATTEMPTS,
            base_delay: config::PERSIST_RETRY_BASE,
            max_delay: config::PERSIST_RETRY_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

/// Counters reported by [run_persistence_worker] when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Writes that reached the store
    pub applied: u64,
    /// Writes given up after the last attempt
    pub dropped: u64,
    /// Retries made in total
    pub retries: u64,
}

/// Applies one write, retrying with backoff. Returns the number of retries on success, or the
/// last error once `policy.max_attempts` is used up.
pub async fn apply_with_retry(
    store: &dyn Store,
    event: &StoreEvent,
    clock: &SharedClock,
    policy: &RetryPolicy,
) -> Result<u32, (u32, anyhow::Error)> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match store.apply(event.clone()).await {
            Ok(()) => return Ok(attempt - 1),
            Err(e) if attempt >= policy.max_attempts.max(1) => return Err((attempt - 1, e)),
            Err(e) => {
                print::warn(format!(
                    "Store write ({}) failed on attempt {}: {}",
                    event.label(),
                    attempt,
                    e
                ));
                clock.sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}

/// Drains the outbound queue into `store` until every [super::Persister] is dropped.
pub async fn run_persistence_worker(
    store: Arc<dyn Store>,
    mut rx: mpsc::Receiver<StoreEvent>,
    clock: SharedClock,
    policy: RetryPolicy,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(event) = rx.recv().await {
        match apply_with_retry(store.as_ref(), &event, &clock, &policy).await {
            Ok(retries) => {
                stats.applied += 1;
                stats.retries += retries as u64;
            }
            Err((retries, e)) => {
                stats.dropped += 1;
                stats.retries += retries as u64;
                print::err(format!("Giving up {} write: {}", event.label(), e));
            }
        }
    }
    print::info(format!(
        "Store worker stopped: {} applied, {} dropped, {} retries",
        stats.applied, stats.dropped, stats.retries
    ));
    stats
}

/// Runs [Store::sweep_served] every `interval`, forever.
pub async fn run_sweeper(store: Arc<dyn Store>, clock: SharedClock, interval: Duration) {
    loop {
        clock.sleep(interval).await;
        match store.sweep_served().await {
            Ok(0) => {}
            Ok(n) => print::info(format!("Sweep marked {} request(s) served", n)),
            Err(e) => print::warn(format!("Sweep failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevator_logic::timer::TokioClock;
    use crate::model::{ElevatorId, RequestStatus};
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::Persister;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` cancel calls, then forwards to a [MemoryStore].
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self { inner: MemoryStore::new(), failures: AtomicU32::new(failures) }
        }
    }

    impl Store for FlakyStore {
        fn upsert_elevator(&self, s: crate::model::ElevatorStatus) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.upsert_elevator(s)
        }
        fn append_status_history(&self, h: super::super::StatusHistoryEntry) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.append_status_history(h)
        }
        fn append_event(&self, e: crate::model::ElevatorEvent) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.append_event(e)
        }
        fn upsert_passenger(&self, p: crate::model::Passenger) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.upsert_passenger(p)
        }
        fn upsert_request(&self, r: crate::model::Request) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.upsert_request(r)
        }
        fn set_passenger_status(
            &self,
            id: crate::model::PassengerId,
            status: crate::model::PassengerStatus,
            elevator_id: Option<ElevatorId>,
        ) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.set_passenger_status(id, status, elevator_id)
        }
        fn set_request_status(&self, id: crate::model::RequestId, status: RequestStatus) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.set_request_status(id, status)
        }
        fn mark_destination_completed(&self, m: super::super::DestinationMarker) -> BoxFuture<'_, anyhow::Result<()>> {
            self.inner.mark_destination_completed(m)
        }
        fn cancel_pending(&self, elevator_id: ElevatorId) -> BoxFuture<'_, anyhow::Result<usize>> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return async { Err(anyhow::anyhow!("store unavailable")) }.boxed();
            }
            self.inner.cancel_pending(elevator_id)
        }
        fn sweep_served(&self) -> BoxFuture<'_, anyhow::Result<usize>> {
            self.inner.sweep_served()
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn worker_retries_then_applies() {
        let store: Arc<dyn Store> = Arc::new(FlakyStore::new(2));
        let (persister, rx) = Persister::channel(8);
        persister.record(StoreEvent::CancelPending { elevator_id: 1 });
        drop(persister);

        let stats = run_persistence_worker(store, rx, TokioClock::shared(), RetryPolicy::default()).await;
        assert_eq!(stats, WorkerStats { applied: 1, dropped: 0, retries: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn worker_gives_up_after_max_attempts() {
        let store: Arc<dyn Store> = Arc::new(FlakyStore::new(100));
        let (persister, rx) = Persister::channel(8);
        persister.record(StoreEvent::CancelPending { elevator_id: 1 });
        persister.record(StoreEvent::RequestStatus { request_id: 9, status: RequestStatus::Served });
        drop(persister);

        let policy = RetryPolicy { max_attempts: 3, ..RetryPolicy::default() };
        let stats = run_persistence_worker(store, rx, TokioClock::shared(), policy).await;
        assert_eq!(stats, WorkerStats { applied: 1, dropped: 1, retries: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_its_interval() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_request(crate::model::Request {
                id: 1,
                elevator_id: 1,
                pickup_floor: 0,
                destination_floor: 2,
                passenger_count: 1,
                status: RequestStatus::Assigned,
                requested_at_ms: 0,
            })
            .await
            .unwrap();
        store
            .upsert_passenger(crate::model::Passenger {
                id: 2,
                request_id: 1,
                pickup_floor: 0,
                destination_floor: 2,
                count: 1,
                status: crate::model::PassengerStatus::Completed,
                elevator_id: Some(1),
                requested_at_ms: 0,
            })
            .await
            .unwrap();

        let sweeper = tokio::spawn(run_sweeper(store.clone(), TokioClock::shared(), Duration::from_secs(10)));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.request(1).await.unwrap().status, RequestStatus::Assigned);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.request(1).await.unwrap().status, RequestStatus::Served);
        sweeper.abort();
    }
}
