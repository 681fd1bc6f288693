//! # Persistence
//!
//! The simulation never waits on storage. Every write is turned into a [StoreEvent] and
//! pushed on a bounded queue through a [Persister]; a separate worker
//! ([worker::run_persistence_worker]) drains the queue into a [Store] and retries failed
//! writes with backoff. If the queue is full or the worker is gone the write is dropped with
//! a warning, and the in-memory state stays authoritative.
//!
//! All store operations are idempotent upserts or monotonic status transitions, so a repeated
//! or lost write can only make the store stale, never inconsistent.

pub mod memory;
pub mod worker;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::model::{
    Direction, ElevatorBehaviour, ElevatorEvent, ElevatorId, ElevatorStatus, Passenger, PassengerId,
    PassengerStatus, Request, RequestId, RequestStatus, StopId,
};
use crate::print;

/// One row of an elevator's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    #[allow(missing_docs)]
    pub elevator_id: ElevatorId,
    /// Per-elevator sequence number, shared with the event stream
    pub seq: u64,
    #[allow(missing_docs)]
    pub at_ms: u64,
    #[allow(missing_docs)]
    pub floor: i32,
    #[allow(missing_docs)]
    pub direction: Direction,
    #[allow(missing_docs)]
    pub behaviour: ElevatorBehaviour,
}

/// Marks that a drop-off stop was served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationMarker {
    #[allow(missing_docs)]
    pub elevator_id: ElevatorId,
    /// The drop-off stop that was visited
    pub stop_id: StopId,
    #[allow(missing_docs)]
    pub floor: i32,
    #[allow(missing_docs)]
    pub request_id: Option<RequestId>,
    #[allow(missing_docs)]
    pub at_ms: u64,
}

/// A write bound for the store.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    ElevatorSnapshot(ElevatorStatus),
    StatusHistory(StatusHistoryEntry),
    Event(ElevatorEvent),
    PassengerUpsert(Passenger),
    RequestUpsert(Request),
    PassengerStatus {
        passenger_id: PassengerId,
        status: PassengerStatus,
        elevator_id: Option<ElevatorId>,
    },
    RequestStatus {
        request_id: RequestId,
        status: RequestStatus,
    },
    DestinationCompleted(DestinationMarker),
    CancelPending {
        elevator_id: ElevatorId,
    },
}

impl StoreEvent {
    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            StoreEvent::ElevatorSnapshot(_) => "elevator snapshot",
            StoreEvent::StatusHistory(_) => "status history",
            StoreEvent::Event(_) => "event",
            StoreEvent::PassengerUpsert(_) => "passenger upsert",
            StoreEvent::RequestUpsert(_) => "request upsert",
            StoreEvent::PassengerStatus { .. } => "passenger status",
            StoreEvent::RequestStatus { .. } => "request status",
            StoreEvent::DestinationCompleted(_) => "destination marker",
            StoreEvent::CancelPending { .. } => "cancel pending",
        }
    }
}

/// The durable store the core writes to. Implementations must make every operation
/// idempotent: applying the same write twice leaves the same state as applying it once.
pub trait Store: Send + Sync + 'static {
    /// Inserts or replaces the snapshot of an elevator.
    fn upsert_elevator(&self, snapshot: ElevatorStatus) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Appends a status-history row.
    fn append_status_history(&self, entry: StatusHistoryEntry) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Appends an elevator event.
    fn append_event(&self, event: ElevatorEvent) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Inserts a passenger, or moves an existing one forward to the given status.
    fn upsert_passenger(&self, passenger: Passenger) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Inserts a request, or moves an existing one forward to the given status.
    fn upsert_request(&self, request: Request) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Moves a passenger to `status` if that is a forward transition.
    fn set_passenger_status(
        &self,
        passenger_id: PassengerId,
        status: PassengerStatus,
        elevator_id: Option<ElevatorId>,
    ) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Moves a request to `status` if that is a forward transition.
    fn set_request_status(&self, request_id: RequestId, status: RequestStatus) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Records that a drop-off stop was served.
    fn mark_destination_completed(&self, marker: DestinationMarker) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Cancels every open request of an elevator and its active passengers.
    /// Returns the number of requests cancelled.
    fn cancel_pending(&self, elevator_id: ElevatorId) -> BoxFuture<'_, anyhow::Result<usize>>;

    /// Marks as served every open request whose stored passengers are all completed.
    /// Returns the number of requests reconciled.
    fn sweep_served(&self) -> BoxFuture<'_, anyhow::Result<usize>>;

    /// Routes a [StoreEvent] to the matching operation.
    fn apply(&self, event: StoreEvent) -> BoxFuture<'_, anyhow::Result<()>> {
        match event {
            StoreEvent::ElevatorSnapshot(s) => self.upsert_elevator(s),
            StoreEvent::StatusHistory(h) => self.append_status_history(h),
            StoreEvent::Event(e) => self.append_event(e),
            StoreEvent::PassengerUpsert(p) => self.upsert_passenger(p),
            StoreEvent::RequestUpsert(r) => self.upsert_request(r),
            StoreEvent::PassengerStatus { passenger_id, status, elevator_id } => {
                self.set_passenger_status(passenger_id, status, elevator_id)
            }
            StoreEvent::RequestStatus { request_id, status } => self.set_request_status(request_id, status),
            StoreEvent::DestinationCompleted(m) => self.mark_destination_completed(m),
            StoreEvent::CancelPending { elevator_id } => {
                let fut = self.cancel_pending(elevator_id);
                Box::pin(async move { fut.await.map(|_| ()) })
            }
        }
    }
}

/// Sending half of the outbound store queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Persister {
    tx: Option<mpsc::Sender<StoreEvent>>,
}

impl Persister {
    /// Creates a queue holding at most `capacity` pending writes.
    pub fn channel(capacity: usize) -> (Persister, mpsc::Receiver<StoreEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Persister { tx: Some(tx) }, rx)
    }

    /// A persister that silently discards every write.
    pub fn disabled() -> Persister {
        Persister { tx: None }
    }

    /// Enqueues a write without waiting. Drops it with a warning if the queue is full or closed.
    pub fn record(&self, event: StoreEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(ev)) => {
                print::warn(format!("Store queue full, dropping {} write", ev.label()));
            }
            Err(mpsc::error::TrySendError::Closed(ev)) => {
                print::warn(format!("Store worker gone, dropping {} write", ev.label()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancel(id: ElevatorId) -> StoreEvent {
        StoreEvent::CancelPending { elevator_id: id }
    }

    #[tokio::test]
    async fn record_enqueues_in_order() {
        let (persister, mut rx) = Persister::channel(4);
        persister.record(cancel(1));
        persister.record(cancel(2));
        assert_eq!(rx.recv().await, Some(cancel(1)));
        assert_eq!(rx.recv().await, Some(cancel(2)));
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (persister, mut rx) = Persister::channel(1);
        persister.record(cancel(1));
        persister.record(cancel(2));
        drop(persister);
        assert_eq!(rx.recv().await, Some(cancel(1)));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn closed_or_disabled_queue_is_harmless() {
        let (persister, rx) = Persister::channel(1);
        drop(rx);
        persister.record(cancel(1));
        Persister::disabled().record(cancel(1));
    }
}
