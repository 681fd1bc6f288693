//! In-process [Store] used by the binary and the tests.
//!
//! Elevator snapshots are kept as `bincode` blobs, the way a real store would hold an opaque
//! row; everything else is kept as typed records.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;

use super::{DestinationMarker, StatusHistoryEntry, Store};
use crate::model::serial;
use crate::model::{
    ElevatorEvent, ElevatorId, ElevatorStatus, Passenger, PassengerId, PassengerStatus, Request, RequestId,
    RequestStatus, StopId,
};

#[derive(Debug, Default)]
struct Tables {
    elevators: HashMap<ElevatorId, Vec<u8>>,
    status_history: Vec<StatusHistoryEntry>,
    events: Vec<ElevatorEvent>,
    // (elevator, seq) pairs already appended
    seen_history: HashSet<(ElevatorId, u64)>,
    seen_events: HashSet<(ElevatorId, u64)>,
    passengers: HashMap<PassengerId, Passenger>,
    requests: HashMap<RequestId, Request>,
    destinations: HashMap<StopId, DestinationMarker>,
}

impl Tables {
    fn move_passenger(&mut self, id: PassengerId, status: PassengerStatus, elevator_id: Option<ElevatorId>) {
        if let Some(p) = self.passengers.get_mut(&id) {
            if p.status.can_become(status) {
                p.status = status;
                if elevator_id.is_some() {
                    p.elevator_id = elevator_id;
                }
            }
        }
    }

    fn move_request(&mut self, id: RequestId, status: RequestStatus) {
        if let Some(r) = self.requests.get_mut(&id) {
            if r.status.can_become(status) {
                r.status = status;
            }
        }
    }
}

/// A [Store] living in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded snapshot of an elevator, if one was written.
    pub async fn elevator_snapshot(&self, id: ElevatorId) -> Option<ElevatorStatus> {
        let tables = self.tables.lock().await;
        tables.elevators.get(&id).and_then(|blob| serial::deserialize_status(blob))
    }

    /// Stored passenger record.
    pub async fn passenger(&self, id: PassengerId) -> Option<Passenger> {
        self.tables.lock().await.passengers.get(&id).cloned()
    }

    /// Stored request record.
    pub async fn request(&self, id: RequestId) -> Option<Request> {
        self.tables.lock().await.requests.get(&id).cloned()
    }

    /// All stored requests, ordered by id.
    pub async fn requests(&self) -> Vec<Request> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<Request> = tables.requests.values().cloned().collect();
        requests.sort_by_key(|r| r.id);
        requests
    }

    /// All stored passengers, ordered by id.
    pub async fn passengers(&self) -> Vec<Passenger> {
        let tables = self.tables.lock().await;
        let mut passengers: Vec<Passenger> = tables.passengers.values().cloned().collect();
        passengers.sort_by_key(|p| p.id);
        passengers
    }

    /// Appended events, oldest first.
    pub async fn events(&self) -> Vec<ElevatorEvent> {
        self.tables.lock().await.events.clone()
    }

    /// Appended status history, oldest first.
    pub async fn status_history(&self) -> Vec<StatusHistoryEntry> {
        self.tables.lock().await.status_history.clone()
    }

    /// Destination markers, ordered by stop id.
    pub async fn destinations(&self) -> Vec<DestinationMarker> {
        let tables = self.tables.lock().await;
        let mut markers: Vec<DestinationMarker> = tables.destinations.values().cloned().collect();
        markers.sort_by_key(|m| m.stop_id);
        markers
    }
}

impl Store for MemoryStore {
    fn upsert_elevator(&self, snapshot: ElevatorStatus) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            let blob = serial::serialize_status(&snapshot)
                .ok_or_else(|| anyhow::anyhow!("could not encode snapshot of elevator {}", snapshot.id))?;
            self.tables.lock().await.elevators.insert(snapshot.id, blob);
            Ok(())
        }
        .boxed()
    }

    fn append_status_history(&self, entry: StatusHistoryEntry) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            // A retried append must not show up twice
            if tables.seen_history.insert((entry.elevator_id, entry.seq)) {
                tables.status_history.push(entry);
            }
            Ok(())
        }
        .boxed()
    }

    fn append_event(&self, event: ElevatorEvent) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if tables.seen_events.insert((event.elevator_id, event.seq)) {
                tables.events.push(event);
            }
            Ok(())
        }
        .boxed()
    }

    fn upsert_passenger(&self, passenger: Passenger) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if tables.passengers.contains_key(&passenger.id) {
                tables.move_passenger(passenger.id, passenger.status, passenger.elevator_id);
            } else {
                tables.passengers.insert(passenger.id, passenger);
            }
            Ok(())
        }
        .boxed()
    }

    fn upsert_request(&self, request: Request) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if tables.requests.contains_key(&request.id) {
                tables.move_request(request.id, request.status);
            } else {
                tables.requests.insert(request.id, request);
            }
            Ok(())
        }
        .boxed()
    }

    fn set_passenger_status(
        &self,
        passenger_id: PassengerId,
        status: PassengerStatus,
        elevator_id: Option<ElevatorId>,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            self.tables.lock().await.move_passenger(passenger_id, status, elevator_id);
            Ok(())
        }
        .boxed()
    }

    fn set_request_status(&self, request_id: RequestId, status: RequestStatus) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            self.tables.lock().await.move_request(request_id, status);
            Ok(())
        }
        .boxed()
    }

    fn mark_destination_completed(&self, marker: DestinationMarker) -> BoxFuture<'_, anyhow::Result<()>> {
        async move {
            self.tables.lock().await.destinations.entry(marker.stop_id).or_insert(marker);
            Ok(())
        }
        .boxed()
    }

    fn cancel_pending(&self, elevator_id: ElevatorId) -> BoxFuture<'_, anyhow::Result<usize>> {
        async move {
            let mut tables = self.tables.lock().await;
            let open: Vec<RequestId> = tables
                .requests
                .values()
                .filter(|r| r.elevator_id == elevator_id && r.status.is_open())
                .map(|r| r.id)
                .collect();

            for id in &open {
                tables.move_request(*id, RequestStatus::Cancelled);
            }
            let riders: Vec<PassengerId> = tables
                .passengers
                .values()
                .filter(|p| open.contains(&p.request_id) && p.status.is_active())
                .map(|p| p.id)
                .collect();
            for id in riders {
                tables.move_passenger(id, PassengerStatus::Cancelled, None);
            }
            Ok(open.len())
        }
        .boxed()
    }

    fn sweep_served(&self) -> BoxFuture<'_, anyhow::Result<usize>> {
        async move {
            let mut tables = self.tables.lock().await;
            let done: Vec<RequestId> = tables
                .requests
                .values()
                .filter(|r| r.status.is_open())
                .filter(|r| {
                    let mut riders = tables.passengers.values().filter(|p| p.request_id == r.id).peekable();
                    riders.peek().is_some() && riders.all(|p| p.status == PassengerStatus::Completed)
                })
                .map(|r| r.id)
                .collect();

            for id in &done {
                tables.move_request(*id, RequestStatus::Served);
            }
            Ok(done.len())
        }
        .boxed()
    }
}
