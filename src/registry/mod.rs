//! # Elevator registry
//!
//! The root object of the engine. It owns every elevator ([ElevatorHandle]) and is the only
//! way callers reach them: submitting calls, scheduling loose stops, reading status and
//! resetting. Unknown elevator ids are answered with `false` / `None`.
//!
//! ```no_run
//! # async fn demo() {
//! use liftdispatch::config::Timing;
//! use liftdispatch::elevator_logic::timer::TokioClock;
//! use liftdispatch::persistence::Persister;
//! use liftdispatch::registry::ElevatorRegistry;
//!
//! let registry = ElevatorRegistry::with_default_elevator(TokioClock::shared(), Persister::disabled(), Timing::default());
//! assert!(registry.submit_call(1, 0, 5, 2).await);
//! let status = registry.get_status(1).await.unwrap();
//! assert_eq!(status.stops.len(), 2);
//! # }
//! ```

pub mod handle;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

pub use handle::{ElevatorHandle, IdGenerator};

use crate::config::{self, Timing};
use crate::elevator_logic;
use crate::elevator_logic::timer::SharedClock;
use crate::manager;
use crate::model::{
    ElevatorEvent, ElevatorId, ElevatorStatus, EventKind, Passenger, PassengerStatus, PendingRequest, Request,
    RequestStatus, Stop,
};
use crate::persistence::{Persister, StoreEvent};
use crate::print;

/// Owns the elevators.
#[derive(Debug)]
pub struct ElevatorRegistry {
    elevators: RwLock<HashMap<ElevatorId, Arc<ElevatorHandle>>>,
    clock: SharedClock,
    persister: Persister,
    timing: Timing,
    ids: Arc<IdGenerator>,
}

impl ElevatorRegistry {
    /// An empty registry.
    pub fn new(clock: SharedClock, persister: Persister, timing: Timing) -> Self {
        Self {
            elevators: RwLock::new(HashMap::new()),
            clock,
            persister,
            timing,
            ids: Arc::new(IdGenerator::new()),
        }
    }

    /// A registry holding elevator [config::DEFAULT_ELEVATOR_ID] with [config::DEFAULT_MAX_CAPACITY].
    pub fn with_default_elevator(clock: SharedClock, persister: Persister, timing: Timing) -> Self {
        Self::new(clock, persister, timing).with_elevator(config::DEFAULT_ELEVATOR_ID, config::DEFAULT_MAX_CAPACITY)
    }

    /// Adds an elevator while building the registry. An existing elevator with the same id is
    /// replaced. An elevator that cannot hold anyone is left out.
    pub fn with_elevator(mut self, id: ElevatorId, max_capacity: u32) -> Self {
        if max_capacity == 0 {
            print::err(format!("Elevator {} not added: capacity must be at least 1", id));
            return self;
        }
        let handle = self.make_handle(id, max_capacity);
        self.elevators.get_mut().insert(id, handle);
        self
    }

    fn make_handle(&self, id: ElevatorId, max_capacity: u32) -> Arc<ElevatorHandle> {
        Arc::new(ElevatorHandle::new(
            id,
            max_capacity,
            self.clock.clone(),
            self.persister.clone(),
            self.timing,
            self.ids.clone(),
        ))
    }

    /// Adds an elevator. `false` if the id is taken or `max_capacity` is zero.
    pub async fn add_elevator(&self, id: ElevatorId, max_capacity: u32) -> bool {
        if max_capacity == 0 {
            print::err(format!("Elevator {} not added: capacity must be at least 1", id));
            return false;
        }
        let mut map = self.elevators.write().await;
        if map.contains_key(&id) {
            print::warn(format!("Elevator {} already exists", id));
            return false;
        }
        let handle = self.make_handle(id, max_capacity);
        {
            let state = handle.lock().await;
            handle.record_state(&state);
        }
        map.insert(id, handle);
        true
    }

    /// The handle of an elevator.
    pub async fn elevator(&self, id: ElevatorId) -> Option<Arc<ElevatorHandle>> {
        self.elevators.read().await.get(&id).cloned()
    }

    /// Ids of every elevator, ascending.
    pub async fn elevator_ids(&self) -> Vec<ElevatorId> {
        let mut ids: Vec<ElevatorId> = self.elevators.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Accepts a call of `passenger_count` riders from `pickup_floor` to `destination_floor`.
    ///
    /// Creates one request, one waiting passenger per rider and a linked pickup/drop-off pair,
    /// inserts the pair at its cheapest positions and starts dispatching if the elevator was
    /// not already. `false` for an unknown elevator or zero riders.
    pub async fn submit_call(
        &self,
        elevator_id: ElevatorId,
        pickup_floor: i32,
        destination_floor: i32,
        passenger_count: u32,
    ) -> bool {
        if passenger_count == 0 {
            print::warn(format!("Ignoring call with no passengers to elevator {}", elevator_id));
            return false;
        }
        let Some(handle) = self.elevator(elevator_id).await else {
            print::warn(format!("Call for unknown elevator {}", elevator_id));
            return false;
        };

        let now = handle.now_ms();
        let request = Request {
            id: handle.next_id(),
            elevator_id,
            pickup_floor,
            destination_floor,
            passenger_count,
            status: RequestStatus::Pending,
            requested_at_ms: now,
        };
        let riders: Vec<Passenger> = (0..passenger_count)
            .map(|_| Passenger {
                id: handle.next_id(),
                request_id: request.id,
                pickup_floor,
                destination_floor,
                count: 1,
                status: PassengerStatus::Waiting,
                elevator_id: None,
                requested_at_ms: now,
            })
            .collect();
        let (pickup, drop) = Stop::pair(
            (handle.next_id(), handle.next_id()),
            pickup_floor,
            destination_floor,
            passenger_count,
            request.id,
        );

        let started = {
            let mut state = handle.lock().await;
            handle.record(StoreEvent::RequestUpsert(request.clone()));
            for p in &riders {
                handle.record(StoreEvent::PassengerUpsert(p.clone()));
            }
            state.requests.push(request.clone());
            state.passengers.extend(riders);

            manager::schedule_pair(&mut state, pickup, drop);
            handle.publish(
                state.elevator.current_floor,
                EventKind::CallAccepted {
                    request_id: request.id,
                    pickup_floor,
                    destination_floor,
                    passengers: passenger_count,
                },
            );
            handle.record_state(&state);
            handle.try_begin_dispatch(&state).then(|| handle.epoch())
        };

        if let Some(epoch) = started {
            elevator_logic::spawn_dispatch(handle, epoch);
        }
        true
    }

    /// Schedules a single stop not tied to any request. A pickup boards whoever waits at the
    /// floor, a drop-off lets off whoever rides to it.
    pub async fn schedule_stop(&self, elevator_id: ElevatorId, floor: i32, is_dropoff: bool, passenger_count: u32) -> bool {
        let Some(handle) = self.elevator(elevator_id).await else {
            return false;
        };
        let stop = if is_dropoff {
            Stop::dropoff(handle.next_id(), floor, passenger_count)
        } else {
            Stop::pickup(handle.next_id(), floor, passenger_count)
        };

        let started = {
            let mut state = handle.lock().await;
            manager::schedule_stop(&mut state, stop);
            handle.record_state(&state);
            handle.try_begin_dispatch(&state).then(|| handle.epoch())
        };
        if let Some(epoch) = started {
            elevator_logic::spawn_dispatch(handle, epoch);
        }
        true
    }

    /// Current status of an elevator.
    pub async fn get_status(&self, elevator_id: ElevatorId) -> Option<ElevatorStatus> {
        let handle = self.elevator(elevator_id).await?;
        let state = handle.lock().await;
        Some(state.status())
    }

    /// Waiting and onboard passengers of an elevator.
    pub async fn passengers(&self, elevator_id: ElevatorId) -> Option<Vec<Passenger>> {
        let handle = self.elevator(elevator_id).await?;
        let state = handle.lock().await;
        Some(state.passengers.clone())
    }

    /// Requests of an elevator that are not served yet, with their waiting time.
    pub async fn pending_requests(&self, elevator_id: ElevatorId) -> Option<Vec<PendingRequest>> {
        let handle = self.elevator(elevator_id).await?;
        let state = handle.lock().await;
        Some(state.pending_requests(handle.clock().now()))
    }

    /// Event stream of an elevator.
    pub async fn subscribe(&self, elevator_id: ElevatorId) -> Option<broadcast::Receiver<ElevatorEvent>> {
        Some(self.elevator(elevator_id).await?.subscribe())
    }

    /// Puts an elevator back in its initial state and cancels everything it had pending.
    ///
    /// A dispatch loop in flight notices the reset at its next step and stops without touching
    /// the elevator again. `false` for an unknown id.
    pub async fn reset(&self, elevator_id: ElevatorId) -> bool {
        let Some(handle) = self.elevator(elevator_id).await else {
            return false;
        };
        let mut state = handle.lock().await;
        handle.invalidate(&state);

        let cancelled = state.requests.iter().filter(|r| r.status.is_open()).count();
        state.elevator.reset();
        state.passengers.clear();
        state.requests.clear();

        handle.record(StoreEvent::CancelPending { elevator_id });
        handle.publish(state.elevator.current_floor, EventKind::Reset);
        handle.record_state(&state);
        print::ok(format!("Elevator {} reset, {} request(s) cancelled", elevator_id, cancelled));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevator_logic::timer::TokioClock;
    use crate::model::Direction;

    fn registry() -> ElevatorRegistry {
        ElevatorRegistry::with_default_elevator(TokioClock::shared(), Persister::disabled(), Timing::default())
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_ids_are_refused() {
        let r = registry();
        assert!(!r.submit_call(9, 0, 3, 1).await);
        assert!(!r.schedule_stop(9, 3, false, 1).await);
        assert!(r.get_status(9).await.is_none());
        assert!(r.subscribe(9).await.is_none());
        assert!(!r.reset(9).await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_passenger_calls_are_refused() {
        let r = registry();
        assert!(!r.submit_call(1, 0, 3, 0).await);
        assert!(r.get_status(1).await.unwrap().stops.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn call_creates_request_passengers_and_pair() {
        let r = registry();
        assert!(r.submit_call(1, 0, 5, 2).await);
        let status = r.get_status(1).await.unwrap();
        assert_eq!(status.direction, Direction::Up);
        assert_eq!(status.stops.len(), 2);
        assert_eq!(status.passenger_queue.len(), 2);
        let pending = r.pending_requests(1).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.passenger_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn add_elevator_rejects_duplicates() {
        let r = registry();
        assert!(r.add_elevator(2, 4).await);
        assert!(!r.add_elevator(2, 4).await);
        assert_eq!(r.elevator_ids().await, vec![1, 2]);
        assert_eq!(r.get_status(2).await.unwrap().max_capacity, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_capacity_is_refused() {
        let r = registry().with_elevator(3, 0);
        assert!(!r.add_elevator(4, 0).await);
        assert_eq!(r.elevator_ids().await, vec![1]);
    }
}
