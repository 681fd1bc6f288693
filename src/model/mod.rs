//! # Elevator data model
//!
//! Plain data describing one elevator aggregate and the passengers/requests it serves.
//! Everything here is `serde`-serializable, so the same types are used for status
//! queries, the event stream and the store snapshots (see [serial]).
//!
//! The aggregate that sits behind an elevator's lock is [ElevatorState]: the
//! [Elevator] itself plus its passenger queue and request book.

pub mod serial;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config;

/// Identifies an elevator in the registry
pub type ElevatorId = u8;
/// Identifies one scheduled stop
pub type StopId = u64;
/// Identifies one passenger record
pub type PassengerId = u64;
/// Identifies one call for service
pub type RequestId = u64;

/// Direction an elevator is travelling in. `Idle` exactly when it has no stops.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Idle,
    Up,
    Down,
}

impl Direction {
    /// Direction of travel from `from` to `to`. `Idle` when they are the same floor.
    pub fn towards(from: i32, to: i32) -> Direction {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Idle,
        }
    }

    /// Floor increment for one unit of travel in this direction.
    pub fn step(&self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
            Direction::Idle => 0,
        }
    }
}

/// Phase of the state machine the elevator is currently in
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevatorBehaviour {
    Idle,
    Moving,
    DoorOpen,
    /// Doors closed at a stop, settling before the next leg
    Stopped,
}

/// One scheduled floor visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Unique id, used to remove the stop once visited
    pub id: StopId,
    /// Floor to visit
    pub floor: i32,
    /// `true` for a drop-off, `false` for a pickup
    pub is_dropoff: bool,
    /// Riders boarding (pickup) or alighting (drop-off) here
    pub passenger_count: u32,
    /// The sibling pickup/drop-off stop
    pub paired_stop_id: Option<StopId>,
    /// The request this stop serves
    pub request_id: Option<RequestId>,
}

impl Stop {
    /// A pickup stop without a sibling.
    pub fn pickup(id: StopId, floor: i32, passenger_count: u32) -> Self {
        Self {
            id,
            floor,
            is_dropoff: false,
            passenger_count,
            paired_stop_id: None,
            request_id: None,
        }
    }

    /// A drop-off stop without a sibling.
    pub fn dropoff(id: StopId, floor: i32, passenger_count: u32) -> Self {
        Self {
            is_dropoff: true,
            ..Self::pickup(id, floor, passenger_count)
        }
    }

    /// Builds a linked pickup/drop-off pair for `request_id`.
    pub fn pair(
        ids: (StopId, StopId),
        pickup_floor: i32,
        drop_floor: i32,
        passenger_count: u32,
        request_id: RequestId,
    ) -> (Stop, Stop) {
        let (pickup_id, drop_id) = ids;
        let pickup = Stop {
            paired_stop_id: Some(drop_id),
            request_id: Some(request_id),
            ..Stop::pickup(pickup_id, pickup_floor, passenger_count)
        };
        let drop = Stop {
            paired_stop_id: Some(pickup_id),
            request_id: Some(request_id),
            ..Stop::dropoff(drop_id, drop_floor, passenger_count)
        };
        (pickup, drop)
    }
}

/// Lifecycle of a passenger record
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerStatus {
    Waiting,
    Onboard,
    Completed,
    Cancelled,
}

impl PassengerStatus {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Completed and cancelled are terminal. Repeating the current status is not a transition.
    pub fn can_become(self, next: PassengerStatus) -> bool {
        use PassengerStatus::*;
        match (self, next) {
            (Waiting, Onboard) | (Waiting, Completed) | (Onboard, Completed) => true,
            (Waiting, Cancelled) | (Onboard, Cancelled) => true,
            _ => false,
        }
    }

    /// `true` for waiting and onboard.
    pub fn is_active(self) -> bool {
        matches!(self, PassengerStatus::Waiting | PassengerStatus::Onboard)
    }
}

/// Lifecycle of a request
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Assigned,
    Served,
    Cancelled,
}

impl RequestStatus {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_become(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (Pending, Assigned) | (Pending, Served) | (Assigned, Served) => true,
            (Pending, Cancelled) | (Assigned, Cancelled) => true,
            _ => false,
        }
    }

    /// `true` for pending and assigned.
    pub fn is_open(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Assigned)
    }
}

/// One group of riders sharing pickup and destination. Every record created by
/// call ingestion carries a single rider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    /// Unique id
    pub id: PassengerId,
    /// Request this passenger belongs to
    pub request_id: RequestId,
    /// Floor the passenger waits at
    pub pickup_floor: i32,
    /// Floor the passenger travels to
    pub destination_floor: i32,
    /// Riders in this record
    pub count: u32,
    /// Where in its lifecycle the passenger is
    pub status: PassengerStatus,
    /// Elevator that picked the passenger up. `None` while waiting
    pub elevator_id: Option<ElevatorId>,
    /// Clock time of the call, in milliseconds
    pub requested_at_ms: u64,
}

/// One call for service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique id
    pub id: RequestId,
    /// Elevator the call was made to
    pub elevator_id: ElevatorId,
    /// Pickup floor
    pub pickup_floor: i32,
    /// Destination floor
    pub destination_floor: i32,
    /// Number of riders in the call
    pub passenger_count: u32,
    /// Where in its lifecycle the request is
    pub status: RequestStatus,
    /// Clock time of the call, in milliseconds
    pub requested_at_ms: u64,
}

/// The simulated car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elevator {
    /// Registry id
    pub id: ElevatorId,
    /// Floor the car is at (or last passed)
    pub current_floor: i32,
    /// Travel direction, [Direction::Idle] iff `stops` is empty
    pub direction: Direction,
    /// Free-form operational status
    pub status: String,
    /// Phase of the state machine
    pub behaviour: ElevatorBehaviour,
    /// Maximum riders in the car
    pub max_capacity: u32,
    /// Riders in the car, never above `max_capacity`
    pub current_passengers: u32,
    /// Whether the doors are open
    pub is_door_open: bool,
    /// Ordered stops still to visit
    pub stops: Vec<Stop>,
}

impl Elevator {
    /// A freshly initialized elevator at [config::START_FLOOR].
    pub fn new(id: ElevatorId, max_capacity: u32) -> Self {
        Self {
            id,
            current_floor: config::START_FLOOR,
            direction: Direction::Idle,
            status: config::OPERATIONAL_STATUS.to_string(),
            behaviour: ElevatorBehaviour::Idle,
            max_capacity,
            current_passengers: 0,
            is_door_open: false,
            stops: Vec::new(),
        }
    }

    /// Puts every field back to its initial value. Id and capacity are kept.
    pub fn reset(&mut self) {
        *self = Elevator::new(self.id, self.max_capacity);
    }

    /// Riders that still fit in the car.
    pub fn remaining_capacity(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_passengers)
    }
}

/// Everything that lives behind one elevator's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorState {
    /// The car
    pub elevator: Elevator,
    /// Waiting and onboard passengers, in creation order
    pub passengers: Vec<Passenger>,
    /// Requests that are not yet served, in creation order
    pub requests: Vec<Request>,
}

impl ElevatorState {
    /// A fresh aggregate with no passengers and no requests.
    pub fn new(id: ElevatorId, max_capacity: u32) -> Self {
        Self {
            elevator: Elevator::new(id, max_capacity),
            passengers: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Snapshot used for status queries and store upserts.
    pub fn status(&self) -> ElevatorStatus {
        let e = &self.elevator;
        ElevatorStatus {
            id: e.id,
            current_floor: e.current_floor,
            direction: e.direction,
            status: e.status.clone(),
            behaviour: e.behaviour,
            max_capacity: e.max_capacity,
            current_passengers: e.current_passengers,
            is_door_open: e.is_door_open,
            stops: e.stops.clone(),
            passenger_queue: self.passengers.clone(),
        }
    }

    /// Open requests with the time they have been waiting at clock time `now`.
    pub fn pending_requests(&self, now: Duration) -> Vec<PendingRequest> {
        let now_ms = now.as_millis() as u64;
        self.requests
            .iter()
            .filter(|r| r.status.is_open())
            .map(|r| PendingRequest {
                request: r.clone(),
                waiting_time_ms: now_ms.saturating_sub(r.requested_at_ms),
            })
            .collect()
    }
}

/// Read-only view of an elevator returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatorStatus {
    #[allow(missing_docs)]
    pub id: ElevatorId,
    #[allow(missing_docs)]
    pub current_floor: i32,
    #[allow(missing_docs)]
    pub direction: Direction,
    #[allow(missing_docs)]
    pub status: String,
    #[allow(missing_docs)]
    pub behaviour: ElevatorBehaviour,
    #[allow(missing_docs)]
    pub max_capacity: u32,
    #[allow(missing_docs)]
    pub current_passengers: u32,
    #[allow(missing_docs)]
    pub is_door_open: bool,
    #[allow(missing_docs)]
    pub stops: Vec<Stop>,
    /// Waiting and onboard passengers
    pub passenger_queue: Vec<Passenger>,
}

/// An open request and how long it has waited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    #[allow(missing_docs)]
    pub request: Request,
    #[allow(missing_docs)]
    pub waiting_time_ms: u64,
}

/// What happened to an elevator
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    CallAccepted {
        request_id: RequestId,
        pickup_floor: i32,
        destination_floor: i32,
        passengers: u32,
    },
    FloorReached,
    DoorsOpened,
    PassengersBoarded { count: u32 },
    PassengersAlighted { count: u32 },
    DoorsClosed,
    Idle,
    Reset,
}

/// Notification published on an elevator's event stream and appended to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElevatorEvent {
    /// Elevator the event belongs to
    pub elevator_id: ElevatorId,
    /// Per-elevator sequence number, increasing with every event
    pub seq: u64,
    /// Clock time, in milliseconds
    pub at_ms: u64,
    /// Floor the car was at
    pub floor: i32,
    /// What happened
    pub kind: EventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_towards_follows_sign() {
        assert_eq!(Direction::towards(1, 4), Direction::Up);
        assert_eq!(Direction::towards(4, 1), Direction::Down);
        assert_eq!(Direction::towards(2, 2), Direction::Idle);
        assert_eq!(Direction::Down.step(), -1);
    }

    #[test]
    fn pair_links_both_stops() {
        let (p, d) = Stop::pair((10, 11), 2, 6, 3, 7);
        assert!(!p.is_dropoff);
        assert!(d.is_dropoff);
        assert_eq!(p.paired_stop_id, Some(11));
        assert_eq!(d.paired_stop_id, Some(10));
        assert_eq!(p.request_id, Some(7));
        assert_eq!(d.passenger_count, 3);
    }

    #[test]
    fn statuses_only_move_forward() {
        assert!(PassengerStatus::Waiting.can_become(PassengerStatus::Onboard));
        assert!(!PassengerStatus::Completed.can_become(PassengerStatus::Onboard));
        assert!(!PassengerStatus::Cancelled.can_become(PassengerStatus::Completed));
        assert!(!PassengerStatus::Onboard.can_become(PassengerStatus::Onboard));
        assert!(RequestStatus::Assigned.can_become(RequestStatus::Served));
        assert!(!RequestStatus::Served.can_become(RequestStatus::Cancelled));
    }

    #[test]
    fn reset_keeps_identity_and_capacity() {
        let mut e = Elevator::new(3, 6);
        e.current_floor = 9;
        e.current_passengers = 4;
        e.direction = Direction::Up;
        e.stops.push(Stop::pickup(1, 9, 1));
        e.reset();
        assert_eq!(e, Elevator::new(3, 6));
    }

    #[test]
    fn pending_requests_report_waiting_time() {
        let mut state = ElevatorState::new(1, 8);
        state.requests.push(Request {
            id: 1,
            elevator_id: 1,
            pickup_floor: 0,
            destination_floor: 3,
            passenger_count: 1,
            status: RequestStatus::Pending,
            requested_at_ms: 1_500,
        });
        let pending = state.pending_requests(Duration::from_millis(4_000));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].waiting_time_ms, 2_500);
    }
}
