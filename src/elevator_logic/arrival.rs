//! Serving a stop: doors open, riders board or alight, doors close, the car settles.
//!
//! [board] and [alight] are the pure state changes of the exchange step. [on_arrival] runs the
//! timed phases around them and queues the matching store writes.

use std::collections::BTreeSet;

use crate::elevator_logic::Progress;
use crate::manager;
use crate::model::{
    ElevatorBehaviour, ElevatorState, EventKind, PassengerId, PassengerStatus, RequestId, RequestStatus, Stop,
};
use crate::persistence::{DestinationMarker, StoreEvent};
use crate::print;
use crate::registry::ElevatorHandle;

/// Outcome of a pickup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boarding {
    /// Riders that got on
    pub boarded: u32,
    /// Passenger records now onboard
    pub passengers: Vec<PassengerId>,
    /// Requests that went from pending to assigned
    pub assigned: Vec<RequestId>,
    /// Riders of this stop still waiting because the car was full
    pub left_waiting: u32,
}

/// Outcome of a drop-off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alighting {
    /// Riders taken off the car count
    pub alighted: u32,
    /// Passenger records now completed
    pub completed: Vec<PassengerId>,
    /// Requests that became served
    pub served: Vec<RequestId>,
}

/// Boards waiting passengers at `stop.floor`, oldest request first, as far as room allows.
///
/// A stop linked to a request only boards that request's passengers.
pub fn board(state: &mut ElevatorState, stop: &Stop) -> Boarding {
    let elevator_id = state.elevator.id;
    let room = stop.passenger_count.min(state.elevator.remaining_capacity());

    let mut waiting: Vec<usize> = state
        .passengers
        .iter()
        .enumerate()
        .filter(|(_, p)| p.status == PassengerStatus::Waiting && p.pickup_floor == stop.floor)
        .filter(|(_, p)| stop.request_id.map_or(true, |rid| p.request_id == rid))
        .map(|(i, _)| i)
        .collect();
    waiting.sort_by_key(|&i| (state.passengers[i].requested_at_ms, state.passengers[i].id));

    let mut out = Boarding::default();
    let mut touched = BTreeSet::new();
    let mut not_boarded: u32 = 0;
    for i in waiting {
        let p = &mut state.passengers[i];
        if out.boarded + p.count > room {
            not_boarded += p.count;
            continue;
        }
        p.status = PassengerStatus::Onboard;
        p.elevator_id = Some(elevator_id);
        out.boarded += p.count;
        out.passengers.push(p.id);
        touched.insert(p.request_id);
    }
    state.elevator.current_passengers += out.boarded;

    for r in state.requests.iter_mut().filter(|r| touched.contains(&r.id)) {
        if r.status == RequestStatus::Pending {
            r.status = RequestStatus::Assigned;
            out.assigned.push(r.id);
        }
    }

    out.left_waiting = not_boarded.min(stop.passenger_count.saturating_sub(out.boarded));
    out
}

/// Lets riders off at `stop.floor`.
///
/// The car count drops by `stop.passenger_count` (never below zero). Onboard passengers of this
/// elevator heading here, of the stop's request when linked, are completed and leave the
/// queue. A request is served, and leaves the book, once none of its passengers remain.
pub fn alight(state: &mut ElevatorState, stop: &Stop) -> Alighting {
    let elevator_id = state.elevator.id;
    let before = state.elevator.current_passengers;
    state.elevator.current_passengers = before.saturating_sub(stop.passenger_count);

    let mut out = Alighting {
        alighted: before - state.elevator.current_passengers,
        ..Alighting::default()
    };
    let mut touched = BTreeSet::new();
    for p in state.passengers.iter_mut() {
        let arriving = p.status == PassengerStatus::Onboard
            && p.elevator_id == Some(elevator_id)
            && p.destination_floor == stop.floor
            && stop.request_id.map_or(true, |rid| p.request_id == rid);
        if arriving {
            p.status = PassengerStatus::Completed;
            out.completed.push(p.id);
            touched.insert(p.request_id);
        }
    }
    state.passengers.retain(|p| p.status != PassengerStatus::Completed);

    for r in state.requests.iter_mut().filter(|r| touched.contains(&r.id)) {
        let open = state.passengers.iter().any(|p| p.request_id == r.id);
        if !open && r.status.can_become(RequestStatus::Served) {
            r.status = RequestStatus::Served;
            out.served.push(r.id);
        }
    }
    state.requests.retain(|r| r.status != RequestStatus::Served);
    out
}

/// Puts riders left behind at a full pickup back on the route.
///
/// The pickup's drop-off shrinks to the riders that did board (or goes away if nobody did) and
/// a new pair for the rest is inserted after it, or at the end of the list.
fn requeue(handle: &ElevatorHandle, state: &mut ElevatorState, stop: &Stop, boarding: &Boarding) {
    let Some(request_id) = stop.request_id else {
        return;
    };
    let Some(destination) = state.requests.iter().find(|r| r.id == request_id).map(|r| r.destination_floor) else {
        return;
    };

    let stops = &mut state.elevator.stops;
    let drop_index = stop.paired_stop_id.and_then(|id| stops.iter().position(|s| s.id == id));
    let min_index = match drop_index {
        Some(i) if boarding.boarded > 0 => {
            stops[i].passenger_count = boarding.boarded;
            i + 1
        }
        Some(i) => {
            stops.remove(i);
            // The served pickup has no drop-off left; it stays at the head until finished
            if let Some(served) = stops.iter_mut().find(|s| s.id == stop.id) {
                served.paired_stop_id = None;
            }
            stops.len()
        }
        None => stops.len(),
    };

    let (pickup, drop) = Stop::pair(
        (handle.next_id(), handle.next_id()),
        stop.floor,
        destination,
        boarding.left_waiting,
        request_id,
    );
    manager::schedule_pair_from(state, pickup, drop, min_index);
    print::warn(format!(
        "Elevator {} full at floor {}, {} rider(s) of request {} requeued",
        handle.id(),
        stop.floor,
        boarding.left_waiting,
        request_id
    ));
}

/// Runs the exchange step under the lock and queues its store writes.
fn exchange(handle: &ElevatorHandle, state: &mut ElevatorState, stop: &Stop) {
    let elevator_id = handle.id();
    if stop.is_dropoff {
        let out = alight(state, stop);
        for id in out.completed {
            handle.record(StoreEvent::PassengerStatus {
                passenger_id: id,
                status: PassengerStatus::Completed,
                elevator_id: Some(elevator_id),
            });
        }
        for id in out.served {
            handle.record(StoreEvent::RequestStatus { request_id: id, status: RequestStatus::Served });
        }
        handle.record(StoreEvent::DestinationCompleted(DestinationMarker {
            elevator_id,
            stop_id: stop.id,
            floor: stop.floor,
            request_id: stop.request_id,
            at_ms: handle.now_ms(),
        }));
        handle.publish(stop.floor, EventKind::PassengersAlighted { count: out.alighted });
    } else {
        let out = board(state, stop);
        for id in &out.passengers {
            handle.record(StoreEvent::PassengerStatus {
                passenger_id: *id,
                status: PassengerStatus::Onboard,
                elevator_id: Some(elevator_id),
            });
        }
        for id in &out.assigned {
            handle.record(StoreEvent::RequestStatus { request_id: *id, status: RequestStatus::Assigned });
        }
        handle.publish(stop.floor, EventKind::PassengersBoarded { count: out.boarded });
        if out.left_waiting > 0 {
            requeue(handle, state, stop, &out);
        }
    }
    handle.record_state(state);
}

/// Serves `stop`, the car already standing at its floor.
pub async fn on_arrival(handle: &ElevatorHandle, stop: &Stop, epoch: u64) -> Progress {
    let timing = *handle.timing();
    let clock = handle.clock().clone();

    let opened = handle
        .update(epoch, |state| {
            state.elevator.is_door_open = true;
            state.elevator.behaviour = ElevatorBehaviour::DoorOpen;
            handle.publish(stop.floor, EventKind::DoorsOpened);
            handle.record_state(state);
        })
        .await;
    if opened.is_none() {
        return Progress::Aborted;
    }
    clock.sleep(timing.door_open).await;
    clock.sleep(timing.boarding).await;

    if handle.update(epoch, |state| exchange(handle, state, stop)).await.is_none() {
        return Progress::Aborted;
    }

    clock.sleep(timing.door_close).await;
    let closed = handle
        .update(epoch, |state| {
            state.elevator.is_door_open = false;
            state.elevator.behaviour = ElevatorBehaviour::Stopped;
            handle.publish(stop.floor, EventKind::DoorsClosed);
            handle.record_state(state);
        })
        .await;
    if closed.is_none() {
        return Progress::Aborted;
    }
    clock.sleep(timing.settle).await;

    // A reset during the settle still counts
    handle.update(epoch, |_| ()).await.into()
}
