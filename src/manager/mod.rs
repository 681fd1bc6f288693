//! # Stop manager
//!
//! Decides *where* new stops go in an elevator's stop list. The actual cost search lives in
//! [route_scheduler]; this module applies it to an [ElevatorState] and keeps the direction
//! invariant (`Idle` iff no stops) intact.

pub mod route_scheduler;

use crate::model::{Direction, ElevatorState, Stop};

/// Result of scheduling into an elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    /// Index of the (first) inserted stop
    pub first: usize,
    /// Index of the drop-off for a pair, `None` for a single stop
    pub second: Option<usize>,
    /// `true` when the elevator was idle before the insertion
    pub was_idle: bool,
}

/// Sets the direction of an idle elevator from its new head stop.
fn wake_up(state: &mut ElevatorState, was_idle: bool) {
    if was_idle {
        let e = &mut state.elevator;
        e.direction = route_scheduler::initial_direction(e.current_floor, &e.stops);
    }
}

/// Inserts one stop into the elevator's list.
pub fn schedule_stop(state: &mut ElevatorState, stop: Stop) -> Scheduled {
    let was_idle = state.elevator.direction == Direction::Idle;
    let current = state.elevator.current_floor;
    let first = route_scheduler::insert(current, &mut state.elevator.stops, stop);
    wake_up(state, was_idle);
    Scheduled { first, second: None, was_idle }
}

/// Inserts a pickup and its drop-off into the elevator's list.
pub fn schedule_pair(state: &mut ElevatorState, pickup: Stop, drop: Stop) -> Scheduled {
    schedule_pair_from(state, pickup, drop, 0)
}

/// Inserts a pair with the pickup no earlier than `min_index`.
pub fn schedule_pair_from(state: &mut ElevatorState, pickup: Stop, drop: Stop, min_index: usize) -> Scheduled {
    let was_idle = state.elevator.direction == Direction::Idle;
    let current = state.elevator.current_floor;
    let (i, j) = route_scheduler::insert_pair_from(current, &mut state.elevator.stops, pickup, drop, min_index);
    wake_up(state, was_idle);
    Scheduled { first: i, second: Some(j), was_idle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_elevator_gets_a_direction() {
        let mut state = ElevatorState::new(1, 8);
        let (p, d) = Stop::pair((1, 2), 0, 5, 2, 1);
        let s = schedule_pair(&mut state, p, d);
        assert!(s.was_idle);
        assert_eq!(state.elevator.direction, Direction::Up);
        assert_eq!(s.second, Some(1));
    }

    #[test]
    fn moving_elevator_keeps_its_direction() {
        let mut state = ElevatorState::new(1, 8);
        state.elevator.current_floor = 6;
        state.elevator.direction = Direction::Down;
        state.elevator.stops.push(Stop::dropoff(9, 2, 1));
        let s = schedule_stop(&mut state, Stop::pickup(10, 8, 1));
        assert!(!s.was_idle);
        assert_eq!(state.elevator.direction, Direction::Down);
    }
}
