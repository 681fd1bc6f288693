//! # Elevator logic
//!
//! The dispatch loop of one elevator. It takes the head of the stop list, drives the car
//! there ([movement]), serves the stop ([arrival]) and removes it, until the list is empty.
//!
//! Every step re-locks the aggregate and checks the epoch it was started with. After a reset
//! the loop returns at its next step without touching the elevator.

pub mod arrival;
pub mod movement;
pub mod timer;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::model::{Direction, ElevatorBehaviour, ElevatorState, EventKind, StopId};
use crate::print;
use crate::registry::ElevatorHandle;

/// How a phase of the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The phase ran to the end
    Completed,
    /// The elevator was reset while the phase ran
    Aborted,
}

impl From<Option<()>> for Progress {
    fn from(value: Option<()>) -> Self {
        match value {
            Some(()) => Progress::Completed,
            None => Progress::Aborted,
        }
    }
}

/// Spawns [run] on the runtime. The caller must hold the dispatch claim for `epoch`.
pub fn spawn_dispatch(handle: Arc<ElevatorHandle>, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        run(handle, epoch).await;
    })
}

/// Serves stops until none are left or the elevator is reset.
pub async fn run(handle: Arc<ElevatorHandle>, epoch: u64) {
    loop {
        let head = handle
            .update(epoch, |state| {
                let head = state.elevator.stops.first().cloned();
                if head.is_none() {
                    go_idle(&handle, state);
                }
                head
            })
            .await;

        let stop = match head {
            Some(Some(stop)) => stop,
            Some(None) => return,
            None => {
                print::info(format!("Elevator {} dispatch stopped by reset", handle.id()));
                return;
            }
        };

        if movement::move_to(&handle, stop.floor, epoch).await == Progress::Aborted {
            return;
        }
        if arrival::on_arrival(&handle, &stop, epoch).await == Progress::Aborted {
            return;
        }

        let more = handle.update(epoch, |state| finish_stop(&handle, state, stop.id)).await;
        if more != Some(true) {
            return;
        }
    }
}

/// Removes a served stop. Goes idle and returns `false` if it was the last one.
fn finish_stop(handle: &ElevatorHandle, state: &mut ElevatorState, stop_id: StopId) -> bool {
    state.elevator.stops.retain(|s| s.id != stop_id);
    if state.elevator.stops.is_empty() {
        go_idle(handle, state);
        return false;
    }
    handle.record_state(state);
    true
}

/// Parks the elevator and releases the dispatch claim, under the caller's lock.
pub fn go_idle(handle: &ElevatorHandle, state: &mut ElevatorState) {
    let e = &mut state.elevator;
    e.direction = Direction::Idle;
    e.behaviour = ElevatorBehaviour::Idle;
    e.is_door_open = false;
    let floor = e.current_floor;

    handle.end_dispatch(state);
    handle.publish(floor, EventKind::Idle);
    handle.record_state(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::elevator_logic::timer::TokioClock;
    use crate::model::Stop;
    use crate::persistence::Persister;
    use crate::registry::IdGenerator;

    fn handle() -> Arc<ElevatorHandle> {
        Arc::new(ElevatorHandle::new(
            1,
            8,
            TokioClock::shared(),
            Persister::disabled(),
            Timing::default(),
            Arc::new(IdGenerator::new()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_goes_idle_and_releases_the_claim() {
        let h = handle();
        let epoch = {
            let state = h.lock().await;
            assert!(h.try_begin_dispatch(&state));
            h.epoch()
        };
        run(h.clone(), epoch).await;
        assert!(!h.is_dispatching());
        assert_eq!(h.lock().await.elevator.direction, Direction::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn loose_stops_are_visited_in_order() {
        let h = handle();
        let epoch = {
            let mut state = h.lock().await;
            state.elevator.stops = vec![Stop::pickup(1, 2, 0), Stop::dropoff(2, 4, 0)];
            state.elevator.direction = Direction::Up;
            assert!(h.try_begin_dispatch(&state));
            h.epoch()
        };
        run(h.clone(), epoch).await;
        let state = h.lock().await;
        assert_eq!(state.elevator.current_floor, 4);
        assert!(state.elevator.stops.is_empty());
        assert_eq!(state.elevator.behaviour, ElevatorBehaviour::Idle);
        assert!(!h.is_dispatching());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_epoch_leaves_state_alone() {
        let h = handle();
        let stale = h.epoch();
        {
            let mut state = h.lock().await;
            state.elevator.stops = vec![Stop::pickup(1, 3, 0)];
            state.elevator.direction = Direction::Up;
            h.invalidate(&state);
        }
        run(h.clone(), stale).await;
        let state = h.lock().await;
        assert_eq!(state.elevator.current_floor, 0);
        assert_eq!(state.elevator.stops.len(), 1);
    }
}
