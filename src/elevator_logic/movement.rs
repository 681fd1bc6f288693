//! Moves the car floor by floor.

use crate::elevator_logic::Progress;
use crate::model::{Direction, ElevatorBehaviour, EventKind};
use crate::registry::ElevatorHandle;

/// Drives the car to `target`, one floor per `floor_travel`, publishing
/// [EventKind::FloorReached] at every floor. Already being there is a no-op.
pub async fn move_to(handle: &ElevatorHandle, target: i32, epoch: u64) -> Progress {
    let departing = handle
        .update(epoch, |state| {
            let e = &mut state.elevator;
            if e.current_floor == target {
                return false;
            }
            e.direction = Direction::towards(e.current_floor, target);
            e.behaviour = ElevatorBehaviour::Moving;
            e.is_door_open = false;
            handle.record_state(state);
            true
        })
        .await;
    match departing {
        None => return Progress::Aborted,
        Some(false) => return Progress::Completed,
        Some(true) => {}
    }

    loop {
        handle.clock().sleep(handle.timing().floor_travel).await;

        let arrived = handle
            .update(epoch, |state| {
                let e = &mut state.elevator;
                e.current_floor += Direction::towards(e.current_floor, target).step();
                let floor = e.current_floor;
                handle.publish(floor, EventKind::FloorReached);
                handle.record_state(state);
                floor == target
            })
            .await;

        match arrived {
            None => return Progress::Aborted,
            Some(true) => return Progress::Completed,
            Some(false) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::elevator_logic::timer::{Clock, TokioClock};
    use crate::persistence::Persister;
    use crate::registry::IdGenerator;
    use std::sync::Arc;
    use std::time::Duration;

    fn handle() -> ElevatorHandle {
        ElevatorHandle::new(
            1,
            8,
            TokioClock::shared(),
            Persister::disabled(),
            Timing::default(),
            Arc::new(IdGenerator::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn one_floor_per_interval() {
        let h = handle();
        let clock = TokioClock::new();
        let mut rx = h.subscribe();

        assert_eq!(move_to(&h, 3, h.epoch()).await, Progress::Completed);
        assert_eq!(h.lock().await.elevator.current_floor, 3);
        assert!(clock.now() >= Duration::from_secs(3));

        for floor in 1..=3 {
            let ev = rx.recv().await.unwrap();
            assert_eq!((ev.floor, ev.kind), (floor, EventKind::FloorReached));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn moves_down_and_sets_direction() {
        let h = handle();
        h.lock().await.elevator.current_floor = 4;
        let mover = move_to(&h, 2, h.epoch());
        tokio::pin!(mover);
        tokio::select! {
            _ = &mut mover => panic!("arrived too early"),
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }
        assert_eq!(h.lock().await.elevator.direction, Direction::Down);
        assert_eq!(h.lock().await.elevator.behaviour, ElevatorBehaviour::Moving);
        assert_eq!(mover.await, Progress::Completed);
        assert_eq!(h.lock().await.elevator.current_floor, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn same_floor_is_a_no_op() {
        let h = handle();
        assert_eq!(move_to(&h, 0, h.epoch()).await, Progress::Completed);
        assert_eq!(h.lock().await.elevator.behaviour, ElevatorBehaviour::Idle);
    }
}
