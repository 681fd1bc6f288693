#![allow(dead_code)]

use std::time::Duration;

use liftdispatch::config::Timing;
use liftdispatch::elevator_logic::timer::TokioClock;
use liftdispatch::model::{Direction, ElevatorStatus};
use liftdispatch::persistence::Persister;
use liftdispatch::print;
use liftdispatch::registry::ElevatorRegistry;

pub const ID: u8 = 1;

/// Registry with elevator 1 of `capacity` and no store.
pub fn registry(capacity: u32) -> ElevatorRegistry {
    print::set_all(false);
    ElevatorRegistry::new(TokioClock::shared(), Persister::disabled(), Timing::default()).with_elevator(ID, capacity)
}

/// Checks the invariants that must hold whenever the aggregate is unlocked.
pub fn assert_consistent(status: &ElevatorStatus) {
    assert!(
        status.current_passengers <= status.max_capacity,
        "{} riders in a car for {}",
        status.current_passengers,
        status.max_capacity
    );
    assert_eq!(
        status.direction == Direction::Idle,
        status.stops.is_empty(),
        "direction {:?} with {} stop(s)",
        status.direction,
        status.stops.len()
    );
    for (i, stop) in status.stops.iter().enumerate() {
        if stop.is_dropoff {
            continue;
        }
        if let Some(drop_id) = stop.paired_stop_id {
            let j = status.stops.iter().position(|s| s.id == drop_id).expect("pickup without its drop-off");
            assert!(i < j, "pickup at {} after its drop-off at {}", i, j);
        }
    }
}

/// Polls until the elevator has no stops left, checking invariants on the way.
pub async fn wait_idle(registry: &ElevatorRegistry) -> ElevatorStatus {
    for _ in 0..2_000 {
        let status = registry.get_status(ID).await.expect("elevator exists");
        assert_consistent(&status);
        if status.stops.is_empty() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("elevator never went idle");
}
