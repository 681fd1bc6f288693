//! # config.rs – Centralized Parameter Store
//!
//! This module holds all static program parameters used throughout the system.
//! Keeping configuration in one place makes tuning, experimentation, and testing easier.
//!
//! The delays of the simulated elevator are grouped in [Timing], so a caller can
//! hand a faster (or slower) set of delays to the registry without touching the constants.

use std::sync::Mutex;
use std::time::Duration;
use once_cell::sync::Lazy;

//
// ──────────────────────────────────────────────────────────────
//   1. SYSTEM & ELEVATOR PARAMETERS
// ──────────────────────────────────────────────────────────────
//

/// ID given to the elevator created by [crate::registry::ElevatorRegistry::with_default_elevator]
pub const DEFAULT_ELEVATOR_ID: u8 = 1;

/// Default maximum number of riders in one car
pub const DEFAULT_MAX_CAPACITY: u32 = 8;

/// Floor a new (or reset) elevator starts at
pub const START_FLOOR: i32 = 0;

/// Status string reported for a working elevator
pub const OPERATIONAL_STATUS: &str = "operational";

/// Capacity of the broadcast channel carrying [crate::model::ElevatorEvent]s
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

//
// ──────────────────────────────────────────────────────────────
//   2. TIMING
// ──────────────────────────────────────────────────────────────
//

/// Time spent travelling one floor
pub const FLOOR_TRAVEL: Duration = Duration::from_millis(1000);

/// Time it takes to open the doors
pub const DOOR_OPEN_DELAY: Duration = Duration::from_millis(500);

/// Time the doors stay open while riders board or alight
pub const BOARDING_DELAY: Duration = Duration::from_millis(2000);

/// Time it takes to close the doors
pub const DOOR_CLOSE_DELAY: Duration = Duration::from_millis(500);

/// Clearance after the doors closed before the car moves again
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// How often the binary prints the status table while the elevator is busy
pub const STATUS_PRINT_PERIOD: Duration = Duration::from_millis(1000);

/// The set of delays driving one elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time per floor travelled
    pub floor_travel: Duration,
    /// Door opening
    pub door_open: Duration,
    /// Boarding / alighting
    pub boarding: Duration,
    /// Door closing
    pub door_close: Duration,
    /// Settle before next leg
    pub settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            floor_travel: FLOOR_TRAVEL,
            door_open: DOOR_OPEN_DELAY,
            boarding: BOARDING_DELAY,
            door_close: DOOR_CLOSE_DELAY,
            settle: SETTLE_DELAY,
        }
    }
}

impl Timing {
    /// Total time the car stands still at one stop.
    pub fn dwell(&self) -> Duration {
        self.door_open + self.boarding + self.door_close + self.settle
    }
}

//
// ──────────────────────────────────────────────────────────────
//   3. PERSISTENCE
// ──────────────────────────────────────────────────────────────
//

/// Number of store writes that may wait in the outbound queue before new ones are dropped
pub const PERSIST_QUEUE_CAPACITY: usize = 1024;

/// Attempts made for one store write before it is given up
pub const PERSIST_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry of a failed store write. Doubled for every new attempt
pub const PERSIST_RETRY_BASE: Duration = Duration::from_millis(100);

/// Upper bound on the delay between two retries
pub const PERSIST_RETRY_MAX: Duration = Duration::from_millis(2000);

/// How often the served-request sweep runs against the store
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

//
// ──────────────────────────────────────────────────────────────
//   4. LOGGING CONFIGURATION
// ──────────────────────────────────────────────────────────────
//

/// Enable/disable printing of the status table
pub static PRINT_STATUS_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of errors
pub static PRINT_ERR_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of warnings
pub static PRINT_WARN_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of success messages
pub static PRINT_OK_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of general info
pub static PRINT_INFO_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable the per-floor / per-door elevator trace
pub static PRINT_ELEV_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));
