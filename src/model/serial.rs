//! Serialization and Deserialization for [ElevatorStatus] snapshots

use crate::model::ElevatorStatus;
use crate::print;


/// Serializes an `ElevatorStatus` into a binary format.
///
/// Uses `bincode`. If serialization fails, the error is logged and `None` is returned.
pub fn serialize_status(status: &ElevatorStatus) -> Option<Vec<u8>> {
    match bincode::serialize(status) {
        Ok(serialized_data) => Some(serialized_data),
        Err(e) => {
            print::err(format!("Serialization failed: {} (serial.rs, serialize_status())", e));
            None
        }
    }
}

/// Deserializes an `ElevatorStatus` from a binary format.
///
/// If deserialization fails, the error is logged and `None` is returned.
pub fn deserialize_status(data: &[u8]) -> Option<ElevatorStatus> {
    match bincode::deserialize(data) {
        Ok(status) => Some(status),
        Err(e) => {
            print::err(format!("Deserialization failed: {} (serial.rs, deserialize_status())", e));
            None
        }
    }
}

/// Renders a status as pretty JSON, for the `--json` output of the binary.
pub fn status_json(status: &ElevatorStatus) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(status)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElevatorState, Stop};

    #[test]
    fn garbage_is_rejected() {
        assert!(deserialize_status(&[1, 2, 3]).is_none());
    }

    #[test]
    fn snapshot_survives_the_store_format() {
        let mut state = ElevatorState::new(2, 5);
        state.elevator.stops.push(Stop::dropoff(4, -1, 2));
        let status = state.status();
        let bytes = serialize_status(&status).expect("encodes");
        assert_eq!(deserialize_status(&bytes), Some(status));
    }

    #[test]
    fn json_uses_lowercase_directions() {
        let status = ElevatorState::new(1, 8).status();
        let json = status_json(&status).expect("renders");
        assert!(json.contains("\"direction\": \"idle\""));
        assert!(json.contains("\"behaviour\": \"idle\""));
    }
}
