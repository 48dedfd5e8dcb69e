// ── Core error types ──
//
// Two layers: `TransportError` is what the device layer hands back when it
// couldn't talk to a controller, `CoreError` is what the engine reports to
// its callers. A device answering "no" is not an error at either layer.

use thiserror::Error;

use crate::model::DeviceId;

/// Failure raised by a `DeviceAccess` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("invalid reply: {message}")]
    Protocol { message: String },

    #[error("unknown controller")]
    UnknownDevice,
}

/// Unified error type for the reconciliation engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Device errors ────────────────────────────────────────────────
    #[error("listing controllers: {0}")]
    Fleet(#[source] TransportError),

    #[error("controller {device}: {source}")]
    Device {
        device: DeviceId,
        #[source]
        source: TransportError,
    },

    #[error("controller {device}: read {found} of {expected} cards before reaching record index {limit}")]
    IncompleteFetch {
        device: DeviceId,
        expected: u32,
        found: u32,
        limit: u32,
    },

    #[error("controller {device} declined to store card {card}")]
    Rejected { device: DeviceId, card: u32 },

    // ── Validation errors ────────────────────────────────────────────
    #[error("door '{name}' is ambiguous: {first} and {second} both normalize to '{normalized}'")]
    AmbiguousDoor {
        name: String,
        normalized: String,
        first: String,
        second: String,
    },

    #[error("no door named '{name}'")]
    UnknownDoor { name: String },

    #[error("controller {device}: time profile {profile} is not defined")]
    TimeProfileNotDefined { device: DeviceId, profile: u8 },

    #[error("invalid card {card}: {reason}")]
    InvalidCard { card: u32, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn device(device: DeviceId, source: TransportError) -> Self {
        Self::Device { device, source }
    }

    /// The controller this error concerns, when there is one.
    pub fn device_id(&self) -> Option<DeviceId> {
        match self {
            Self::Device { device, .. }
            | Self::IncompleteFetch { device, .. }
            | Self::Rejected { device, .. }
            | Self::TimeProfileNotDefined { device, .. } => Some(*device),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_error_message_names_controller() {
        let err = CoreError::device(
            DeviceId::new(12345),
            TransportError::Timeout { timeout_ms: 2500 },
        );
        assert_eq!(err.to_string(), "controller 12345: no reply within 2500ms");
        assert_eq!(err.device_id(), Some(DeviceId::new(12345)));
    }

    #[test]
    fn rejected_message_names_card() {
        let err = CoreError::Rejected {
            device: DeviceId::new(1),
            card: 65537,
        };
        assert_eq!(err.to_string(), "controller 1 declined to store card 65537");
        assert_eq!(err.device_id(), Some(DeviceId::new(1)));
    }

    #[test]
    fn door_errors_have_no_controller() {
        let err = CoreError::UnknownDoor {
            name: "Attic".into(),
        };
        assert_eq!(err.device_id(), None);
    }

    #[test]
    fn fleet_listing_error_message() {
        let err = CoreError::Fleet(TransportError::Unreachable {
            reason: "bind failed".into(),
        });
        assert_eq!(err.to_string(), "listing controllers: unreachable: bind failed");
    }
}
