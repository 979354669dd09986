//! Error types for `sceau-core`.
//!
//! Two layers:
//! - [`DeviceFault`] — what a [`DeviceTransport`](crate::transport::DeviceTransport)
//!   reports when the device answers with a failure status.
//! - [`HsmError`] — what callers of a [`Session`](crate::session::Session) see.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// A single request/response call into the device transport.
///
/// Displayed as the vendor library call it corresponds to, so log lines and
/// error messages can be matched against device-side traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Close,
    RandomBytes,
    Lock,
    Unlock,
    Time,
    ModelNumber,
    FirmwareVersion,
    SerialNumber,
    LedOn,
    LedOff,
    LedFlash,
    CpuTemperature,
    BatteryVoltage,
}

impl Operation {
    /// Vendor call name for this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "zkOpen",
            Self::Close => "zkClose",
            Self::RandomBytes => "zkGetRandBytes",
            Self::Lock => "zkLockDataB2B",
            Self::Unlock => "zkUnlockDataB2B",
            Self::Time => "zkGetTime",
            Self::ModelNumber => "zkGetModelNumberString",
            Self::FirmwareVersion => "zkGetFirmwareVersionString",
            Self::SerialNumber => "zkGetSerialNumberString",
            Self::LedOn => "zkLEDOn",
            Self::LedOff => "zkLEDOff",
            Self::LedFlash => "zkLEDFlash",
            Self::CpuTemperature => "zkGetCPUTemp",
            Self::BatteryVoltage => "zkGetBatteryVoltage",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transport-level faults
// ---------------------------------------------------------------------------

/// Failure reported by the device transport for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceFault {
    /// The call returned a negative status code.
    #[error("device returned status {0}")]
    Status(i32),

    /// The device refused an envelope that was not produced under its key
    /// (or was corrupted in transit).
    #[error("device rejected envelope (status {0})")]
    Rejected(i32),
}

impl DeviceFault {
    /// The raw status code reported by the device.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Status(code) | Self::Rejected(code) => *code,
        }
    }
}

// ---------------------------------------------------------------------------
// Session-level errors
// ---------------------------------------------------------------------------

/// Errors produced by session, entropy, envelope, and device operations.
#[derive(Debug, Error)]
pub enum HsmError {
    /// A caller-supplied precondition was violated before any device contact.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was attempted on a session that is no longer open.
    #[error("session is closed")]
    SessionClosed,

    /// The device could not be reached, opened, or initialized.
    #[error("device unavailable (status {code})")]
    DeviceUnavailable {
        /// Status code reported by the open call.
        code: i32,
    },

    /// A device call returned a failure status during a valid request.
    #[error("{operation}() failed with code {code}")]
    Device {
        /// The failing call.
        operation: Operation,
        /// Negative status code reported by the device.
        code: i32,
    },

    /// The device reported success but its response broke the call contract.
    #[error("{operation}() protocol violation: {reason}")]
    Protocol {
        /// The call whose response was malformed.
        operation: Operation,
        /// What was wrong with the response.
        reason: String,
    },

    /// The envelope was not produced by this device, key, or export mode.
    #[error("envelope does not match the device key")]
    KeyMismatch,

    /// Secure buffer allocation for recovered plaintext failed.
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}

impl HsmError {
    /// Map a transport fault raised by `operation` into a session error.
    #[must_use]
    pub const fn from_fault(operation: Operation, fault: DeviceFault) -> Self {
        match fault {
            DeviceFault::Rejected(_) => Self::KeyMismatch,
            DeviceFault::Status(code) => Self::Device { operation, code },
        }
    }

    /// Build a [`HsmError::Protocol`] for `operation`.
    pub fn protocol(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Protocol {
            operation,
            reason: reason.into(),
        }
    }

    /// Returns `true` when the session itself must be discarded and reopened.
    ///
    /// Every other error is terminal only for the attempted operation.
    #[must_use]
    pub const fn invalidates_session(&self) -> bool {
        matches!(self, Self::SessionClosed | Self::DeviceUnavailable { .. })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_error_display_names_vendor_call() {
        let err = HsmError::Device {
            operation: Operation::Lock,
            code: -5,
        };
        assert_eq!(err.to_string(), "zkLockDataB2B() failed with code -5");
    }

    #[test]
    fn rejected_fault_maps_to_key_mismatch() {
        let err = HsmError::from_fault(Operation::Unlock, DeviceFault::Rejected(-74));
        assert!(matches!(err, HsmError::KeyMismatch));
    }

    #[test]
    fn status_fault_maps_to_device_error() {
        let err = HsmError::from_fault(Operation::RandomBytes, DeviceFault::Status(-1));
        assert!(matches!(
            err,
            HsmError::Device {
                operation: Operation::RandomBytes,
                code: -1
            }
        ));
    }

    #[test]
    fn fault_code_is_preserved() {
        assert_eq!(DeviceFault::Status(-3).code(), -3);
        assert_eq!(DeviceFault::Rejected(-9).code(), -9);
    }

    #[test]
    fn only_closed_and_unavailable_invalidate_session() {
        assert!(HsmError::SessionClosed.invalidates_session());
        assert!(HsmError::DeviceUnavailable { code: -19 }.invalidates_session());
        assert!(!HsmError::KeyMismatch.invalidates_session());
        assert!(!HsmError::InvalidArgument("x".into()).invalidates_session());
        assert!(!HsmError::protocol(Operation::Lock, "empty").invalidates_session());
        assert!(!HsmError::Device {
            operation: Operation::Close,
            code: -1
        }
        .invalidates_session());
    }

    #[test]
    fn protocol_error_display() {
        let err = HsmError::protocol(Operation::RandomBytes, "returned 3 bytes, expected 4");
        assert_eq!(
            err.to_string(),
            "zkGetRandBytes() protocol violation: returned 3 bytes, expected 4"
        );
    }
}
