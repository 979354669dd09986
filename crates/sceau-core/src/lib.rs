//! `sceau-core` — session, entropy, and envelope protection for hardware
//! security modules.
//!
//! The device itself sits behind [`transport::DeviceTransport`]. Everything
//! else is host-side plumbing: the session state machine, copying device
//! output into owned memory, and mapping device status codes to
//! [`HsmError`].
//!
//! ```text
//! Session::open ──► random_bytes / lock / unlock / aux ops ──► close
//!                          │
//!                          ▼
//!                  DeviceTransport (hardware or simulated)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;
pub mod transport;

pub mod session;

pub mod entropy;

pub mod envelope;

pub mod device;

pub mod simulated;

pub use device::{DeviceInfo, LedFlash, Timestamp};
pub use entropy::{DeviceRng, READ_CHUNK_LEN};
pub use envelope::{Envelope, ExportMode};
pub use error::{DeviceFault, HsmError, Operation};
pub use memory::{disable_core_dumps, SecretBuffer, SecretBytes};
pub use session::{Session, SessionState};
pub use simulated::{ElementProbe, LedState, SimulatedElement, SimulatedFleet};
pub use transport::{DeviceTransport, TimePrecision};
