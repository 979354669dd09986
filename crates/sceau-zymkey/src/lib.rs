//! `sceau-zymkey` — Zymkey secure element transport.
//!
//! ```text
//! Session::open(ZymkeyTransport::connect)
//!        │
//!        ▼
//! ZymkeyTransport ──► sys (zk_app_utils FFI) ──► /dev/i2c (vendor daemon)
//!        │
//!        └─ output buffers held as ForeignBuffer (zeroize + free on drop)
//! ```
//!
//! Build with `--features hardware` on a host with `libzk_app_utils`
//! installed. Without it, [`ZymkeyTransport::connect`] always fails with
//! `-ENODEV`, so callers can fall back to the simulated element.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod buffer;
mod sys;
pub mod transport;

pub use buffer::ForeignBuffer;
pub use transport::ZymkeyTransport;

/// Whether this build links the vendor library.
#[must_use]
pub const fn hardware_enabled() -> bool {
    cfg!(feature = "hardware")
}
