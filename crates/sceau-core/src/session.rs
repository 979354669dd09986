//! Session lifecycle — one exclusive, stateful connection to a secure element.
//!
//! ```text
//! open() ──► Open ──► close() ──► Closed   (terminal)
//!                 └─► drop   ──► Closed   (close failure logged)
//! ```
//!
//! A session owns its transport. Once `close` has been called the transport
//! is gone, whatever the release call reported, and every further operation
//! fails with [`HsmError::SessionClosed`] without touching the device.
//!
//! # Concurrency
//!
//! A session is not internally synchronized. Every operation takes
//! `&mut self`, so sharing one across threads requires the caller to
//! serialize access (e.g. `Mutex<Session<T>>`). No operation retries or
//! times out on its own; wrap the call if bounded latency is required.

use crate::error::{DeviceFault, HsmError, Operation};
use crate::transport::DeviceTransport;

/// Observable lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// A live connection to a secure element.
pub struct Session<T: DeviceTransport> {
    transport: Option<T>,
}

impl<T: DeviceTransport> Session<T> {
    /// Acquire a device handle via `connect` and return an open session.
    ///
    /// # Errors
    ///
    /// Returns [`HsmError::DeviceUnavailable`] if `connect` fails (device
    /// missing, busy, or permission denied).
    pub fn open<F>(connect: F) -> Result<Self, HsmError>
    where
        F: FnOnce() -> Result<T, DeviceFault>,
    {
        match connect() {
            Ok(transport) => {
                tracing::info!("device session opened");
                Ok(Self {
                    transport: Some(transport),
                })
            }
            Err(fault) => {
                tracing::warn!("{}() failed: {fault}", Operation::Open);
                Err(HsmError::DeviceUnavailable { code: fault.code() })
            }
        }
    }

    /// Wrap an already-connected transport.
    #[must_use]
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.transport.is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Release the device handle.
    ///
    /// The session is closed when this returns, even if the device reported
    /// a failure while releasing.
    ///
    /// # Errors
    ///
    /// - [`HsmError::SessionClosed`] if the session was already closed.
    /// - [`HsmError::Device`] if the release call failed.
    pub fn close(&mut self) -> Result<(), HsmError> {
        let mut transport = self.transport.take().ok_or(HsmError::SessionClosed)?;
        let result = transport.close();
        drop(transport);
        match result {
            Ok(()) => {
                tracing::info!("device session closed");
                Ok(())
            }
            Err(fault) => Err(HsmError::Device {
                operation: Operation::Close,
                code: fault.code(),
            }),
        }
    }

    /// Borrow the transport of an open session.
    ///
    /// # Errors
    ///
    /// Returns [`HsmError::SessionClosed`] if the session is closed.
    pub(crate) fn transport_mut(&mut self) -> Result<&mut T, HsmError> {
        self.transport.as_mut().ok_or(HsmError::SessionClosed)
    }

    /// Borrow the transport of an open session, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }
}

impl<T: DeviceTransport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                tracing::warn!("device session close on drop failed: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
