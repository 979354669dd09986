//! Envelope protection — lock (protect) and unlock (recover) byte buffers
//! under a key that never leaves the secure element.
//!
//! # Contract
//!
//! - `unlock(lock(b, m), m) == b` for every non-empty `b` and every mode `m`,
//!   for the life of the device key.
//! - Envelope size is chosen by the device. Nothing here assumes it equals,
//!   or is a fixed offset from, the plaintext size.
//! - Unlock is all-or-nothing: a failure never yields partial plaintext.
//! - The export mode is *not* recoverable from envelope bytes. [`Envelope`]
//!   records it on the host side; raw envelopes need the mode supplied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HsmError, Operation};
use crate::memory::SecretBuffer;
use crate::session::Session;
use crate::transport::{copy_then_release, DeviceTransport};

// ---------------------------------------------------------------------------
// Export mode
// ---------------------------------------------------------------------------

/// Which device key protects an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// Sealed under a key shared across units: any unit holding the shared
    /// key can unlock it.
    BufferBound,
    /// Sealed under the unit's own key: only the originating device can
    /// unlock it.
    DeviceBound,
}

impl ExportMode {
    /// Value of the vendor `use_shared_key` flag for this mode.
    #[must_use]
    pub const fn uses_shared_key(self) -> bool {
        matches!(self, Self::BufferBound)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BufferBound => "buffer-bound",
            Self::DeviceBound => "device-bound",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = HsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffer-bound" => Ok(Self::BufferBound),
            "device-bound" => Ok(Self::DeviceBound),
            other => Err(HsmError::InvalidArgument(format!(
                "unknown export mode '{other}' (expected buffer-bound or device-bound)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Device-produced protected form of a plaintext, plus the mode it was
/// sealed under.
///
/// The bytes are exactly what the device returned; `mode` is host-side
/// bookkeeping and is never written into them.
#[must_use = "an envelope is the only way to recover the plaintext"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    mode: ExportMode,
    bytes: Vec<u8>,
}

impl Envelope {
    /// Rebuild an envelope from stored bytes and the mode it was sealed with.
    pub const fn from_parts(mode: ExportMode, bytes: Vec<u8>) -> Self {
        Self { mode, bytes }
    }

    #[must_use]
    pub const fn mode(&self) -> ExportMode {
        self.mode
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for Envelope {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

// ---------------------------------------------------------------------------
// Lock / unlock
// ---------------------------------------------------------------------------

impl<T: DeviceTransport> Session<T> {
    /// Protect `plaintext` under the device key selected by `mode`.
    ///
    /// # Errors
    ///
    /// - [`HsmError::InvalidArgument`] if `plaintext` is empty.
    /// - [`HsmError::SessionClosed`] if the session is closed.
    /// - [`HsmError::Device`] if the device call fails.
    /// - [`HsmError::Protocol`] if the device reports success without output.
    pub fn lock(&mut self, plaintext: &[u8], mode: ExportMode) -> Result<Envelope, HsmError> {
        if plaintext.is_empty() {
            return Err(HsmError::InvalidArgument(
                "plaintext must not be empty".into(),
            ));
        }
        let transport = self.transport_mut()?;

        tracing::debug!(len = plaintext.len(), %mode, "{}()", Operation::Lock);
        let staged = transport
            .lock(plaintext, mode)
            .map_err(|fault| HsmError::from_fault(Operation::Lock, fault))?
            .ok_or_else(|| HsmError::protocol(Operation::Lock, "no output buffer"))?;
        let bytes = copy_then_release(staged);

        if bytes.is_empty() {
            return Err(HsmError::protocol(Operation::Lock, "empty envelope"));
        }
        tracing::debug!(len = bytes.len(), "envelope produced");
        Ok(Envelope { mode, bytes })
    }

    /// Recover the plaintext of a raw `envelope` sealed under `mode`.
    ///
    /// # Errors
    ///
    /// - [`HsmError::InvalidArgument`] if `envelope` is empty.
    /// - [`HsmError::SessionClosed`] if the session is closed.
    /// - [`HsmError::KeyMismatch`] if the device rejects the envelope.
    /// - [`HsmError::Device`] on any other device failure (devices that do
    ///   not distinguish a foreign envelope also land here).
    /// - [`HsmError::Protocol`] if the device reports success without output.
    pub fn unlock(&mut self, envelope: &[u8], mode: ExportMode) -> Result<SecretBuffer, HsmError> {
        if envelope.is_empty() {
            return Err(HsmError::InvalidArgument("envelope must not be empty".into()));
        }
        let transport = self.transport_mut()?;

        tracing::debug!(len = envelope.len(), %mode, "{}()", Operation::Unlock);
        let staged = transport
            .unlock(envelope, mode)
            .map_err(|fault| HsmError::from_fault(Operation::Unlock, fault))?
            .ok_or_else(|| HsmError::protocol(Operation::Unlock, "no output buffer"))?;

        // Copy straight into secure memory so no plain Vec of plaintext exists.
        let copied = if staged.as_ref().is_empty() {
            Err(HsmError::protocol(Operation::Unlock, "empty plaintext"))
        } else {
            SecretBuffer::new(staged.as_ref())
        };
        drop(staged);
        copied
    }

    /// Recover the plaintext of `envelope` using the mode it was sealed with.
    ///
    /// # Errors
    ///
    /// Same as [`Session::unlock`].
    pub fn unlock_envelope(&mut self, envelope: &Envelope) -> Result<SecretBuffer, HsmError> {
        self.unlock(&envelope.bytes, envelope.mode)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
