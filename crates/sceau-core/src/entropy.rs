//! Entropy source — random bytes drawn from the secure element.
//!
//! The device is the only entropy authority: when a request fails the error
//! is surfaced, never replaced by host-generated bytes.
//!
//! Besides [`Session::random_bytes`], a session can be used as a byte stream
//! (`std::io::Read`) or, through [`DeviceRng`], as a `rand` CSPRNG.

use std::io;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::{HsmError, Operation};
use crate::session::Session;
use crate::transport::{copy_then_release, DeviceTransport};

/// Largest single request issued by [`Session::fill_random`] and `io::Read`.
pub const READ_CHUNK_LEN: usize = 4096;

impl<T: DeviceTransport> Session<T> {
    /// Request exactly `len` random bytes from the device.
    ///
    /// # Errors
    ///
    /// - [`HsmError::InvalidArgument`] if `len` is zero.
    /// - [`HsmError::SessionClosed`] if the session is closed.
    /// - [`HsmError::Device`] if the device call fails.
    /// - [`HsmError::Protocol`] if the device returns no buffer or a buffer
    ///   of the wrong length.
    pub fn random_bytes(&mut self, len: usize) -> Result<Vec<u8>, HsmError> {
        if len == 0 {
            return Err(HsmError::InvalidArgument("length must be positive".into()));
        }
        let transport = self.transport_mut()?;

        tracing::debug!(len, "{}()", Operation::RandomBytes);
        let staged = transport
            .random_bytes(len)
            .map_err(|fault| HsmError::from_fault(Operation::RandomBytes, fault))?
            .ok_or_else(|| HsmError::protocol(Operation::RandomBytes, "no output buffer"))?;
        let mut bytes = copy_then_release(staged);

        if bytes.len() != len {
            let got = bytes.len();
            bytes.zeroize();
            return Err(HsmError::protocol(
                Operation::RandomBytes,
                format!("returned {got} bytes, expected {len}"),
            ));
        }
        Ok(bytes)
    }

    /// Fill `dest` with device randomness, chaining requests of at most
    /// [`READ_CHUNK_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Session::random_bytes`]; `dest` may be partially written
    /// when a later chunk fails.
    pub fn fill_random(&mut self, dest: &mut [u8]) -> Result<(), HsmError> {
        if dest.is_empty() {
            return Err(HsmError::InvalidArgument(
                "destination buffer must not be empty".into(),
            ));
        }
        for chunk in dest.chunks_mut(READ_CHUNK_LEN) {
            let mut bytes = self.random_bytes(chunk.len())?;
            chunk.copy_from_slice(&bytes);
            bytes.zeroize();
        }
        Ok(())
    }

    /// Borrow this session as a `rand` generator.
    pub fn rng(&mut self) -> DeviceRng<'_, T> {
        DeviceRng { session: self }
    }
}

impl<T: DeviceTransport> io::Read for Session<T> {
    /// Reads up to [`READ_CHUNK_LEN`] random bytes per call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min(READ_CHUNK_LEN);
        let mut bytes = self.random_bytes(len).map_err(into_io_error)?;
        buf[..len].copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(len)
    }
}

fn into_io_error(err: HsmError) -> io::Error {
    let kind = match err {
        HsmError::SessionClosed | HsmError::DeviceUnavailable { .. } => io::ErrorKind::NotConnected,
        HsmError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
        HsmError::Protocol { .. } => io::ErrorKind::InvalidData,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}

// ---------------------------------------------------------------------------
// rand adapter
// ---------------------------------------------------------------------------

/// A `rand` CSPRNG backed by a borrowed session.
///
/// `try_fill_bytes` reports device failures. The infallible `RngCore`
/// methods panic on failure instead of falling back to host entropy.
pub struct DeviceRng<'a, T: DeviceTransport> {
    session: &'a mut Session<T>,
}

impl<T: DeviceTransport> RngCore for DeviceRng<'_, T> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// # Panics
    ///
    /// Panics if the device entropy request fails.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.try_fill_bytes(dest) {
            panic!("device entropy source failed: {e}");
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        if dest.is_empty() {
            return Ok(());
        }
        self.session.fill_random(dest).map_err(rand::Error::new)
    }
}

impl<T: DeviceTransport> CryptoRng for DeviceRng<'_, T> {}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::simulated::{SimulatedElement, SimulatedFleet};

    fn session() -> Session<SimulatedElement> {
        let fleet = SimulatedFleet::from_seed(b"entropy unit tests");
        Session::from_transport(fleet.element("ZK-E001"))
    }

    #[test]
    fn random_bytes_exact_length() {
        let mut s = session();
        for len in [1, 16, 32, 1024, 65_536] {
            let bytes = s.random_bytes(len).expect("random_bytes should succeed");
            assert_eq!(bytes.len(), len);
        }
    }

    #[test]
    fn zero_length_is_invalid_without_device_contact() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        let result = s.random_bytes(0);
        assert!(matches!(result, Err(HsmError::InvalidArgument(_))));
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn repeated_calls_differ() {
        let mut s = session();
        let a = s.random_bytes(32).expect("random_bytes should succeed");
        let b = s.random_bytes(32).expect("random_bytes should succeed");
        assert_ne!(a, b);
    }

    #[test]
    fn short_device_output_is_protocol_error() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        probe.set_malformed_output(true);
        let result = s.random_bytes(16);
        assert!(matches!(
            result,
            Err(HsmError::Protocol {
                operation: Operation::RandomBytes,
                ..
            })
        ));
    }

    #[test]
    fn device_failure_is_not_replaced_by_host_entropy() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        probe.fail_next(Operation::RandomBytes, -4);
        let result = s.random_bytes(16);
        assert!(matches!(
            result,
            Err(HsmError::Device {
                operation: Operation::RandomBytes,
                code: -4
            })
        ));
    }

    #[test]
    fn fill_random_chains_chunks() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        let mut buf = vec![0u8; READ_CHUNK_LEN * 2 + 10];
        s.fill_random(&mut buf).expect("fill_random should succeed");
        assert_eq!(probe.calls(), 3);
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn read_returns_requested_count() {
        let mut s = session();
        let mut buf = [0u8; 16];
        let n = s.read(&mut buf).expect("read should succeed");
        assert_eq!(n, 16);
    }

    #[test]
    fn read_caps_at_chunk_len_and_read_exact_loops() {
        let mut s = session();
        let mut buf = vec![0u8; READ_CHUNK_LEN + 1];
        let n = s.read(&mut buf).expect("read should succeed");
        assert_eq!(n, READ_CHUNK_LEN);
        s.read_exact(&mut buf).expect("read_exact should succeed");
    }

    #[test]
    fn read_empty_buffer_does_not_contact_device() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        let n = s.read(&mut []).expect("read should succeed");
        assert_eq!(n, 0);
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn read_on_closed_session_is_not_connected() {
        let mut s = session();
        s.close().expect("close should succeed");
        let err = s.read(&mut [0u8; 4]).expect_err("read should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn device_rng_fills_bytes() {
        let mut s = session();
        let mut rng = s.rng();
        let mut key = [0u8; 32];
        rng.try_fill_bytes(&mut key).expect("try_fill_bytes should succeed");
        assert!(key.iter().any(|&b| b != 0));
        let _ = rng.next_u64();
    }

    #[test]
    fn device_rng_reports_failure() {
        let mut s = session();
        let probe = s.transport().expect("open").probe();
        probe.fail_next(Operation::RandomBytes, -1);
        let mut rng = s.rng();
        assert!(rng.try_fill_bytes(&mut [0u8; 8]).is_err());
    }
}
