//! Device transport boundary — the request/response calls the core consumes.
//!
//! A transport owns the low-level handle to one secure element. Every call
//! either succeeds or reports a [`DeviceFault`]. Calls that produce data hand
//! back a *staged* buffer ([`DeviceTransport::Staged`]): memory that still
//! belongs to the transport until the core has copied it out. Dropping the
//! staged value releases it (the hardware transport zeroizes and frees the
//! foreign allocation).
//!
//! `Ok(None)` from a data-producing call means the device reported success
//! but produced no output; the core turns that into a protocol error.
//!
//! Transports are not assumed reentrant. Every method takes `&mut self`, so a
//! transport owned by a [`Session`](crate::session::Session) can only be
//! driven by one caller at a time.

use crate::envelope::ExportMode;
use crate::error::DeviceFault;

/// Device clock read mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimePrecision {
    /// Return the last cached clock value (fast).
    Cached,
    /// Synchronize with the device clock before returning (slower).
    #[default]
    Precise,
}

/// Low-level channel to one secure element.
pub trait DeviceTransport {
    /// Transport-owned output memory. Released on drop.
    type Staged: AsRef<[u8]>;

    /// Release the device handle. Called exactly once by the owning session.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status if the release call fails.
    fn close(&mut self) -> Result<(), DeviceFault>;

    /// Request `len` random bytes from the device entropy source.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn random_bytes(&mut self, len: usize) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Protect `plaintext` under the device key selected by `mode`.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn lock(
        &mut self,
        plaintext: &[u8],
        mode: ExportMode,
    ) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Recover the plaintext of `envelope` under the key selected by `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceFault::Rejected`] when the device can tell the envelope
    /// was not produced under this key, otherwise the failure status.
    fn unlock(
        &mut self,
        envelope: &[u8],
        mode: ExportMode,
    ) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Read the device clock as seconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn time(&mut self, precision: TimePrecision) -> Result<u32, DeviceFault>;

    /// Model number string (may be NUL-terminated).
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn model_number(&mut self) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Firmware version string (may be NUL-terminated).
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn firmware_version(&mut self) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Serial number string (may be NUL-terminated).
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn serial_number(&mut self) -> Result<Option<Self::Staged>, DeviceFault>;

    /// Turn the status LED on.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn led_on(&mut self) -> Result<(), DeviceFault>;

    /// Turn the status LED off.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn led_off(&mut self) -> Result<(), DeviceFault>;

    /// Flash the LED `count` times (`0` = until the next LED command).
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn led_flash(&mut self, on_ms: u32, off_ms: u32, count: u32) -> Result<(), DeviceFault>;

    /// CPU temperature in degrees Celsius.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn cpu_temperature(&mut self) -> Result<f32, DeviceFault>;

    /// Backup battery voltage in volts.
    ///
    /// # Errors
    ///
    /// Returns the device's failure status.
    fn battery_voltage(&mut self) -> Result<f32, DeviceFault>;
}

/// Copy a staged device buffer into caller-owned memory, then release it.
///
/// The staged value is dropped before this returns, on every path.
#[must_use]
pub fn copy_then_release<S: AsRef<[u8]>>(staged: S) -> Vec<u8> {
    let owned = staged.as_ref().to_vec();
    drop(staged);
    owned
}
