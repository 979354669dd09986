//! Auxiliary device operations: identity strings, status LED, sensors, clock.
//!
//! Each is a single request/response with no protocol state. They share the
//! session guard: a closed session fails with [`HsmError::SessionClosed`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{HsmError, Operation};
use crate::session::Session;
use crate::transport::{copy_then_release, DeviceTransport, TimePrecision};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Seconds since the Unix epoch, as read from the device clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u32);

impl Timestamp {
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// `None` if the platform's `SystemTime` cannot represent the instant.
    #[must_use]
    pub fn to_system_time(self) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(Duration::from_secs(u64::from(self.0)))
    }
}

/// Identity strings reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub firmware_version: String,
    pub serial_number: String,
}

/// LED flash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedFlash {
    /// Time the LED stays on per cycle.
    pub on: Duration,
    /// Time the LED stays off per cycle.
    pub off: Duration,
    /// Number of cycles; `0` flashes until the next LED command.
    pub count: u32,
}

impl LedFlash {
    fn to_millis(self) -> Result<(u32, u32), HsmError> {
        if self.on.is_zero() || self.off.is_zero() {
            return Err(HsmError::InvalidArgument(
                "LED on/off durations must be non-zero".into(),
            ));
        }
        let clamp = |d: Duration| u32::try_from(d.as_millis()).unwrap_or(u32::MAX);
        Ok((clamp(self.on).max(1), clamp(self.off).max(1)))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl<T: DeviceTransport> Session<T> {
    /// Read the device clock in precise mode.
    ///
    /// # Errors
    ///
    /// [`HsmError::SessionClosed`] or [`HsmError::Device`].
    pub fn now(&mut self) -> Result<Timestamp, HsmError> {
        self.now_with(TimePrecision::Precise)
    }

    /// Read the device clock with the given precision.
    ///
    /// # Errors
    ///
    /// [`HsmError::SessionClosed`] or [`HsmError::Device`].
    pub fn now_with(&mut self, precision: TimePrecision) -> Result<Timestamp, HsmError> {
        let transport = self.transport_mut()?;
        tracing::debug!(?precision, "{}()", Operation::Time);
        transport
            .time(precision)
            .map(Timestamp)
            .map_err(|fault| HsmError::from_fault(Operation::Time, fault))
    }

    /// # Errors
    ///
    /// [`HsmError::SessionClosed`], [`HsmError::Device`], or
    /// [`HsmError::Protocol`] for a missing or non-UTF-8 string.
    pub fn model_number(&mut self) -> Result<String, HsmError> {
        self.info_string(Operation::ModelNumber, T::model_number)
    }

    /// # Errors
    ///
    /// Same as [`Session::model_number`].
    pub fn firmware_version(&mut self) -> Result<String, HsmError> {
        self.info_string(Operation::FirmwareVersion, T::firmware_version)
    }

    /// # Errors
    ///
    /// Same as [`Session::model_number`].
    pub fn serial_number(&mut self) -> Result<String, HsmError> {
        self.info_string(Operation::SerialNumber, T::serial_number)
    }

    /// Query model, firmware version, and serial number.
    ///
    /// # Errors
    ///
    /// The first failing query's error.
    pub fn device_info(&mut self) -> Result<DeviceInfo, HsmError> {
        Ok(DeviceInfo {
            model: self.model_number()?,
            firmware_version: self.firmware_version()?,
            serial_number: self.serial_number()?,
        })
    }

    /// # Errors
    ///
    /// [`HsmError::SessionClosed`] or [`HsmError::Device`].
    pub fn led_on(&mut self) -> Result<(), HsmError> {
        let transport = self.transport_mut()?;
        tracing::debug!("{}()", Operation::LedOn);
        transport
            .led_on()
            .map_err(|fault| HsmError::from_fault(Operation::LedOn, fault))
    }

    /// # Errors
    ///
    /// [`HsmError::SessionClosed`] or [`HsmError::Device`].
    pub fn led_off(&mut self) -> Result<(), HsmError> {
        let transport = self.transport_mut()?;
        tracing::debug!("{}()", Operation::LedOff);
        transport
            .led_off()
            .map_err(|fault| HsmError::from_fault(Operation::LedOff, fault))
    }

    /// Flash the LED. Durations above `u32::MAX` milliseconds saturate.
    ///
    /// # Errors
    ///
    /// [`HsmError::InvalidArgument`] for a zero on/off duration, otherwise
    /// [`HsmError::SessionClosed`] or [`HsmError::Device`].
    pub fn led_flash(&mut self, pattern: LedFlash) -> Result<(), HsmError> {
        let (on_ms, off_ms) = pattern.to_millis()?;
        let transport = self.transport_mut()?;
        tracing::debug!(on_ms, off_ms, count = pattern.count, "{}()", Operation::LedFlash);
        transport
            .led_flash(on_ms, off_ms, pattern.count)
            .map_err(|fault| HsmError::from_fault(Operation::LedFlash, fault))
    }

    /// CPU temperature in degrees Celsius.
    ///
    /// # Errors
    ///
    /// [`HsmError::SessionClosed`], [`HsmError::Device`], or
    /// [`HsmError::Protocol`] for a non-finite reading.
    pub fn cpu_temperature(&mut self) -> Result<f32, HsmError> {
        self.sensor(Operation::CpuTemperature, T::cpu_temperature)
    }

    /// Backup battery voltage in volts.
    ///
    /// # Errors
    ///
    /// Same as [`Session::cpu_temperature`].
    pub fn battery_voltage(&mut self) -> Result<f32, HsmError> {
        self.sensor(Operation::BatteryVoltage, T::battery_voltage)
    }

    fn info_string<F>(&mut self, operation: Operation, call: F) -> Result<String, HsmError>
    where
        F: FnOnce(&mut T) -> Result<Option<T::Staged>, crate::error::DeviceFault>,
    {
        let transport = self.transport_mut()?;
        tracing::debug!("{operation}()");
        let staged = call(transport)
            .map_err(|fault| HsmError::from_fault(operation, fault))?
            .ok_or_else(|| HsmError::protocol(operation, "no output string"))?;
        let raw = copy_then_release(staged);

        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = std::str::from_utf8(&raw[..end])
            .map_err(|e| HsmError::protocol(operation, format!("invalid UTF-8: {e}")))?;
        Ok(text.trim().to_owned())
    }

    fn sensor<F>(&mut self, operation: Operation, call: F) -> Result<f32, HsmError>
    where
        F: FnOnce(&mut T) -> Result<f32, crate::error::DeviceFault>,
    {
        let transport = self.transport_mut()?;
        tracing::debug!("{operation}()");
        let value = call(transport).map_err(|fault| HsmError::from_fault(operation, fault))?;
        if !value.is_finite() {
            return Err(HsmError::protocol(operation, "non-finite reading"));
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
