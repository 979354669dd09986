//! [`DeviceTransport`] over the vendor library.

use std::os::raw::{c_char, c_int};

use sceau_core::{DeviceFault, DeviceTransport, ExportMode, TimePrecision};

use crate::buffer::ForeignBuffer;
use crate::sys;

/// `-EINVAL`, reported for requests the C ABI cannot express.
const EINVAL: c_int = -22;

fn check(status: c_int) -> Result<(), DeviceFault> {
    if status < 0 {
        Err(DeviceFault::Status(status))
    } else {
        Ok(())
    }
}

fn c_len(len: usize) -> Result<c_int, DeviceFault> {
    c_int::try_from(len).map_err(|_| DeviceFault::Status(EINVAL))
}

/// One open handle to the Zymkey on this host.
pub struct ZymkeyTransport {
    ctx: sys::ZkCtx,
}

impl ZymkeyTransport {
    /// Open the device. Pass as the connector to `Session::open`.
    ///
    /// # Errors
    ///
    /// Returns the `zkOpen` status when the device is missing, busy, or
    /// not accessible. Always fails when built without `hardware`.
    pub fn connect() -> Result<Self, DeviceFault> {
        let mut ctx: sys::ZkCtx = std::ptr::null_mut();
        // SAFETY: `ctx` is a valid out-pointer for the duration of the call.
        check(unsafe { sys::zkOpen(&mut ctx) })?;
        tracing::debug!("zkOpen() succeeded");
        Ok(Self { ctx })
    }

    fn block_to_block(
        &mut self,
        input: &[u8],
        mode: ExportMode,
        unlock: bool,
    ) -> Result<Option<ForeignBuffer>, DeviceFault> {
        let src_len = c_len(input.len())?;
        let mut dst: *mut u8 = std::ptr::null_mut();
        let mut dst_len: c_int = 0;
        // SAFETY: `input` outlives the call; `dst`/`dst_len` are valid
        // out-pointers. The library allocates `dst` with malloc.
        let status = unsafe {
            if unlock {
                sys::zkUnlockDataB2B(
                    self.ctx,
                    input.as_ptr(),
                    src_len,
                    &mut dst,
                    &mut dst_len,
                    mode.uses_shared_key(),
                )
            } else {
                sys::zkLockDataB2B(
                    self.ctx,
                    input.as_ptr(),
                    src_len,
                    &mut dst,
                    &mut dst_len,
                    mode.uses_shared_key(),
                )
            }
        };
        // Take ownership first so the allocation is released on every path.
        let len = usize::try_from(dst_len).unwrap_or(0);
        // SAFETY: `dst` is null or a malloc'd block of `dst_len` bytes.
        let output = unsafe { ForeignBuffer::from_raw(dst, len) };
        check(status)?;
        Ok(output)
    }

    fn info_string(
        &mut self,
        call: unsafe extern "C" fn(sys::ZkCtx, *mut *mut c_char) -> c_int,
    ) -> Result<Option<ForeignBuffer>, DeviceFault> {
        let mut out: *mut c_char = std::ptr::null_mut();
        // SAFETY: `out` is a valid out-pointer; the library mallocs the string.
        let status = unsafe { call(self.ctx, &mut out) };
        // SAFETY: `out` is null or a malloc'd NUL-terminated string.
        let output = unsafe { ForeignBuffer::from_c_string(out) };
        check(status)?;
        Ok(output)
    }

    fn reading(
        &mut self,
        call: unsafe extern "C" fn(sys::ZkCtx, *mut f32) -> c_int,
    ) -> Result<f32, DeviceFault> {
        let mut value = f32::NAN;
        // SAFETY: `value` is a valid out-pointer.
        check(unsafe { call(self.ctx, &mut value) })?;
        Ok(value)
    }
}

impl DeviceTransport for ZymkeyTransport {
    type Staged = ForeignBuffer;

    fn close(&mut self) -> Result<(), DeviceFault> {
        // SAFETY: `ctx` came from a successful zkOpen and the owning session
        // calls close exactly once.
        check(unsafe { sys::zkClose(self.ctx) })
    }

    fn random_bytes(&mut self, len: usize) -> Result<Option<ForeignBuffer>, DeviceFault> {
        let requested = c_len(len)?;
        let mut out: *mut u8 = std::ptr::null_mut();
        // SAFETY: `out` is a valid out-pointer; the library mallocs `len` bytes.
        let status = unsafe { sys::zkGetRandBytes(self.ctx, &mut out, requested) };
        // SAFETY: `out` is null or a malloc'd block of `len` bytes.
        let output = unsafe { ForeignBuffer::from_raw(out, len) };
        check(status)?;
        Ok(output)
    }

    fn lock(
        &mut self,
        plaintext: &[u8],
        mode: ExportMode,
    ) -> Result<Option<ForeignBuffer>, DeviceFault> {
        self.block_to_block(plaintext, mode, false)
    }

    fn unlock(
        &mut self,
        envelope: &[u8],
        mode: ExportMode,
    ) -> Result<Option<ForeignBuffer>, DeviceFault> {
        self.block_to_block(envelope, mode, true)
    }

    fn time(&mut self, precision: TimePrecision) -> Result<u32, DeviceFault> {
        let mut secs: u32 = 0;
        let precise = matches!(precision, TimePrecision::Precise);
        // SAFETY: `secs` is a valid out-pointer.
        check(unsafe { sys::zkGetTime(self.ctx, &mut secs, precise) })?;
        Ok(secs)
    }

    fn model_number(&mut self) -> Result<Option<ForeignBuffer>, DeviceFault> {
        self.info_string(sys::zkGetModelNumberString)
    }

    fn firmware_version(&mut self) -> Result<Option<ForeignBuffer>, DeviceFault> {
        self.info_string(sys::zkGetFirmwareVersionString)
    }

    fn serial_number(&mut self) -> Result<Option<ForeignBuffer>, DeviceFault> {
        self.info_string(sys::zkGetSerialNumberString)
    }

    fn led_on(&mut self) -> Result<(), DeviceFault> {
        // SAFETY: valid open context.
        check(unsafe { sys::zkLEDOn(self.ctx) })
    }

    fn led_off(&mut self) -> Result<(), DeviceFault> {
        // SAFETY: valid open context.
        check(unsafe { sys::zkLEDOff(self.ctx) })
    }

    fn led_flash(&mut self, on_ms: u32, off_ms: u32, count: u32) -> Result<(), DeviceFault> {
        // SAFETY: valid open context.
        check(unsafe { sys::zkLEDFlash(self.ctx, on_ms, off_ms, count) })
    }

    fn cpu_temperature(&mut self) -> Result<f32, DeviceFault> {
        self.reading(sys::zkGetCPUTemp)
    }

    fn battery_voltage(&mut self) -> Result<f32, DeviceFault> {
        self.reading(sys::zkGetBatteryVoltage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_status_is_fault() {
        assert_eq!(check(-3), Err(DeviceFault::Status(-3)));
        assert_eq!(check(0), Ok(()));
        assert_eq!(check(7), Ok(()));
    }

    #[test]
    fn oversized_request_is_invalid() {
        assert!(c_len(usize::MAX).is_err());
        assert_eq!(c_len(4096), Ok(4096));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn connect_without_hardware_reports_no_device() {
        let result = ZymkeyTransport::connect();
        assert!(matches!(result, Err(DeviceFault::Status(sys::ENODEV))));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn session_open_without_hardware_is_unavailable() {
        let result = sceau_core::Session::open(ZymkeyTransport::connect);
        assert!(matches!(
            result,
            Err(sceau_core::HsmError::DeviceUnavailable { code: -19 })
        ));
    }
}
