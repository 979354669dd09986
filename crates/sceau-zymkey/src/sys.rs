//! Raw bindings to the vendor `zk_app_utils` library.
//!
//! With the `hardware` feature the symbols are linked from the system
//! library. Without it every entry point reports `-ENODEV`, so the rest of
//! the crate compiles and behaves as "no device present" on any host.

#![allow(non_snake_case, clippy::missing_safety_doc)]

use std::os::raw::{c_char, c_int};

/// Opaque vendor context handle.
pub type ZkCtx = *mut std::ffi::c_void;

/// Status returned by the fallback bindings.
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub const ENODEV: c_int = -19;

#[cfg(feature = "hardware")]
#[link(name = "zk_app_utils")]
extern "C" {
    pub fn zkOpen(ctx: *mut ZkCtx) -> c_int;
    pub fn zkClose(ctx: ZkCtx) -> c_int;
    pub fn zkGetRandBytes(ctx: ZkCtx, rdata: *mut *mut u8, rdata_sz: c_int) -> c_int;
    pub fn zkLockDataB2B(
        ctx: ZkCtx,
        src: *const u8,
        src_size: c_int,
        dst: *mut *mut u8,
        dst_size: *mut c_int,
        use_shared_key: bool,
    ) -> c_int;
    pub fn zkUnlockDataB2B(
        ctx: ZkCtx,
        src: *const u8,
        src_size: c_int,
        dst: *mut *mut u8,
        dst_size: *mut c_int,
        use_shared_key: bool,
    ) -> c_int;
    pub fn zkGetTime(ctx: ZkCtx, epoch_time_sec: *mut u32, precise_time: bool) -> c_int;
    pub fn zkGetModelNumberString(ctx: ZkCtx, model_str: *mut *mut c_char) -> c_int;
    pub fn zkGetFirmwareVersionString(ctx: ZkCtx, version_str: *mut *mut c_char) -> c_int;
    pub fn zkGetSerialNumberString(ctx: ZkCtx, serial_str: *mut *mut c_char) -> c_int;
    pub fn zkLEDOn(ctx: ZkCtx) -> c_int;
    pub fn zkLEDOff(ctx: ZkCtx) -> c_int;
    pub fn zkLEDFlash(ctx: ZkCtx, on_ms: u32, off_ms: u32, num_flashes: u32) -> c_int;
    pub fn zkGetCPUTemp(ctx: ZkCtx, cpu_temp: *mut f32) -> c_int;
    pub fn zkGetBatteryVoltage(ctx: ZkCtx, batt_voltage: *mut f32) -> c_int;
}

#[cfg(not(feature = "hardware"))]
pub use fallback::*;

#[cfg(not(feature = "hardware"))]
mod fallback {
    use super::{c_char, c_int, ZkCtx, ENODEV};

    pub unsafe extern "C" fn zkOpen(_ctx: *mut ZkCtx) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkClose(_ctx: ZkCtx) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetRandBytes(_ctx: ZkCtx, _rdata: *mut *mut u8, _rdata_sz: c_int) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkLockDataB2B(
        _ctx: ZkCtx,
        _src: *const u8,
        _src_size: c_int,
        _dst: *mut *mut u8,
        _dst_size: *mut c_int,
        _use_shared_key: bool,
    ) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkUnlockDataB2B(
        _ctx: ZkCtx,
        _src: *const u8,
        _src_size: c_int,
        _dst: *mut *mut u8,
        _dst_size: *mut c_int,
        _use_shared_key: bool,
    ) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetTime(_ctx: ZkCtx, _epoch_time_sec: *mut u32, _precise_time: bool) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetModelNumberString(_ctx: ZkCtx, _model_str: *mut *mut c_char) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetFirmwareVersionString(_ctx: ZkCtx, _version_str: *mut *mut c_char) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetSerialNumberString(_ctx: ZkCtx, _serial_str: *mut *mut c_char) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkLEDOn(_ctx: ZkCtx) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkLEDOff(_ctx: ZkCtx) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkLEDFlash(_ctx: ZkCtx, _on_ms: u32, _off_ms: u32, _num_flashes: u32) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetCPUTemp(_ctx: ZkCtx, _cpu_temp: *mut f32) -> c_int {
        ENODEV
    }
    pub unsafe extern "C" fn zkGetBatteryVoltage(_ctx: ZkCtx, _batt_voltage: *mut f32) -> c_int {
        ENODEV
    }
}
