//! `sceau time`, `info`, `led`, `sensors`.

use std::io::Write;
use std::time::Duration;

use sceau_core::{DeviceTransport, LedFlash, Session, TimePrecision};
use serde::{Deserialize, Serialize};

use super::write_json;
use crate::cli::LedCommand;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDto {
    pub epoch_seconds: u32,
    pub precise: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsDto {
    pub cpu_temperature_celsius: f32,
    pub battery_voltage: f32,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// # Errors
///
/// Device or I/O errors.
pub fn time<T: DeviceTransport>(
    session: &mut Session<T>,
    cached: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let precision = if cached {
        TimePrecision::Cached
    } else {
        TimePrecision::Precise
    };
    let now = session.now_with(precision)?;
    write_json(
        out,
        &TimeDto {
            epoch_seconds: now.as_secs(),
            precise: !cached,
        },
    )
}

/// # Errors
///
/// Device or I/O errors.
pub fn info<T: DeviceTransport>(session: &mut Session<T>, out: &mut dyn Write) -> anyhow::Result<()> {
    write_json(out, &session.device_info()?)
}

/// # Errors
///
/// Device errors, or zero flash durations.
pub fn led<T: DeviceTransport>(session: &mut Session<T>, command: LedCommand) -> anyhow::Result<()> {
    match command {
        LedCommand::On => session.led_on()?,
        LedCommand::Off => session.led_off()?,
        LedCommand::Flash {
            on_ms,
            off_ms,
            count,
        } => session.led_flash(LedFlash {
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
            count,
        })?,
    }
    Ok(())
}

/// # Errors
///
/// Device or I/O errors.
pub fn sensors<T: DeviceTransport>(
    session: &mut Session<T>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let dto = SensorsDto {
        cpu_temperature_celsius: session.cpu_temperature()?,
        battery_voltage: session.battery_voltage()?,
    };
    write_json(out, &dto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceau_core::{DeviceInfo, HsmError, LedState, SimulatedElement, SimulatedFleet};

    fn session() -> Session<SimulatedElement> {
        let element = SimulatedFleet::from_seed(b"cli device")
            .element("SIM-CLI")
            .with_sensors(40.5, 3.0);
        Session::from_transport(element)
    }

    #[test]
    fn info_prints_device_info() {
        let mut out = Vec::new();
        info(&mut session(), &mut out).unwrap();
        let parsed: DeviceInfo = serde_json::from_slice(&out).unwrap();
        insta::assert_json_snapshot!(parsed, @r###"
        {
          "model": "SIM-ZK4i",
          "firmwareVersion": "sim-0.1.0",
          "serialNumber": "SIM-CLI"
        }
        "###);
    }

    #[test]
    fn time_reports_precision() {
        let mut out = Vec::new();
        time(&mut session(), true, &mut out).unwrap();
        let parsed: TimeDto = serde_json::from_slice(&out).unwrap();
        assert!(!parsed.precise);
        assert!(parsed.epoch_seconds > 1_600_000_000);
    }

    #[test]
    fn sensors_use_camel_case() {
        let mut out = Vec::new();
        sensors(&mut session(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["cpuTemperatureCelsius"], 40.5);
        assert_eq!(value["batteryVoltage"], 3.0);
    }

    #[test]
    fn led_commands_drive_the_element() {
        let mut s = session();
        let probe = s.transport().unwrap().probe();
        led(&mut s, LedCommand::On).unwrap();
        assert_eq!(probe.led(), LedState::On);
        led(
            &mut s,
            LedCommand::Flash {
                on_ms: 100,
                off_ms: 200,
                count: 3,
            },
        )
        .unwrap();
        assert_eq!(
            probe.led(),
            LedState::Flashing {
                on_ms: 100,
                off_ms: 200,
                count: 3
            }
        );
        led(&mut s, LedCommand::Off).unwrap();
        assert_eq!(probe.led(), LedState::Off);
    }

    #[test]
    fn zero_flash_duration_is_rejected() {
        let err = led(
            &mut session(),
            LedCommand::Flash {
                on_ms: 0,
                off_ms: 100,
                count: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HsmError>(),
            Some(HsmError::InvalidArgument(_))
        ));
    }
}
