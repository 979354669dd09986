//! Backend selection: the Zymkey transport or the simulated element.

use std::io::Write;

use anyhow::Context;
use sceau_core::{Session, SimulatedElement, SimulatedFleet};
use sceau_zymkey::ZymkeyTransport;

use crate::cli::DeviceCommand;
use crate::commands;
use crate::config::{Backend, SimulatorSettings};

/// An open session on whichever backend was selected.
pub enum Device {
    Zymkey(Session<ZymkeyTransport>),
    Simulated(Session<SimulatedElement>),
}

impl Device {
    /// Open a session on `backend`.
    ///
    /// # Errors
    ///
    /// Device unavailable, or invalid simulator settings.
    pub fn open(backend: Backend, simulator: &SimulatorSettings) -> anyhow::Result<Self> {
        match backend {
            Backend::Zymkey => {
                let session = Session::open(ZymkeyTransport::connect).with_context(|| {
                    if sceau_zymkey::hardware_enabled() {
                        "cannot open the Zymkey (is it bound and is the daemon running?)"
                    } else {
                        "this build has no hardware support; rebuild with --features hardware \
                         or pass --simulate"
                    }
                })?;
                Ok(Self::Zymkey(session))
            }
            Backend::Simulated => Ok(Self::Simulated(open_simulated(simulator)?)),
        }
    }

    /// Run one device command against the open session.
    ///
    /// # Errors
    ///
    /// The command's error.
    pub fn execute(&mut self, command: &DeviceCommand, out: &mut dyn Write) -> anyhow::Result<()> {
        match self {
            Self::Zymkey(session) => commands::execute(session, command, out),
            Self::Simulated(session) => commands::execute(session, command, out),
        }
    }

    /// Release the device handle.
    ///
    /// # Errors
    ///
    /// The release call's error; the session is closed regardless.
    pub fn close(self) -> anyhow::Result<()> {
        let result = match self {
            Self::Zymkey(mut session) => session.close(),
            Self::Simulated(mut session) => session.close(),
        };
        result.context("closing device session")
    }
}

fn open_simulated(settings: &SimulatorSettings) -> anyhow::Result<Session<SimulatedElement>> {
    let fleet = match settings.seed()? {
        Some(seed) => SimulatedFleet::from_seed(&seed),
        None => {
            tracing::warn!("no simulator seed configured; envelopes will not outlive this run");
            SimulatedFleet::random()
        }
    };
    let session = Session::open(|| {
        fleet
            .connect(&settings.serial)
            .map(|e| e.with_sensors(settings.cpu_temperature, settings.battery_voltage))
    })?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SimulatorSettings {
        SimulatorSettings {
            seed_hex: Some("000102030405060708090a0b0c0d0e0f".into()),
            ..SimulatorSettings::default()
        }
    }

    #[test]
    fn simulated_backend_opens() {
        let device = Device::open(Backend::Simulated, &seeded()).unwrap();
        assert!(matches!(device, Device::Simulated(ref s) if s.is_open()));
        device.close().unwrap();
    }

    #[test]
    fn simulated_backend_uses_configured_serial() {
        let settings = SimulatorSettings {
            serial: "SIM-CONF".into(),
            ..seeded()
        };
        let Device::Simulated(session) = Device::open(Backend::Simulated, &settings).unwrap()
        else {
            panic!("expected simulated backend");
        };
        assert_eq!(session.transport().unwrap().serial(), "SIM-CONF");
    }

    #[test]
    fn malformed_seed_is_rejected() {
        let settings = SimulatorSettings {
            seed_hex: Some("xyz".into()),
            ..SimulatorSettings::default()
        };
        assert!(Device::open(Backend::Simulated, &settings).is_err());
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn zymkey_backend_without_hardware_fails_with_hint() {
        let err = Device::open(Backend::Zymkey, &seeded()).err().unwrap();
        assert!(format!("{err:#}").contains("--simulate"));
    }
}
