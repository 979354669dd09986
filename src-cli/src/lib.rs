//! `sceau` — command-line front end for `sceau-core`.
//!
//! One invocation opens at most one device session, runs one command, and
//! closes the session before exiting (also on error paths).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

use std::path::Path;

use anyhow::Context;

use backend::Device;
use cli::{Cli, Command};
use config::{Backend, ConfigError, Settings};

/// Settings at `path`, or the defaults plus the reason the file was not
/// usable. The caller reports the error once logging is up.
fn load_settings(path: Option<&Path>) -> (Settings, Option<ConfigError>) {
    match path.map(Settings::try_load) {
        Some(Ok(settings)) => (settings, None),
        Some(Err(e)) => (Settings::default(), Some(e)),
        None => (Settings::default(), None),
    }
}

/// Run a parsed command line.
///
/// # Errors
///
/// Any configuration, device, or I/O failure, with context.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let core_dumps = sceau_core::disable_core_dumps();

    let settings_path = cli.config.clone().or_else(Settings::default_path);
    let (settings, settings_error) = load_settings(settings_path.as_deref());
    let _log_guard = logging::init(cli.verbose, &settings)?;

    if let Some(e) = settings_error {
        tracing::warn!("ignoring settings file: {e}");
    }
    if let Err(e) = core_dumps {
        tracing::warn!("could not disable core dumps: {e}");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Config(command) => {
            commands::config::run(command, settings_path.as_deref(), &settings, &mut out)
        }
        Command::Device(command) => {
            settings.validate().context("invalid settings")?;
            let backend = if cli.simulate {
                Backend::Simulated
            } else {
                settings.backend
            };
            tracing::debug!(?backend, "opening device session");

            let mut device = Device::open(backend, &settings.simulator)?;
            let result = device.execute(&command, &mut out);
            let closed = device.close();
            match (result, closed) {
                (Err(e), Err(close_err)) => {
                    tracing::warn!("{close_err:#}");
                    Err(e)
                }
                (Err(e), Ok(())) => Err(e),
                (Ok(()), closed) => closed,
            }
        }
    }
}
