//! CLI settings — a small JSON document read before any device is opened.
//!
//! Nothing secret lives here. In particular there is no default export
//! mode: every lock/unlock names its mode on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SETTINGS_DIR: &str = "sceau";
const SETTINGS_FILE: &str = "settings.json";

/// Minimum simulator seed length accepted by [`Settings::validate`].
pub const MIN_SEED_LEN: usize = 16;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown log level {0:?} (expected one of trace, debug, info, warn, error)")]
    LogLevel(String),
    #[error("simulator.seedHex is not valid hex")]
    SeedEncoding,
    #[error("simulator.seedHex must decode to at least {MIN_SEED_LEN} bytes")]
    SeedTooShort,
    #[error("simulator.serial must not be empty")]
    EmptySerial,
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ── Settings ───────────────────────────────────────────────────────

/// Which device transport a command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Zymkey,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,

    /// `tracing` level used when neither `--verbose` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// When set, logs go to a daily rolling file here instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub simulator: SimulatorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            log_level: default_log_level(),
            log_dir: None,
            simulator: SimulatorSettings::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

/// Parameters of the simulated element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorSettings {
    /// Fleet seed. Without one every run gets fresh keys, so envelopes do
    /// not survive the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_hex: Option<String>,

    #[serde(default = "default_serial")]
    pub serial: String,

    #[serde(default = "default_cpu_temperature")]
    pub cpu_temperature: f32,

    #[serde(default = "default_battery_voltage")]
    pub battery_voltage: f32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            seed_hex: None,
            serial: default_serial(),
            cpu_temperature: default_cpu_temperature(),
            battery_voltage: default_battery_voltage(),
        }
    }
}

fn default_serial() -> String {
    "SIM-0001".into()
}
const fn default_cpu_temperature() -> f32 {
    42.0
}
const fn default_battery_voltage() -> f32 {
    3.1
}

impl SimulatorSettings {
    /// Decoded fleet seed, if configured.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SeedEncoding`] or [`ConfigError::SeedTooShort`].
    pub fn seed(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let Some(hex) = self.seed_hex.as_deref() else {
            return Ok(None);
        };
        let seed = data_encoding::HEXLOWER_PERMISSIVE
            .decode(hex.trim().as_bytes())
            .map_err(|_| ConfigError::SeedEncoding)?;
        if seed.len() < MIN_SEED_LEN {
            return Err(ConfigError::SeedTooShort);
        }
        Ok(Some(seed))
    }
}

// ── File I/O ───────────────────────────────────────────────────────

impl Settings {
    /// `{config_dir}/sceau/settings.json`, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load settings from `path`. A missing file yields the defaults, and
    /// missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file exists but cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Settings::try_load`], but falls back to the defaults silently.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_default()
    }

    /// Persist settings to `path` (write to a temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the parent directory does not exist or
    /// the write/rename fails.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// The first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::LogLevel(self.log_level.clone()));
        }
        if self.simulator.serial.trim().is_empty() {
            return Err(ConfigError::EmptySerial);
        }
        self.simulator.seed()?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
