//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sceau_core::ExportMode;

/// SCEAU — talk to a hardware security module from the shell.
#[derive(Parser, Debug)]
#[command(name = "sceau")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use the simulated element regardless of the configured backend
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(flatten)]
    Device(DeviceCommand),

    /// Inspect or create the settings file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that open a device session.
#[derive(Subcommand, Debug, Clone)]
pub enum DeviceCommand {
    /// Print random bytes from the device
    Random {
        /// Number of bytes
        len: usize,

        /// Output encoding
        #[arg(long, short, value_enum, default_value_t = RandomFormat::Hex)]
        format: RandomFormat,
    },

    /// Protect a buffer; writes an envelope file
    Lock(EnvelopeArgs),

    /// Recover a buffer from an envelope file
    Unlock(EnvelopeArgs),

    /// Read the device clock
    Time {
        /// Return the cached clock value instead of synchronizing
        #[arg(long)]
        cached: bool,
    },

    /// Print model, firmware version, and serial number
    Info,

    /// Drive the status LED
    #[command(subcommand)]
    Led(LedCommand),

    /// Print CPU temperature and battery voltage
    Sensors,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EnvelopeArgs {
    /// Key selection: buffer-bound (shared) or device-bound
    #[arg(long, short)]
    pub mode: ExportMode,

    /// Input file (stdin when omitted or "-")
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Output file (stdout when omitted or "-")
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomFormat {
    Hex,
    Base64,
    /// Unencoded bytes
    Raw,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum LedCommand {
    On,
    Off,
    Flash {
        /// Milliseconds on per cycle
        #[arg(long, default_value_t = 500)]
        on_ms: u64,

        /// Milliseconds off per cycle
        #[arg(long, default_value_t = 500)]
        off_ms: u64,

        /// Number of flashes (0 = until the next LED command)
        #[arg(long, default_value_t = 0)]
        count: u32,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show,

    /// Write default settings to the settings path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lock_with_mode() {
        let cli = Cli::try_parse_from([
            "sceau", "--simulate", "lock", "--mode", "device-bound", "-i", "plain.bin",
        ])
        .unwrap();
        assert!(cli.simulate);
        let Command::Device(DeviceCommand::Lock(args)) = cli.command else {
            panic!("expected lock");
        };
        assert_eq!(args.mode, ExportMode::DeviceBound);
        assert_eq!(args.input, Some(PathBuf::from("plain.bin")));
        assert!(args.output.is_none());
    }

    #[test]
    fn lock_requires_mode() {
        assert!(Cli::try_parse_from(["sceau", "lock"]).is_err());
        assert!(Cli::try_parse_from(["sceau", "unlock", "--mode", "shared"]).is_err());
    }

    #[test]
    fn random_defaults_to_hex() {
        let cli = Cli::try_parse_from(["sceau", "random", "32"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Device(DeviceCommand::Random {
                len: 32,
                format: RandomFormat::Hex
            })
        ));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sceau", "config", "show", "-v", "-c", "x.json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.json")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Show)));
    }

    #[test]
    fn led_flash_defaults() {
        let cli = Cli::try_parse_from(["sceau", "led", "flash", "--count", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Device(DeviceCommand::Led(LedCommand::Flash {
                on_ms: 500,
                off_ms: 500,
                count: 3
            }))
        ));
    }
}
