//! Subcommand implementations.
//!
//! Structured results are written as pretty JSON DTOs with camelCase keys.
//! Byte payloads (random bytes, recovered plaintext) are written as-is.

pub mod config;
pub mod device;
pub mod envelope;
pub mod random;

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use sceau_core::{DeviceTransport, Session};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::cli::DeviceCommand;

/// Dispatch one device command.
///
/// # Errors
///
/// Device, protocol, or I/O errors from the command.
pub fn execute<T: DeviceTransport>(
    session: &mut Session<T>,
    command: &DeviceCommand,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        DeviceCommand::Random { len, format } => random::run(session, *len, *format, out),
        DeviceCommand::Lock(args) => envelope::lock(session, args, out),
        DeviceCommand::Unlock(args) => envelope::unlock(session, args, out),
        DeviceCommand::Time { cached } => device::time(session, *cached, out),
        DeviceCommand::Info => device::info(session, out),
        DeviceCommand::Led(led) => device::led(session, *led),
        DeviceCommand::Sensors => device::sensors(session, out),
    }
}

// ── I/O helpers ────────────────────────────────────────────────────

fn is_stdio(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == "-")
}

pub(crate) fn write_json<S: Serialize>(out: &mut dyn Write, value: &S) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Read a file, or stdin for `None`/`-`.
pub(crate) fn read_input(path: Option<&Path>) -> anyhow::Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::new());
    match path {
        Some(p) if !is_stdio(path) => {
            fs::File::open(p)
                .and_then(|mut f| f.read_to_end(&mut buf))
                .with_context(|| format!("cannot read {}", p.display()))?;
        }
        _ => {
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("cannot read stdin")?;
        }
    }
    Ok(buf)
}

/// Write to a file (owner-only on Unix), or to `out` for `None`/`-`.
pub(crate) fn write_output(
    path: Option<&Path>,
    bytes: &[u8],
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match path {
        Some(p) if !is_stdio(path) => {
            let mut options = fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            options
                .open(p)
                .and_then(|mut f| f.write_all(bytes))
                .with_context(|| format!("cannot write {}", p.display()))?;
        }
        _ => {
            out.write_all(bytes)?;
            out.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dash_means_stdio() {
        assert!(is_stdio(None));
        assert!(is_stdio(Some(Path::new("-"))));
        assert!(!is_stdio(Some(Path::new("out.bin"))));
    }

    #[test]
    fn write_output_to_file_and_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");
        let mut sink = Vec::new();
        write_output(Some(&path), b"payload", &mut sink).unwrap();
        assert!(sink.is_empty());
        assert_eq!(read_input(Some(&path)).unwrap().as_slice(), b"payload");
    }

    #[test]
    fn write_output_without_path_uses_sink() {
        let mut sink = Vec::new();
        write_output(None, b"payload", &mut sink).unwrap();
        assert_eq!(sink, b"payload");
    }

    #[test]
    fn missing_input_names_the_file() {
        let err = read_input(Some(Path::new("/nonexistent/sceau-input"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sceau-input"));
    }
}
