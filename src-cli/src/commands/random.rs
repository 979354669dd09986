//! `sceau random` — device entropy on stdout.

use std::io::Write;

use data_encoding::{BASE64, HEXLOWER};
use sceau_core::{DeviceTransport, Session};
use zeroize::Zeroizing;

use crate::cli::RandomFormat;

/// # Errors
///
/// Device or I/O errors.
pub fn run<T: DeviceTransport>(
    session: &mut Session<T>,
    len: usize,
    format: RandomFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let bytes = Zeroizing::new(session.random_bytes(len)?);
    match format {
        RandomFormat::Hex => writeln!(out, "{}", HEXLOWER.encode(&bytes))?,
        RandomFormat::Base64 => writeln!(out, "{}", BASE64.encode(&bytes))?,
        RandomFormat::Raw => out.write_all(&bytes)?,
    }
    out.flush()?;
    Ok(())
}
