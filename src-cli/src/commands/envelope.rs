//! `sceau lock` / `sceau unlock` — envelope files.
//!
//! An envelope file is JSON: the format version, the export mode the
//! envelope was locked with, and the device's envelope bytes in base64.
//! Unlock requires `--mode` and refuses a file recorded under the other
//! mode before contacting the device.

use std::io::Write;

use anyhow::{bail, Context};
use data_encoding::BASE64;
use sceau_core::{DeviceTransport, Envelope, ExportMode, Session};
use serde::{Deserialize, Serialize};

use super::{read_input, write_output};
use crate::cli::EnvelopeArgs;

pub const ENVELOPE_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeFileDto {
    pub version: u32,
    pub mode: ExportMode,
    /// Base64 of the device-produced envelope bytes.
    pub envelope: String,
}

impl From<&Envelope> for EnvelopeFileDto {
    fn from(envelope: &Envelope) -> Self {
        Self {
            version: ENVELOPE_FILE_VERSION,
            mode: envelope.mode(),
            envelope: BASE64.encode(envelope.as_bytes()),
        }
    }
}

impl EnvelopeFileDto {
    /// # Errors
    ///
    /// Unsupported version or invalid base64.
    pub fn into_envelope(self) -> anyhow::Result<Envelope> {
        if self.version != ENVELOPE_FILE_VERSION {
            bail!("unsupported envelope file version {}", self.version);
        }
        let bytes = BASE64
            .decode(self.envelope.as_bytes())
            .context("envelope field is not valid base64")?;
        Ok(Envelope::from_parts(self.mode, bytes))
    }
}

/// # Errors
///
/// I/O or device errors.
pub fn lock<T: DeviceTransport>(
    session: &mut Session<T>,
    args: &EnvelopeArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let plaintext = read_input(args.input.as_deref())?;
    let envelope = session.lock(&plaintext, args.mode)?;
    tracing::info!(
        mode = %args.mode,
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "buffer locked"
    );

    let mut json = serde_json::to_vec_pretty(&EnvelopeFileDto::from(&envelope))?;
    json.push(b'\n');
    write_output(args.output.as_deref(), &json, out)
}

/// # Errors
///
/// Mode mismatch, malformed file, I/O, or device errors.
pub fn unlock<T: DeviceTransport>(
    session: &mut Session<T>,
    args: &EnvelopeArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let raw = read_input(args.input.as_deref())?;
    let file: EnvelopeFileDto =
        serde_json::from_slice(&raw).context("input is not an envelope file")?;
    let envelope = file.into_envelope()?;
    if envelope.mode() != args.mode {
        bail!(
            "envelope was locked {}, not {}",
            envelope.mode(),
            args.mode
        );
    }

    let plaintext = session.unlock_envelope(&envelope)?;
    tracing::info!(mode = %args.mode, plaintext_len = plaintext.len(), "envelope unlocked");
    write_output(args.output.as_deref(), plaintext.expose(), out)
}
