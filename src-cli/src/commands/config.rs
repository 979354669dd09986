//! `sceau config show|init`.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;

use super::write_json;
use crate::cli::ConfigCommand;
use crate::config::Settings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigShowDto<'a> {
    pub path: Option<String>,
    pub exists: bool,
    pub settings: &'a Settings,
}

/// # Errors
///
/// No settings path, existing file without `--force`, or I/O errors.
pub fn run(
    command: ConfigCommand,
    path: Option<&Path>,
    settings: &Settings,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => write_json(
            out,
            &ConfigShowDto {
                path: path.map(|p| p.display().to_string()),
                exists: path.is_some_and(Path::exists),
                settings,
            },
        ),
        ConfigCommand::Init { force } => {
            let Some(path) = path else {
                bail!("no configuration directory on this platform; pass --config <FILE>");
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
            Settings::default()
                .save(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            tracing::info!("wrote default settings to {}", path.display());
            writeln!(out, "{}", path.display())?;
            Ok(())
        }
    }
}
