//! Bakes the stylized avatar to disk.
//!
//! ```text
//! avatar_baker [OUTPUT] [SETTINGS_JSON]
//! ```
//!
//! `OUTPUT` defaults to the configured `export.asset_path`. `SETTINGS_JSON`
//! is an optional, possibly partial, `MannequinSettings` document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mannequin::{AvatarRig, MannequinSettings};

fn load_settings(path: Option<&Path>) -> anyhow::Result<MannequinSettings> {
    let Some(path) = path else {
        return Ok(MannequinSettings::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    MannequinSettings::from_json_str(&json)
        .with_context(|| format!("parsing settings from {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let output = args.next().map(PathBuf::from);
    let settings_path = args.next().map(PathBuf::from);

    let settings = load_settings(settings_path.as_deref())?;
    let output = output.unwrap_or_else(|| PathBuf::from(&settings.export.asset_path));

    let rig = AvatarRig::build(&settings.rig).context("building avatar rig")?;
    let bytes = rig.export(&settings.export).context("exporting avatar")?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(&output, &bytes).with_context(|| format!("writing {}", output.display()))?;

    log::info!(
        "Baked {} bones, {} clips into {} ({} bytes)",
        rig.skeleton.len(),
        rig.clips.len(),
        output.display(),
        bytes.len()
    );
    println!("{}", output.display());
    Ok(())
}
