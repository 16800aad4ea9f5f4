use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;

/// What a download does when its destination file already exists.
///
/// The policy is explicit so re-running the same (url, quality) pair has
/// documented behavior instead of whatever the filesystem happens to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Re-download and replace the existing file
    Overwrite,
    /// Return the existing file without touching the network
    Skip,
}

/// Runtime settings, layered: built-in defaults, then an optional TOML
/// file, then `TUBEGRAB_*` environment variables. CLI flags override all
/// of these in `main`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory downloads are written into
    pub download_dir: PathBuf,

    /// Behavior for already-present destination files
    pub on_existing: OverwritePolicy,

    /// Target bitrate for extracted audio, e.g. "192K"
    pub audio_bitrate: String,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("download_dir", "./downloads")
            .into_diagnostic()?
            .set_default("on_existing", "overwrite")
            .into_diagnostic()?
            .set_default("audio_bitrate", "192K")
            .into_diagnostic()?;

        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        builder
            .add_source(Environment::with_prefix("TUBEGRAB"))
            .build()
            .into_diagnostic()?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid settings")
    }
}
