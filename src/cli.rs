use std::path::PathBuf;

use clap::Parser;

use crate::{settings::OverwritePolicy, types::Quality};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("TUBEGRAB_", $v)
    };
}

/// Wrapper-tool around `yt-dlp` to fetch web videos and playlists.
/// Resolve metadata, pick a quality, and download with live progress.
#[derive(Parser, Debug)]
pub struct Args {
    /// The video or playlist URL to work on
    #[clap(env = arg_env!("URL"))]
    pub url: String,

    /// The path to the download directory
    #[clap(long, env = arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// The quality/format to download
    #[clap(long, value_enum, default_value_t = Quality::Best, env = arg_env!("QUALITY"))]
    pub quality: Quality,

    /// Print the resolved metadata and exit without downloading
    #[clap(long, env = arg_env!("INFO"))]
    pub info: bool,

    /// What to do when the destination file already exists
    #[clap(long, value_enum, env = arg_env!("ON_EXISTING"))]
    pub on_existing: Option<OverwritePolicy>,

    /// The path to an optional TOML settings file
    #[clap(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// Log engine invocations and raw progress ticks
    #[clap(long, env = arg_env!("VERBOSE"))]
    pub verbose: bool,
}
