use std::{
    ffi::OsStr,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use miette::{miette, Context, IntoDiagnostic};
use tracing::trace;

use super::command::{assert_success_command, run_command, spawn_streaming, Capture, YT_DL, YT_DLP};
use crate::{
    result::{bail, Error, Result},
    types::{ProgressGate, RawTick, VideoInfo},
};

/// The three capabilities the facade needs from an extraction engine.
///
/// Anything implementing them can replace the yt-dlp driver wholesale;
/// the facade never reimplements extraction, transfer, or transcoding.
pub trait VideoExtractor {
    /// Fetch one video's metadata without transferring any media bytes.
    fn fetch_video(&self, url: &str) -> Result<VideoInfo>;

    /// Enumerate the entry ids of a playlist or channel, in source order,
    /// without resolving the entries themselves.
    fn playlist_entries(&self, url: &str) -> Result<Vec<String>>;

    /// Download `url` into `dest` using one selector expression, feeding
    /// every engine-native progress tick through the gate. The engine
    /// performs any merge/extraction post-processing itself so that the
    /// finished file carries exactly `dest`'s extension.
    fn download(
        &self,
        url: &str,
        selector: &str,
        dest: &Path,
        spec: &DownloadSpec,
        gate: &mut ProgressGate,
    ) -> Result<()>;
}

/// Engine options for one download attempt, resolved by the orchestrator.
#[derive(Debug, Clone)]
pub struct DownloadSpec {
    /// Run the audio-extraction post-processor after the transfer
    pub extract_audio: bool,
    /// Target bitrate for extracted audio, e.g. "192K"
    pub audio_bitrate: String,
    /// Replace an existing destination file
    pub overwrite: bool,
}

/// Asks the engine to print one machine-readable line per progress tick:
/// `tick <downloaded> <total> <estimate> <speed> <eta>`, with `NA` where
/// a value is not known yet.
const PROGRESS_TEMPLATE: &str = "download:tick %(progress.downloaded_bytes)s \
     %(progress.total_bytes)s %(progress.total_bytes_estimate)s \
     %(progress.speed)s %(progress.eta)s";

/// Driver for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) executable
/// (with the legacy `youtube-dl` as fallback).
pub struct YtDlp {
    program: &'static str,
}

impl YtDlp {
    /// Verify that an engine binary is reachable.
    pub fn new() -> Result<Self> {
        for program in [YT_DLP, YT_DL] {
            if assert_success_command(program, |cmd| cmd.arg("--version")).is_ok() {
                return Ok(Self { program });
            }
        }

        bail("No extraction engine found, install yt-dlp or youtube-dl")
    }

    /// Run the engine to completion; a non-0 exit becomes a classified
    /// error carrying the engine's own diagnostic line.
    fn run_classified<F>(&self, f: F, capture: Capture) -> Result<Vec<u8>>
    where
        F: FnOnce(&mut std::process::Command) -> &mut std::process::Command,
    {
        let res = run_command(self.program, f, capture | Capture::STDERR)?;

        if res.status.success() {
            Ok(res.stdout)
        } else {
            Err(classify_engine_error(&String::from_utf8_lossy(&res.stderr)))
        }
    }
}

impl VideoExtractor for YtDlp {
    fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
        let stdout = self.run_classified(
            |cmd| {
                cmd.arg("-q")
                    .args(["--dump-json", "--no-playlist", "--no-warnings"])
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
        )?;

        let json = serde_json::from_slice::<serde_json::Value>(&stdout)
            .into_diagnostic()
            .wrap_err("Could not parse engine metadata payload")?;

        VideoInfo::from_json(&json, url)
            .map_err(|err| err.wrap_err_with(|| format!("Bad metadata payload for {url}")))
    }

    fn playlist_entries(&self, url: &str) -> Result<Vec<String>> {
        let stdout = self.run_classified(
            |cmd| {
                cmd.arg("-q")
                    .args(["--flat-playlist", "--yes-playlist", "--get-id", "--no-warnings"])
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
        )?;

        let output = String::from_utf8_lossy(&stdout);
        Ok(output.split_whitespace().map(String::from).collect())
    }

    fn download(
        &self,
        url: &str,
        selector: &str,
        dest: &Path,
        spec: &DownloadSpec,
        gate: &mut ProgressGate,
    ) -> Result<()> {
        // The engine fills in the pre-postprocessing extension itself;
        // after merge/extraction the file lands exactly at `dest`.
        let template = dest.with_extension("%(ext)s");

        let mut child = spawn_streaming(self.program, |cmd| {
            let cmd = cmd
                .args(["-f", selector])
                .args(["--no-playlist", "--no-warnings", "--newline", "--no-continue"])
                .args(["--progress-template", PROGRESS_TEMPLATE])
                .args([OsStr::new("-o"), template.as_os_str()]);

            let cmd = if spec.extract_audio {
                cmd.args(["-x", "--audio-format", "mp3"])
                    .args(["--audio-quality", &spec.audio_bitrate])
            } else {
                cmd.args(["--merge-output-format", "mp4"])
                    .args(["--remux-video", "mp4"])
            };

            let cmd = if spec.overwrite {
                cmd.arg("--force-overwrites")
            } else {
                cmd
            };

            cmd.arg("--").arg(url)
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| miette!("Engine stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| miette!("Engine stderr was not piped"))?;

        // Drain stderr on the side so neither pipe can fill up and stall
        // the engine mid-transfer.
        let drain = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf);
            buf
        });

        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };

            if let Some(tick) = parse_tick(&line) {
                gate.tick(tick);
            } else {
                trace!("engine: {line}");
            }
        }

        let status = child
            .wait()
            .into_diagnostic()
            .wrap_err("Could not wait for the engine")?;
        let stderr_text = drain.join().unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(classify_engine_error(&stderr_text))
        }
    }
}

/// Parse one `--progress-template` line. The engine substitutes `NA` for
/// values it does not know yet; a tick without a byte count is dropped.
fn parse_tick(line: &str) -> Option<RawTick> {
    let mut fields = line.strip_prefix("tick ")?.split_whitespace();

    let downloaded_bytes = fields.next()?.parse::<f64>().ok()? as u64;
    let total = fields.next().and_then(|f| f.parse::<f64>().ok());
    let estimate = fields.next().and_then(|f| f.parse::<f64>().ok());
    let speed = fields.next().and_then(|f| f.parse::<f64>().ok());
    let eta = fields.next().and_then(|f| f.parse::<f64>().ok());

    Some(RawTick {
        downloaded_bytes,
        total_bytes: total.or(estimate).map(|v| v as u64),
        speed,
        eta: eta.map(|v| v as u64),
    })
}

/// Map the engine's stderr onto the crate error taxonomy, keeping the
/// engine's own diagnostic line.
///
/// yt-dlp reports everything as free-form `ERROR:` lines, so this is
/// necessarily a signature scan. Match order matters: "ffmpeg not found"
/// must classify as a conversion failure, not a missing video.
pub(crate) fn classify_engine_error(stderr: &str) -> Error {
    let detail = stderr
        .lines()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().find(|line| !line.trim().is_empty()))
        .unwrap_or("engine failed without diagnostics")
        .trim()
        .to_string();

    let lower = detail.to_lowercase();
    let matches_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if matches_any(&["requested format is not available", "format is not available"]) {
        Error::UnsatisfiableFormat(detail)
    } else if matches_any(&["postprocess", "ffmpeg", "ffprobe", "audio conversion failed"]) {
        Error::Conversion(detail)
    } else if matches_any(&[
        "video unavailable",
        "private video",
        "has been removed",
        "members-only",
        "not available in your country",
        "geo restricted",
        "account associated with this video has been terminated",
    ]) {
        Error::Unavailable(detail)
    } else if matches_any(&[
        "does not exist",
        "404",
        "not found",
        "incomplete youtube id",
        "no video found",
    ]) {
        Error::NotFound(detail)
    } else if matches_any(&[
        "unable to download",
        "connection",
        "timed out",
        "timeout",
        "temporary failure in name resolution",
        "network",
        "getaddrinfo",
    ]) {
        Error::Network(detail)
    } else if matches_any(&["unsupported url", "is not a valid url"]) {
        Error::InvalidUrl(detail)
    } else {
        Error::Miette(miette!("{detail}"))
    }
}
