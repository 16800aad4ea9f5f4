mod cli;
mod downloader;
mod io;
mod logging;
mod outside;
mod playlist;
mod result;
mod settings;
mod types;
mod url;

use std::io::Write;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing::{error, info, warn};

use crate::{
    cli::Args,
    downloader::Downloader,
    outside::{VideoExtractor, YtDlp},
    result::Error,
    settings::Settings,
    types::{DownloadProgress, ProgressStatus, Quality, VideoInfo},
    url::{classify_url, UrlKind},
};

fn main() -> miette::Result<()> {
    let args = Args::parse();
    logging::init_logging(if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    })?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(out) = args.out.clone() {
        settings.download_dir = out;
    }
    if let Some(policy) = args.on_existing {
        settings.on_existing = policy;
    }

    let engine = YtDlp::new()?;
    let downloader = Downloader::new(engine, settings)?;

    if !downloader.validate_url(&args.url) {
        return Err(Error::InvalidUrl(args.url).into());
    }

    match classify_url(&args.url) {
        Some(UrlKind::Video) if args.info => {
            print_video(&downloader.get_video_info(&args.url)?);
        }
        Some(UrlKind::Video) => {
            let path = download_one(&downloader, &args.url, args.quality)?;
            info!("Saved {}", path.display());
        }
        Some(UrlKind::Playlist) => run_playlist(&downloader, &args)?,
        None => return Err(Error::InvalidUrl(args.url).into()),
    }

    Ok(())
}

fn run_playlist<E: VideoExtractor>(
    downloader: &Downloader<E>,
    args: &Args,
) -> miette::Result<()> {
    let mut entries = downloader.get_playlist_info(&args.url)?;

    if args.info {
        for video in entries.by_ref() {
            print_video(&video);
        }
    } else {
        let mut failed = 0usize;
        for video in entries.by_ref() {
            match download_one(downloader, &video.url, args.quality) {
                Ok(path) => info!("Saved {}", path.display()),
                // One bad download should not sink the rest of the list
                Err(err) => {
                    failed += 1;
                    error!("Could not download {}: {err}", video.id);
                }
            }
        }
        if failed > 0 {
            warn!("{failed} downloads failed");
        }
    }

    if entries.skipped() > 0 {
        warn!(
            "{} of {} playlist entries could not be resolved",
            entries.skipped(),
            entries.reported_len()
        );
    }

    Ok(())
}

fn download_one<E: VideoExtractor>(
    downloader: &Downloader<E>,
    url: &str,
    quality: Quality,
) -> crate::result::Result<std::path::PathBuf> {
    let mut render = |progress: &DownloadProgress| render_progress(progress);
    downloader.download_video(url, quality, Some(&mut render))
}

/// Single-line progress display, redrawn in place on every tick.
fn render_progress(progress: &DownloadProgress) {
    let mut stderr = std::io::stderr();

    match progress.status {
        ProgressStatus::Queued => {
            let _ = write!(stderr, "{}\r", "queued...".dimmed());
        }
        ProgressStatus::Downloading => {
            let speed = progress
                .speed
                .map_or_else(|| "   ?    ".to_string(), human_rate);
            let eta = progress
                .eta
                .map_or_else(|| "--:--".to_string(), human_duration);
            let _ = write!(
                stderr,
                "\r{:>5.1}% {:>10} ETA {:>5} ",
                progress.percentage,
                speed,
                eta
            );
        }
        ProgressStatus::Finished => {
            let dest = progress
                .filename
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let _ = writeln!(stderr, "\r{:>5.1}% {} {dest}        ", 100.0, "done".green());
        }
        ProgressStatus::Error => {
            let message = progress.error_message.as_deref().unwrap_or("failed");
            let _ = writeln!(stderr, "\r{}: {message}", "error".red());
        }
    }
    let _ = stderr.flush();
}

fn print_video(video: &VideoInfo) {
    println!("{} [{}]", video.title.bold(), video.id);
    if let Some(uploader) = &video.uploader {
        println!("  uploader  {uploader}");
    }
    println!("  duration  {}", human_duration(video.duration));
    if let Some(views) = video.view_count {
        println!("  views     {views}");
    }
    if let Some(date) = video.upload_date {
        println!("  uploaded  {date}");
    }
    if let Some(thumbnail) = &video.thumbnail {
        println!("  thumbnail {thumbnail}");
    }
    if let Some(line) = video.description.lines().find(|l| !l.trim().is_empty()) {
        println!("  about     {}", line.trim());
    }
    println!("  url       {}", video.url);

    if !video.formats.is_empty() {
        println!("  formats");
        for format in &video.formats {
            println!("    {}", format.label());
        }
    }
}

fn human_duration(total_secs: u64) -> String {
    let (h, m, s) = (
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
    );
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn human_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];

    let mut rate = bytes_per_sec;
    let mut unit = 0;
    while rate >= 1024.0 && unit < UNITS.len() - 1 {
        rate /= 1024.0;
        unit += 1;
    }

    format!("{rate:.1} {}", UNITS[unit])
}
