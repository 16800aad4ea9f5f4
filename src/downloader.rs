use std::{fs, path::PathBuf};

use miette::{miette, Context, IntoDiagnostic};
use tracing::{debug, info};

use crate::{
    io::build_output_path,
    outside::{DownloadSpec, VideoExtractor},
    playlist::PlaylistIter,
    result::{Error, Result},
    settings::{OverwritePolicy, Settings},
    types::{DownloadProgress, ProgressGate, Quality, VideoInfo},
    url::{classify_url, validate_url, UrlKind},
};

/// Observer for live download progress. Invoked synchronously on the
/// downloading thread, once per normalized record, and expected to
/// return promptly.
pub type ProgressObserver<'a> = &'a mut dyn FnMut(&DownloadProgress);

/// Facade over the extraction engine: URL classification, metadata
/// resolution, playlist walks, and selector-driven downloads.
///
/// All operations block until the engine call returns; the facade adds
/// no threads or scheduling of its own. Hosts wanting concurrent
/// downloads run several `Downloader`s on execution contexts they manage
/// themselves.
pub struct Downloader<E> {
    engine: E,
    settings: Settings,
}

impl<E: VideoExtractor> Downloader<E> {
    /// Wrap an engine, ensuring the download directory exists.
    pub fn new(engine: E, settings: Settings) -> Result<Self> {
        fs::create_dir_all(&settings.download_dir)
            .into_diagnostic()
            .wrap_err("Could not create download directory")?;

        Ok(Self { engine, settings })
    }

    /// Structural validation only; never touches the network.
    pub fn validate_url(&self, url: &str) -> bool {
        validate_url(url)
    }

    /// Fetch metadata for a single video without downloading anything.
    pub fn get_video_info(&self, url: &str) -> Result<VideoInfo> {
        match classify_url(url) {
            Some(UrlKind::Video) => self.engine.fetch_video(url),
            _ => Err(Error::InvalidUrl(url.to_string())),
        }
    }

    /// Enumerate a playlist or channel lazily, skipping dead entries.
    pub fn get_playlist_info(&self, url: &str) -> Result<PlaylistIter<'_>> {
        if classify_url(url) != Some(UrlKind::Playlist) {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        let entries = self.engine.playlist_entries(url)?;
        debug!("Playlist reports {} entries", entries.len());

        Ok(PlaylistIter::new(&self.engine, entries))
    }

    /// Download one video and return its destination path.
    ///
    /// Selector candidates from the chosen quality are tried in order;
    /// only when the engine rejects every candidate does the call fail
    /// with `UnsatisfiableFormat`. Every attempt that passes URL
    /// validation delivers progress records ending in exactly one
    /// terminal record; pass `None` to discard them.
    pub fn download_video(
        &self,
        url: &str,
        quality: Quality,
        progress: Option<ProgressObserver>,
    ) -> Result<PathBuf> {
        if classify_url(url) != Some(UrlKind::Video) {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        let mut gate = ProgressGate::new(progress);
        gate.queued();

        let info = match self.engine.fetch_video(url) {
            Ok(info) => info,
            Err(err) => {
                gate.failed(&err.to_string());
                return Err(err);
            }
        };

        let dest = build_output_path(
            &self.settings.download_dir,
            &info.title,
            &info.id,
            quality.extension(),
        );
        gate.set_filename(dest.clone());

        if dest.exists() && self.settings.on_existing == OverwritePolicy::Skip {
            info!("{} already present, skipping download", dest.display());
            gate.finished();
            return Ok(dest);
        }

        let spec = DownloadSpec {
            extract_audio: quality.is_audio(),
            audio_bitrate: self.settings.audio_bitrate.clone(),
            overwrite: self.settings.on_existing == OverwritePolicy::Overwrite,
        };

        let mut last_rejection = None;
        for selector in quality.selector_chain() {
            debug!("Trying selector '{selector}' for {}", info.id);

            match self.engine.download(url, selector, &dest, &spec, &mut gate) {
                Ok(()) => {
                    if !dest.exists() {
                        let err = Error::Miette(miette!(
                            "Engine reported success but {} was not created",
                            dest.display()
                        ));
                        gate.failed(&err.to_string());
                        return Err(err);
                    }

                    gate.finished();
                    return Ok(dest);
                }
                // The next candidate in the chain may still be satisfiable
                Err(Error::UnsatisfiableFormat(detail)) => {
                    debug!("Selector '{selector}' rejected: {detail}");
                    last_rejection = Some(detail);
                }
                Err(err) => {
                    gate.failed(&err.to_string());
                    return Err(err);
                }
            }
        }

        let err = Error::UnsatisfiableFormat(
            last_rejection.unwrap_or_else(|| "no selector candidates".to_string()),
        );
        gate.failed(&err.to_string());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashSet, path::Path};

    use super::*;
    use crate::types::{ProgressStatus, RawTick, StreamFormat};

    /// Scripted engine standing in for yt-dlp: resolves canned metadata,
    /// rejects configured selectors, and can fail wholesale.
    struct ScriptedEngine {
        rejected_selectors: HashSet<&'static str>,
        bad_entries: HashSet<&'static str>,
        download_error: Option<fn() -> Error>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedEngine {
        fn new() -> Self {
            Self {
                rejected_selectors: HashSet::new(),
                bad_entries: HashSet::new(),
                download_error: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn video(id: &str) -> VideoInfo {
            VideoInfo {
                id: id.to_string(),
                title: format!("Video {id}"),
                description: String::new(),
                duration: 60,
                uploader: Some("uploader".to_string()),
                upload_date: None,
                view_count: Some(1),
                thumbnail: None,
                formats: Vec::<StreamFormat>::new(),
                url: format!("https://www.youtube.com/watch?v={id}"),
            }
        }
    }

    impl VideoExtractor for ScriptedEngine {
        fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
            self.calls.borrow_mut().push(format!("fetch {url}"));

            let id = url.rsplit("v=").next().unwrap_or(url);
            if self.bad_entries.contains(id) {
                return Err(Error::Unavailable(format!("{id} removed")));
            }
            Ok(Self::video(id))
        }

        fn playlist_entries(&self, url: &str) -> Result<Vec<String>> {
            self.calls.borrow_mut().push(format!("list {url}"));
            Ok(vec!["aaaaaaaaaaa".into(), "bbbbbbbbbbb".into(), "ccccccccccc".into()])
        }

        fn download(
            &self,
            _url: &str,
            selector: &str,
            dest: &Path,
            _spec: &DownloadSpec,
            gate: &mut ProgressGate,
        ) -> Result<()> {
            self.calls.borrow_mut().push(format!("download {selector}"));

            if self.rejected_selectors.contains(selector) {
                return Err(Error::UnsatisfiableFormat(
                    "Requested format is not available".to_string(),
                ));
            }
            if let Some(make_err) = self.download_error {
                return Err(make_err());
            }

            gate.tick(RawTick {
                downloaded_bytes: 50,
                total_bytes: Some(100),
                ..RawTick::default()
            });
            gate.tick(RawTick {
                downloaded_bytes: 100,
                total_bytes: Some(100),
                ..RawTick::default()
            });
            std::fs::write(dest, b"media").unwrap();
            Ok(())
        }
    }

    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    const LIST_URL: &str = "https://www.youtube.com/playlist?list=PL123456789";

    fn downloader_in(dir: &Path, engine: ScriptedEngine) -> Downloader<ScriptedEngine> {
        let settings = Settings {
            download_dir: dir.to_path_buf(),
            on_existing: OverwritePolicy::Overwrite,
            audio_bitrate: "192K".to_string(),
        };
        Downloader::new(engine, settings).unwrap()
    }

    #[test]
    fn invalid_urls_fail_before_any_engine_call() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader_in(dir.path(), ScriptedEngine::new());

        for url in ["not a url", LIST_URL] {
            assert!(matches!(
                dl.download_video(url, Quality::Best, None),
                Err(Error::InvalidUrl(_))
            ));
        }
        assert!(matches!(
            dl.get_video_info("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(dl.engine.calls.borrow().is_empty());
    }

    #[test]
    fn successful_download_walks_the_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader_in(dir.path(), ScriptedEngine::new());

        let mut events = Vec::new();
        let path = {
            let mut observer = |p: &DownloadProgress| events.push(p.clone());
            dl.download_video(VIDEO_URL, Quality::P720, Some(&mut observer))
                .unwrap()
        };

        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mp4");

        // Queued first, finished last, exactly one terminal record
        assert_eq!(events.first().unwrap().status, ProgressStatus::Queued);
        let last = events.last().unwrap();
        assert_eq!(last.status, ProgressStatus::Finished);
        assert_eq!(last.percentage, 100.0);
        assert_eq!(
            events.iter().filter(|e| e.status.is_terminal()).count(),
            1
        );
    }

    #[test]
    fn rejected_selectors_fall_through_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new();
        // The video only publishes 480p; the exact 720p candidate fails
        engine
            .rejected_selectors
            .insert("bestvideo[height<=720]+bestaudio");
        let dl = downloader_in(dir.path(), engine);

        let path = dl.download_video(VIDEO_URL, Quality::P720, None).unwrap();

        assert!(path.exists());
        let calls = dl.engine.calls.borrow();
        let downloads: Vec<&String> =
            calls.iter().filter(|c| c.starts_with("download")).collect();
        assert_eq!(
            *downloads,
            [
                "download bestvideo[height<=720]+bestaudio",
                "download best[height<=720]"
            ]
        );
    }

    #[test]
    fn exhausted_chain_reports_unsatisfiable_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new();
        for selector in Quality::P480.selector_chain() {
            engine.rejected_selectors.insert(selector);
        }
        let dl = downloader_in(dir.path(), engine);

        let mut events = Vec::new();
        let res = {
            let mut observer = |p: &DownloadProgress| events.push(p.clone());
            dl.download_video(VIDEO_URL, Quality::P480, Some(&mut observer))
        };

        assert!(matches!(res, Err(Error::UnsatisfiableFormat(_))));
        let last = events.last().unwrap();
        assert_eq!(last.status, ProgressStatus::Error);
        assert!(!last.error_message.as_deref().unwrap().is_empty());
        assert_eq!(events.iter().filter(|e| e.status.is_terminal()).count(), 1);
    }

    #[test]
    fn engine_failures_surface_classified_with_a_terminal_error_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new();
        engine.download_error = Some(|| Error::Network("timed out".to_string()));
        let dl = downloader_in(dir.path(), engine);

        let mut events = Vec::new();
        let res = {
            let mut observer = |p: &DownloadProgress| events.push(p.clone());
            dl.download_video(VIDEO_URL, Quality::Best, Some(&mut observer))
        };

        assert!(matches!(res, Err(Error::Network(_))));
        assert_eq!(events.last().unwrap().status, ProgressStatus::Error);
        assert_eq!(events.iter().filter(|e| e.status.is_terminal()).count(), 1);
    }

    #[test]
    fn skip_policy_short_circuits_existing_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new();

        let expected = build_output_path(
            dir.path(),
            "Video dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            Quality::Mp3.extension(),
        );
        std::fs::write(&expected, b"already here").unwrap();

        let settings = Settings {
            download_dir: dir.path().to_path_buf(),
            on_existing: OverwritePolicy::Skip,
            audio_bitrate: "192K".to_string(),
        };
        let dl = Downloader::new(engine, settings).unwrap();

        let path = dl.download_video(VIDEO_URL, Quality::Mp3, None).unwrap();

        assert_eq!(path, expected);
        // Metadata was needed for the filename, but no download ran
        let calls = dl.engine.calls.borrow();
        assert!(calls.iter().all(|c| !c.starts_with("download")), "{calls:?}");
    }

    #[test]
    fn playlist_walk_skips_dead_entries_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new();
        engine.bad_entries.insert("bbbbbbbbbbb");
        let dl = downloader_in(dir.path(), engine);

        let mut iter = dl.get_playlist_info(LIST_URL).unwrap();
        let ids: Vec<String> = iter.by_ref().map(|v| v.id).collect();

        assert_eq!(ids, ["aaaaaaaaaaa", "ccccccccccc"]);
        assert_eq!(iter.skipped(), 1);
        assert_eq!(iter.reported_len(), 3);
    }

    #[test]
    fn playlist_lookup_requires_a_listing_url() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader_in(dir.path(), ScriptedEngine::new());

        assert!(matches!(
            dl.get_playlist_info(VIDEO_URL),
            Err(Error::InvalidUrl(_))
        ));
    }
}
