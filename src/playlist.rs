use tracing::{info, warn};

use crate::{outside::VideoExtractor, types::VideoInfo};

/// Lazy, forward-only walk over a playlist or channel.
///
/// Entries resolve one at a time on `next()`. Entries the engine cannot
/// resolve (deleted or private videos inside an otherwise valid playlist)
/// are skipped and counted instead of aborting the walk; playlists
/// routinely contain dead entries. The walk is not restartable; call
/// `get_playlist_info` again to re-enumerate from the source.
pub struct PlaylistIter<'a> {
    engine: &'a dyn VideoExtractor,
    entries: std::vec::IntoIter<String>,
    total: usize,
    yielded: usize,
    skipped: usize,
    summarized: bool,
}

impl<'a> PlaylistIter<'a> {
    pub(crate) fn new(engine: &'a dyn VideoExtractor, entries: Vec<String>) -> Self {
        Self {
            engine,
            total: entries.len(),
            entries: entries.into_iter(),
            yielded: 0,
            skipped: 0,
            summarized: false,
        }
    }

    /// Number of entries skipped so far because they failed to resolve.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of entries the playlist reported before resolution started.
    /// The walk yields at most this many records.
    pub fn reported_len(&self) -> usize {
        self.total
    }
}

impl Iterator for PlaylistIter<'_> {
    type Item = VideoInfo;

    fn next(&mut self) -> Option<VideoInfo> {
        for entry in self.entries.by_ref() {
            match self.engine.fetch_video(&entry) {
                Ok(video) => {
                    self.yielded += 1;
                    return Some(video);
                }
                Err(err) => {
                    self.skipped += 1;
                    warn!("Skipping playlist entry {entry}: {err}");
                }
            }
        }

        if !self.summarized {
            self.summarized = true;
            if self.skipped > 0 {
                info!(
                    "Playlist walk done: {}/{} entries resolved, {} skipped",
                    self.yielded, self.total, self.skipped
                );
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entries.len()))
    }
}
