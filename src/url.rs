use std::sync::OnceLock;

use regex::Regex;

/// How a URL should be routed for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// A single watchable video
    Video,
    /// A playlist or channel page enumerating several videos
    Playlist,
}

// To whomever reads this asking why regexes and not a URL parser:
// the platform's grammar is a handful of fixed shapes, and matching them
// structurally keeps this module free of any network or DNS dependency.

/// Scheme and optional subdomain shared by every pattern
macro_rules! host {
    () => {
        r"^https?://(?:www\.|m\.|music\.)?"
    };
}
/// An eleven-character video identifier
macro_rules! video_id {
    () => {
        r"[A-Za-z0-9_-]{11}"
    };
}

const WATCH: &str = concat!(host!(), r"youtube\.com/watch\?(?:[^#\s]*&)?v=", video_id!());
const SHORT_LINK: &str = concat!(r"^https?://youtu\.be/", video_id!());
const DIRECT_PATH: &str = concat!(host!(), r"youtube\.com/(?:shorts|embed|live)/", video_id!());

const PLAYLIST: &str = concat!(
    host!(),
    r"youtube\.com/playlist\?(?:[^#\s]*&)?list=[A-Za-z0-9_-]+"
);
const CHANNEL: &str = concat!(
    host!(),
    r"youtube\.com/(?:channel/[A-Za-z0-9_-]+|@[\w.-]+|c/[^/\s?]+|user/[^/\s?]+)"
);

static VIDEO_RES: OnceLock<[Regex; 3]> = OnceLock::new();
static LISTING_RES: OnceLock<[Regex; 2]> = OnceLock::new();

fn video_res() -> &'static [Regex] {
    VIDEO_RES.get_or_init(|| {
        [
            Regex::new(WATCH).unwrap(),
            Regex::new(SHORT_LINK).unwrap(),
            Regex::new(DIRECT_PATH).unwrap(),
        ]
    })
}

fn listing_res() -> &'static [Regex] {
    LISTING_RES.get_or_init(|| [Regex::new(PLAYLIST).unwrap(), Regex::new(CHANNEL).unwrap()])
}

/// Classify a URL by structure alone, without any network access.
///
/// This cannot know whether the target actually exists, only whether the
/// text is shaped like a supported platform URL. A watch URL carrying a
/// `list=` parameter routes to playlist enumeration.
pub fn classify_url(url: &str) -> Option<UrlKind> {
    let url = url.trim();

    if listing_res().iter().any(|re| re.is_match(url)) {
        return Some(UrlKind::Playlist);
    }

    if video_res().iter().any(|re| re.is_match(url)) {
        if url.contains("list=") {
            return Some(UrlKind::Playlist);
        }
        return Some(UrlKind::Video);
    }

    None
}

/// True iff the text matches the structural pattern of a supported
/// platform URL (video, playlist, or channel). Never fails.
pub fn validate_url(url: &str) -> bool {
    classify_url(url).is_some()
}
