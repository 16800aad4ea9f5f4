use clap::ValueEnum;

/// The closed set of user-facing download choices.
///
/// How a choice maps to engine selector expressions is internal to this
/// module; callers only ever see the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    /// Best available video with best audio
    Best,
    /// Video with audio, capped at 1080p
    P1080,
    /// Video with audio, capped at 720p
    P720,
    /// Video with audio, capped at 480p
    P480,
    /// Audio only, extracted to mp3
    Mp3,
}

impl Quality {
    /// Candidate selector expressions, to be tried in priority order.
    ///
    /// Not every video publishes every resolution, so each capped choice
    /// degrades to the best combination at or below the cap, and finally
    /// to whatever the platform offers. An exact-match-only selector
    /// would make common requests fail needlessly.
    pub fn selector_chain(self) -> &'static [&'static str] {
        match self {
            Quality::Best => &["bestvideo+bestaudio", "best"],
            Quality::P1080 => &[
                "bestvideo[height<=1080]+bestaudio",
                "best[height<=1080]",
                "best",
            ],
            Quality::P720 => &[
                "bestvideo[height<=720]+bestaudio",
                "best[height<=720]",
                "best",
            ],
            Quality::P480 => &[
                "bestvideo[height<=480]+bestaudio",
                "best[height<=480]",
                "best",
            ],
            Quality::Mp3 => &["bestaudio", "best"],
        }
    }

    /// Whether the engine must run its audio-extraction post-processor
    /// after the transfer.
    pub fn is_audio(self) -> bool {
        matches!(self, Quality::Mp3)
    }

    /// The container extension the finished file will carry. Video
    /// downloads are merged/remuxed into mp4, audio is converted to mp3,
    /// so the destination name is known before the engine runs.
    pub fn extension(self) -> &'static str {
        if self.is_audio() {
            "mp3"
        } else {
            "mp4"
        }
    }
}
