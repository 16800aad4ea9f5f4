mod command;
mod ytdlp;

pub use ytdlp::{DownloadSpec, VideoExtractor, YtDlp};
