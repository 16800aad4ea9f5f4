mod progress;
mod quality;
mod video;

pub use progress::{DownloadProgress, ProgressGate, ProgressStatus, RawTick};
pub use quality::Quality;
pub use video::{StreamFormat, VideoInfo};
