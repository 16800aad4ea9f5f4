use std::path::PathBuf;

/// Lifecycle of one download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// Accepted, engine not yet transferring bytes
    Queued,
    Downloading,
    /// Terminal: the file is on disk and percentage is 100
    Finished,
    /// Terminal: the attempt failed and `error_message` is set
    Error,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStatus::Finished | ProgressStatus::Error)
    }
}

/// Snapshot delivered to the caller's observer.
///
/// A fresh record is built for every engine tick; the facade keeps no
/// history, only the caller can.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub status: ProgressStatus,
    /// 0 to 100, never decreasing within one download
    pub percentage: f64,
    /// Transfer rate in bytes per second, when the engine reports one
    pub speed: Option<f64>,
    /// Estimated seconds remaining
    pub eta: Option<u64>,
    /// Destination path, once known
    pub filename: Option<PathBuf>,
    /// Present iff `status == Error`
    pub error_message: Option<String>,
}

/// One engine-native progress tick, before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTick {
    pub downloaded_bytes: u64,
    /// Exact or engine-estimated total, absent until the engine knows it
    pub total_bytes: Option<u64>,
    pub speed: Option<f64>,
    pub eta: Option<u64>,
}

/// Normalizes raw engine ticks into [`DownloadProgress`] records and
/// enforces the delivery contract:
///
/// - percentage is computed from byte counts, 0 until a total is known;
/// - percentage never decreases, even when the engine restarts its
///   counter for the audio leg of a merged download;
/// - exactly one terminal record (finished or error) is delivered per
///   attempt, and nothing follows it.
///
/// The observer is invoked synchronously on the downloading thread. With
/// no observer, records are still computed so the gate's state stays
/// consistent, then discarded.
pub struct ProgressGate<'a> {
    observer: Option<&'a mut dyn FnMut(&DownloadProgress)>,
    filename: Option<PathBuf>,
    high_water: f64,
    terminal: bool,
}

impl<'a> ProgressGate<'a> {
    pub fn new(observer: Option<&'a mut dyn FnMut(&DownloadProgress)>) -> Self {
        Self {
            observer,
            filename: None,
            high_water: 0.0,
            terminal: false,
        }
    }

    /// Record the destination path; it rides along on subsequent records.
    pub fn set_filename(&mut self, path: PathBuf) {
        self.filename = Some(path);
    }

    /// Deliver the initial record, before the first engine byte.
    pub fn queued(&mut self) {
        self.deliver(ProgressStatus::Queued, 0.0, None, None, None);
    }

    /// Deliver one normalized transfer tick.
    pub fn tick(&mut self, tick: RawTick) {
        let percentage = match tick.total_bytes {
            Some(total) if total > 0 => (tick.downloaded_bytes as f64 / total as f64) * 100.0,
            _ => 0.0,
        };

        self.deliver(
            ProgressStatus::Downloading,
            percentage,
            tick.speed,
            tick.eta,
            None,
        );
    }

    /// Deliver the successful terminal record.
    pub fn finished(&mut self) {
        self.deliver(ProgressStatus::Finished, 100.0, None, None, None);
    }

    /// Deliver the failed terminal record. The message is guaranteed
    /// non-empty.
    pub fn failed(&mut self, message: &str) {
        let message = if message.trim().is_empty() {
            "download failed".to_string()
        } else {
            message.to_string()
        };

        self.deliver(ProgressStatus::Error, self.high_water, None, None, Some(message));
    }

    fn deliver(
        &mut self,
        status: ProgressStatus,
        percentage: f64,
        speed: Option<f64>,
        eta: Option<u64>,
        error_message: Option<String>,
    ) {
        if self.terminal {
            return;
        }

        let percentage = percentage.clamp(0.0, 100.0).max(self.high_water);
        self.high_water = percentage;
        self.terminal = status.is_terminal();

        if let Some(observer) = self.observer.as_deref_mut() {
            observer(&DownloadProgress {
                status,
                percentage,
                speed,
                eta,
                filename: self.filename.clone(),
                error_message,
            });
        }
    }
}
