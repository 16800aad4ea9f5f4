use std::fmt::Display;

use miette::miette;

/// Failures surfaced by the facade. Engine-originated variants keep the
/// engine's own message so diagnostics are never lost in translation.
#[derive(Debug)]
pub enum Error {
    /// The input does not match the structural grammar of a supported
    /// platform URL. Detected locally, before any I/O.
    InvalidUrl(String),

    /// The source platform could not be reached.
    Network(String),

    /// The target exists but the platform refuses access:
    /// removed, private, or region-locked.
    Unavailable(String),

    /// Metadata lookup found no such video.
    NotFound(String),

    /// No stream satisfies the requested quality, even after the
    /// resolver's fallback chain.
    UnsatisfiableFormat(String),

    /// Post-processing of the downloaded stream (merge, audio
    /// extraction) failed.
    Conversion(String),

    Miette(miette::Report),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidUrl(url) => write!(f, "Unsupported or malformed URL: {url}"),
            Error::Network(msg) => write!(f, "Platform unreachable: {msg}"),
            Error::Unavailable(msg) => write!(f, "Content unavailable: {msg}"),
            Error::NotFound(msg) => write!(f, "No such video: {msg}"),
            Error::UnsatisfiableFormat(msg) => write!(f, "No stream satisfies the request: {msg}"),
            Error::Conversion(msg) => write!(f, "Post-processing failed: {msg}"),
            Error::Miette(report) => write!(f, "{report}"),
        }
    }
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(report) => report,
            other => miette!("{other}"),
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

pub fn bail<T>(msg: &str) -> Result<T> {
    Err(Error::Miette(miette!("{msg}")))
}

pub type Result<T> = std::result::Result<T, Error>;
