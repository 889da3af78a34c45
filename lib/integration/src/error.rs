//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CalendarError`: Errors from the calendar service and its token source
//! - `MediaError`: Errors from the media downloader

use std::fmt;

/// Errors from calendar operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Obtaining an access token failed.
    AuthenticationFailed { reason: String },
    /// The request never produced an HTTP response.
    RequestFailed { reason: String },
    /// The API answered with a non-success status.
    HttpStatus { status: u16, body: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The API answer could not be decoded.
    ResponseParseFailed { reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "calendar authentication failed: {reason}")
            }
            Self::RequestFailed { reason } => write!(f, "calendar request failed: {reason}"),
            Self::HttpStatus { status, body } => {
                write!(f, "calendar API returned {status}: {body}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "calendar API rate limited (429), retry after {secs}s")
                } else {
                    write!(f, "calendar API rate limited (429)")
                }
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "could not decode calendar response: {reason}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid calendar configuration: {reason}"),
        }
    }
}

impl std::error::Error for CalendarError {}

/// Errors from media downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The downloader executable could not be started.
    SpawnFailed { program: String, reason: String },
    /// The downloader exited unsuccessfully.
    DownloadFailed { url: String, reason: String },
    /// The downloader succeeded but the file is not where it said.
    OutputMissing { url: String, path: String },
    /// Filesystem error around the download directory.
    Io { reason: String },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed { program, reason } => {
                write!(f, "could not run {program}: {reason}")
            }
            Self::DownloadFailed { url, reason } => write!(f, "download of {url} failed: {reason}"),
            Self::OutputMissing { url, path } => {
                write!(f, "download of {url} produced no file at {path}")
            }
            Self::Io { reason } => write!(f, "media I/O error: {reason}"),
        }
    }
}

impl std::error::Error for MediaError {}
