//! Media downloader abstraction.

use crate::error::MediaError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Output format for a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Audio only.
    #[default]
    Mp3,
    /// Video with audio.
    Mp4,
}

impl MediaFormat {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp3 => write!(f, "MP3"),
            Self::Mp4 => write!(f, "MP4"),
        }
    }
}

/// Returned when a format name is neither mp3 nor mp4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedFormat(pub String);

impl fmt::Display for UnsupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported format: {}", self.0)
    }
}

impl std::error::Error for UnsupportedFormat {}

impl FromStr for MediaFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "mp4" => Ok(Self::Mp4),
            _ => Err(UnsupportedFormat(s.trim().to_string())),
        }
    }
}

/// A file produced by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    /// Where the file was written.
    pub path: PathBuf,
    /// File name for display and upload.
    pub filename: String,
    /// Size on disk.
    pub size_bytes: u64,
}

impl DownloadedMedia {
    /// Size in mebibytes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Downloads media from a URL.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Downloads `url` in `format`.
    async fn download(
        &self,
        url: &str,
        format: MediaFormat,
    ) -> Result<DownloadedMedia, Report<MediaError>>;
}
