//! `yt-dlp` process driver.

use crate::error::MediaError;
use crate::media::{DownloadedMedia, MediaDownloader, MediaFormat};
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    output_dir: PathBuf,
}

impl YtDlp {
    /// Creates a driver writing into `output_dir`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Returns the download directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds the argument list for one download.
    fn args(&self, url: &str, format: MediaFormat) -> Vec<OsString> {
        let template = self.output_dir.join("%(title)s.%(ext)s");
        let mut args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            template.into_os_string(),
        ];
        match format {
            MediaFormat::Mp3 => args.extend(
                ["-x", "--audio-format", "mp3", "--audio-quality", "192K"]
                    .into_iter()
                    .map(OsString::from),
            ),
            MediaFormat::Mp4 => args.extend(["-f", "best[ext=mp4]/best"].into_iter().map(OsString::from)),
        }
        args.push("--".into());
        args.push(url.into());
        args
    }
}

/// Picks the final file path out of the printed output.
fn printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(PathBuf::from)
}

#[async_trait]
impl MediaDownloader for YtDlp {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn download(
        &self,
        url: &str,
        format: MediaFormat,
    ) -> Result<DownloadedMedia, Report<MediaError>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| MediaError::Io {
                reason: format!("creating {}: {e}", self.output_dir.display()),
            })?;

        let output = Command::new(&self.program)
            .args(self.args(url, format))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::SpawnFailed {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .rfind(|line| !line.is_empty())
                .map_or_else(|| format!("exited with {}", output.status), str::to_string);
            warn!(url, %reason, "download failed");
            return Err(MediaError::DownloadFailed {
                url: url.to_string(),
                reason,
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = printed_path(&stdout).ok_or_else(|| MediaError::OutputMissing {
            url: url.to_string(),
            path: String::new(),
        })?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| MediaError::OutputMissing {
                url: url.to_string(),
                path: path.display().to_string(),
            })?;

        let filename = path
            .file_name()
            .map_or_else(|| format!("download.{}", format.extension()), |n| n.to_string_lossy().into_owned());

        info!(url, file = %filename, bytes = metadata.len(), "downloaded media");
        debug!(path = %path.display(), "download location");

        Ok(DownloadedMedia {
            path,
            filename,
            size_bytes: metadata.len(),
        })
    }
}
