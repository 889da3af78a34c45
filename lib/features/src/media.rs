//! Media download handler.
//!
//! The model pulls the links and the wanted format out of the message; the
//! downloader fetches each one and the files ride back on the reply as
//! ephemeral attachments. Batches of more than one link wait for a yes/no.

use crate::common::{rate_limited_or, transcript};
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_assistant::{
    Attachment, CapabilityHandler, HandlerDescriptor, HandlerOutcome, HandlerRequest,
    HandlerResult, Reply, deferred,
};
use alfred_integration::{MediaDownloader, MediaFormat};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Links accepted in one request.
pub const DEFAULT_MAX_URLS: usize = 5;

/// Largest file attached to a reply, in MB.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 25;

const CAPABILITIES: &str = r#"This feature can:
- Convert videos to MP3 (audio only)
- Download videos as MP4 (video with audio)
- Handle several links at once
- Supports YouTube and other common video sites (youtube.com, youtu.be, etc.)

Examples:
- "download this as mp3: https://youtube.com/watch?v=..."
- "convert to mp3: [video link]"
- "download as mp4: [video link]"
- "get me the audio from [link]"
- "download these videos as mp3: [link1] [link2]"

Keywords: download, convert, mp3, mp4, youtube, video, audio"#;

const MEDIA_PROMPT: PromptTemplate = PromptTemplate::new(
    "media",
    r#"
{{context}}
User message: "{{message}}"

Extract:
1. Every video URL in the message (youtube.com, youtu.be, and similar)
2. The desired format: mp3 (audio) or mp4 (video)

If the user doesn't name a format:
- Use mp3 if they mention "audio", "song", "music" or "mp3"
- Use mp4 if they mention "video" or "mp4"
- Otherwise use mp3
If they ask for some other format, return that format name as given.

Return ONLY valid JSON:
{"urls": ["url1", "url2"], "format": "mp3"}

Examples:
"download as mp3: https://youtube.com/watch?v=abc" -> {"urls": ["https://youtube.com/watch?v=abc"], "format": "mp3"}
"convert to mp4: https://youtu.be/xyz" -> {"urls": ["https://youtu.be/xyz"], "format": "mp4"}
"#,
);

#[derive(Debug, Default, Deserialize)]
struct MediaRequest {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    format: Option<String>,
}

/// Downloads linked videos as MP3 or MP4.
pub struct MediaHandler {
    backend: Arc<dyn LlmBackend>,
    downloader: Arc<dyn MediaDownloader>,
    max_urls: usize,
    max_upload_mb: u64,
}

impl MediaHandler {
    /// Creates the handler with the default limits.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, downloader: Arc<dyn MediaDownloader>) -> Self {
        Self {
            backend,
            downloader,
            max_urls: DEFAULT_MAX_URLS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }

    /// Overrides the per-request link limit and the upload size limit.
    #[must_use]
    pub fn with_limits(mut self, max_urls: usize, max_upload_mb: u64) -> Self {
        self.max_urls = max_urls;
        self.max_upload_mb = max_upload_mb;
        self
    }

    async fn parse(&self, request: &HandlerRequest<'_>) -> HandlerResult<MediaRequest> {
        let prompt = MEDIA_PROMPT.render(&[
            ("context", &transcript(request.context)),
            ("message", request.text),
        ]);
        match LlmCall::new(MEDIA_PROMPT.name, prompt)
            .expecting_json()
            .json::<MediaRequest>(self.backend.as_ref())
            .await
        {
            Ok(parsed) => Ok(parsed),
            Err(e) => rate_limited_or(e, MediaRequest::default()),
        }
    }
}

/// Downloads every URL and builds the reply.
async fn download_batch(
    downloader: &dyn MediaDownloader,
    urls: &[String],
    format: MediaFormat,
    max_upload_mb: u64,
) -> Reply {
    let mut downloaded = 0usize;
    let mut attachments = Vec::new();
    let mut notes = Vec::new();
    let mut errors = Vec::new();

    for url in urls {
        match downloader.download(url, format).await {
            Ok(media) => {
                downloaded += 1;
                #[allow(clippy::cast_precision_loss)]
                let too_large = media.size_mb() > max_upload_mb as f64;
                if too_large {
                    warn!(file = %media.filename, size_mb = media.size_mb(), "file too large to upload");
                    notes.push(format!(
                        "⚠️ File too large ({:.1}MB): {}\nDiscord's limit is {max_upload_mb}MB for uploads.",
                        media.size_mb(),
                        media.filename
                    ));
                    if let Err(e) = tokio::fs::remove_file(&media.path).await {
                        debug!(path = %media.path.display(), error = %e, "could not remove oversized file");
                    }
                } else {
                    attachments.push(Attachment {
                        path: media.path,
                        filename: media.filename,
                        ephemeral: true,
                    });
                }
            }
            Err(e) => {
                warn!(url, error = %e.current_context(), "download failed");
                errors.push(format!("Failed to download {url}: {}", e.current_context()));
            }
        }
    }

    info!(
        requested = urls.len(),
        downloaded,
        attached = attachments.len(),
        failed = errors.len(),
        "media batch finished"
    );

    let mut text = if errors.is_empty() {
        format!("✅ Successfully downloaded {downloaded} file(s)!")
    } else if downloaded > 0 {
        format!(
            "⚠️ Downloaded {downloaded} file(s), but encountered {} error(s):\n{}",
            errors.len(),
            errors.join("\n")
        )
    } else {
        format!("❌ Failed to download any files:\n{}", errors.join("\n"))
    };
    for note in notes {
        text.push_str("\n\n");
        text.push_str(&note);
    }

    attachments
        .into_iter()
        .fold(Reply::text(text), Reply::with_attachment)
}

#[async_trait]
impl CapabilityHandler for MediaHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            name: "Media Download",
            description: "Download videos as MP3 audio or MP4 video",
            capabilities: CAPABILITIES,
        }
    }

    #[instrument(skip_all, fields(user_id = %request.user))]
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome> {
        let parsed = self.parse(&request).await?;

        let urls: Vec<String> = parsed
            .urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if urls.is_empty() {
            return Ok(HandlerOutcome::text(
                "I couldn't find any video URLs in your message. Please include at least one link.",
            ));
        }

        let requested = parsed.format.unwrap_or_else(|| "mp3".to_string());
        let Ok(format) = requested.parse::<MediaFormat>() else {
            return Ok(HandlerOutcome::text(format!(
                "Sorry, I can only convert to MP3 or MP4 format. You requested: {requested}"
            )));
        };

        if urls.len() > self.max_urls {
            return Ok(HandlerOutcome::text(format!(
                "I can download up to {} videos at once. Please try again with fewer URLs.",
                self.max_urls
            )));
        }

        if let [url] = urls.as_slice() {
            request
                .status
                .post(&format!("⏳ Downloading as {format}... This may take a moment."))
                .await;
            let reply = download_batch(
                self.downloader.as_ref(),
                std::slice::from_ref(url),
                format,
                self.max_upload_mb,
            )
            .await;
            return Ok(HandlerOutcome::Reply(reply));
        }

        let listed: Vec<String> = urls.iter().map(|url| format!("• {url}")).collect();
        let prompt = format!(
            "Download {} videos as {format}?\n{}\n\nReply **yes** to confirm or **no** to cancel.",
            urls.len(),
            listed.join("\n")
        );
        let description = format!("download {} videos as {format}", urls.len());
        let downloader = Arc::clone(&self.downloader);
        let max_upload_mb = self.max_upload_mb;
        Ok(HandlerOutcome::confirm(
            prompt,
            description,
            deferred(move || async move {
                Ok(download_batch(downloader.as_ref(), &urls, format, max_upload_mb).await)
            }),
        ))
    }
}
