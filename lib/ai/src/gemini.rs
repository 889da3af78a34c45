//! Google Gemini backend.
//!
//! Calls the non-streaming `generateContent` endpoint once per request.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
use crate::error::{LlmError, is_rate_limit_message};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model id.
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl GeminiConfig {
    /// Creates a configuration with the default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

/// An [`LlmBackend`] talking to the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: HttpClient,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Creates a backend.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] when the API key is empty.
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        Self::with_client(HttpClient::new(), config)
    }

    /// Creates a backend reusing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] when the API key is empty.
    pub fn with_client(http: HttpClient, config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "Gemini API key is empty".to_string(),
            });
        }
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Builds the `generateContent` request body.
fn request_body(request: &LlmRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": request.prompt}],
        }],
    });

    let mut generation = serde_json::Map::new();
    if request.json_output {
        generation.insert("responseMimeType".into(), json!("application/json"));
    }
    if let Some(temperature) = request.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if !generation.is_empty() {
        body["generationConfig"] = serde_json::Value::Object(generation);
    }

    if request.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    body
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Maps a non-success HTTP answer onto an [`LlmError`].
fn status_error(status: StatusCode, retry_after: Option<u64>, body: String) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        return LlmError::RateLimited {
            retry_after_secs: retry_after,
            detail: body,
        };
    }
    if is_rate_limit_message(&body) && status.is_client_error() {
        return LlmError::RateLimited {
            retry_after_secs: retry_after,
            detail: body,
        };
    }
    LlmError::HttpStatus {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model, json = request.json_output))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, body));
        }

        let payload: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let content: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        let usage = payload
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: payload
                .model_version
                .unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
