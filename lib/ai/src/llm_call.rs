//! LLM Call primitive.
//!
//! The fundamental AI operation: single-shot inference with an optional
//! strict-JSON contract. Every JSON answer the assistant asks for is decoded
//! through [`decode_json`], so malformed output is handled in one place.

use crate::backend::{LlmBackend, LlmRequest, TokenUsage};
use crate::error::LlmError;
use alfred_core::InvocationId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

/// The result of an LLM Call.
#[derive(Debug, Clone)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: InvocationId,
    /// The raw text output.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call executor.
///
/// A builder around [`LlmRequest`] that also handles logging and decoding.
#[derive(Debug, Clone)]
pub struct LlmCall {
    label: &'static str,
    request: LlmRequest,
}

impl LlmCall {
    /// Creates a new LLM Call with the given prompt.
    ///
    /// `label` names the call site in logs (e.g. `"route"`).
    #[must_use]
    pub fn new(label: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            label,
            request: LlmRequest::new(prompt),
        }
    }

    /// Requests a strict JSON response.
    #[must_use]
    pub fn expecting_json(mut self) -> Self {
        self.request.json_output = true;
        self
    }

    /// Lets the model ground its answer with a web search.
    #[must_use]
    pub fn with_web_search(mut self) -> Self {
        self.request.web_search = true;
        self
    }

    /// Sets the sampling temperature. Classification calls use 0.0 so the
    /// same message gets the same verdict.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    /// Returns the request this call will send.
    #[must_use]
    pub fn request(&self) -> &LlmRequest {
        &self.request
    }

    /// Sends the request once. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    pub async fn execute(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, LlmError> {
        let id = InvocationId::new();
        let started = Instant::now();

        let result = backend.generate(&self.request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                debug!(
                    invocation = %id,
                    call = self.label,
                    model = %response.model,
                    latency_ms,
                    tokens = response.usage.total(),
                    "LLM call completed"
                );
                Ok(LlmCallResult {
                    id,
                    content: response.content,
                    usage: response.usage,
                    model: response.model,
                    timestamp: Utc::now(),
                    latency_ms,
                })
            }
            Err(e) => {
                warn!(invocation = %id, call = self.label, latency_ms, error = %e, "LLM call failed");
                Err(e)
            }
        }
    }

    /// Sends the request and returns the trimmed text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmptyResponse`] if the model produced only whitespace.
    pub async fn text(&self, backend: &dyn LlmBackend) -> Result<String, LlmError> {
        let result = self.execute(backend).await?;
        let text = result.content.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    /// Sends the request and decodes the answer as `T`.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`LlmError::ResponseParseFailed`] if the
    /// answer does not match `T`.
    pub async fn json<T: DeserializeOwned>(&self, backend: &dyn LlmBackend) -> Result<T, LlmError> {
        let result = self.execute(backend).await?;
        decode_json(&result.content)
    }
}

/// Decodes an LLM answer that is supposed to be a JSON document.
///
/// Models sometimes wrap JSON in a markdown code fence even when asked not
/// to; a surrounding ```` ```json ```` or ```` ``` ```` fence is stripped
/// before parsing.
///
/// # Errors
///
/// Returns [`LlmError::ResponseParseFailed`] if the text is not valid JSON
/// for `T`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let body = strip_code_fence(raw.trim());
    serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
        reason: e.to_string(),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
