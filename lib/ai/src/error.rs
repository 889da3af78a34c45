//! Error types for the AI crate.
//!
//! `LlmError` covers every way a single LLM call can fail. Rate-limit
//! conditions get their own variant because callers surface them to users
//! differently from every other failure.

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The request never produced an HTTP response.
    RequestFailed { reason: String },
    /// The provider answered with a non-success status.
    HttpStatus { status: u16, body: String },
    /// The provider rejected the call because a quota was exhausted.
    RateLimited {
        retry_after_secs: Option<u64>,
        detail: String,
    },
    /// The provider's answer could not be decoded.
    ResponseParseFailed { reason: String },
    /// The provider answered without any text.
    EmptyResponse,
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl LlmError {
    /// Returns true for quota / rate-limit failures.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::HttpStatus { status, body } => *status == 429 || is_rate_limit_message(body),
            Self::RequestFailed { reason } => is_rate_limit_message(reason),
            _ => false,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "LLM request failed: {reason}"),
            Self::HttpStatus { status, body } => {
                write!(f, "LLM provider returned {status}: {body}")
            }
            Self::RateLimited {
                retry_after_secs,
                detail,
            } => {
                write!(f, "429 RESOURCE_EXHAUSTED: rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {secs}s")?;
                }
                if !detail.is_empty() {
                    write!(f, " ({detail})")?;
                }
                Ok(())
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::EmptyResponse => write!(f, "LLM returned an empty response"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Returns true when an error text carries one of the provider's rate-limit
/// markers: a `429` status, `RESOURCE_EXHAUSTED`, or any mention of a quota.
#[must_use]
pub fn is_rate_limit_message(text: &str) -> bool {
    text.contains("429")
        || text.contains("RESOURCE_EXHAUSTED")
        || text.to_lowercase().contains("quota")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_markers() {
        assert!(is_rate_limit_message("HTTP 429 Too Many Requests"));
        assert!(is_rate_limit_message("status: RESOURCE_EXHAUSTED"));
        assert!(is_rate_limit_message("You exceeded your current Quota"));
        assert!(!is_rate_limit_message("connection refused"));
    }

    #[test]
    fn rate_limited_display_carries_markers() {
        let err = LlmError::RateLimited {
            retry_after_secs: Some(30),
            detail: String::new(),
        };
        let text = err.to_string();
        assert!(is_rate_limit_message(&text));
        assert!(text.contains("30s"));
    }

    #[test]
    fn http_status_429_counts_as_rate_limited() {
        let err = LlmError::HttpStatus {
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(err.is_rate_limited());

        let err = LlmError::HttpStatus {
            status: 500,
            body: "internal".to_string(),
        };
        assert!(!err.is_rate_limited());
    }
}
