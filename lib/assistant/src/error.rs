//! Error types for the assistant crate.
//!
//! `HandlerError` is the only error that crosses the handler boundary. The
//! dispatcher turns it into user-facing text, so every variant must render
//! something a user can read.

use alfred_ai::{LlmError, is_rate_limit_message};
use rootcause::prelude::Report;
use std::fmt;

/// Errors raised by capability handlers and deferred actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// An LLM call failed.
    Llm(LlmError),
    /// A downstream service (calendar, downloader) failed.
    Service {
        service: &'static str,
        reason: String,
    },
}

impl HandlerError {
    /// Creates a service error.
    #[must_use]
    pub fn service(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Service {
            service,
            reason: reason.into(),
        }
    }

    /// Returns true for quota / rate-limit failures.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_rate_limited(),
            Self::Service { reason, .. } => is_rate_limit_message(reason),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm(e) => write!(f, "{e}"),
            Self::Service { service, reason } => write!(f, "{service} failed: {reason}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<LlmError> for HandlerError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}

/// Returns true if a handler report describes a rate-limit condition.
#[must_use]
pub fn is_rate_limited(report: &Report<HandlerError>) -> bool {
    let context = report.current_context();
    context.is_rate_limited() || is_rate_limit_message(&context.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_rate_limit_is_detected() {
        let err = HandlerError::from(LlmError::RateLimited {
            retry_after_secs: Some(3),
            detail: String::new(),
        });
        assert!(err.is_rate_limited());

        let report: Report<HandlerError> = err.into();
        assert!(is_rate_limited(&report));
    }

    #[test]
    fn service_message_with_marker_is_rate_limited() {
        let err = HandlerError::service("calendar", "HTTP 429 Too Many Requests");
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "calendar failed: HTTP 429 Too Many Requests");
    }

    #[test]
    fn ordinary_failures_are_not_rate_limited() {
        let err = HandlerError::service("calendar", "no such event");
        assert!(!err.is_rate_limited());
        assert!(!HandlerError::Llm(LlmError::EmptyResponse).is_rate_limited());
    }
}
