//! A backend that replays canned answers.
//!
//! Used by the router, dispatcher and handler tests to drive LLM-dependent
//! code deterministically and to inspect the prompts it sent.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A mock backend that answers requests from a queue of scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply.
    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queues a reply after construction.
    pub fn push(&self, reply: Result<String, LlmError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(reply) => reply.map(|content| LlmResponse::text(content, "scripted")),
            None => Err(LlmError::RequestFailed {
                reason: "no scripted reply left".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records_requests() {
        let backend = ScriptedBackend::new().reply("first").fail(LlmError::EmptyResponse);

        let first = backend.generate(&LlmRequest::new("a")).await.expect("reply");
        assert_eq!(first.content, "first");

        let second = backend.generate(&LlmRequest::new("b")).await;
        assert_eq!(second.unwrap_err(), LlmError::EmptyResponse);

        let exhausted = backend.generate(&LlmRequest::new("c")).await;
        assert!(exhausted.is_err());

        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.requests()[1].prompt, "b");
    }
}
