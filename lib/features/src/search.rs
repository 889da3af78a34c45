//! Factual questions, answered with web grounding.

use crate::common::{rate_limited_or, transcript};
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_assistant::persona::PERSONALITY;
use alfred_assistant::{
    CapabilityHandler, HandlerDescriptor, HandlerOutcome, HandlerRequest, HandlerResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

const FALLBACK: &str = "I ran into an issue while searching for that. Try rephrasing your question.";

const CAPABILITIES: &str = r#"This feature handles factual questions, research queries, and general knowledge lookups.
It can search the web for current information when needed.

Examples of what this feature handles:

Factual / explanatory questions:
- "How does photosynthesis work?"
- "What is the difference between ML and AI?"
- "Explain quantum entanglement simply"
- "What causes a solar eclipse?"

Current / real-world information:
- "What is the travel time from San Diego to Los Angeles?"
- "What's the weather like in Tokyo right now?"
- "Who won the Super Bowl this year?"
- "What is the current price of gold?"

How-to and practical questions:
- "How do I fix a merge conflict in git?"
- "How do I make sourdough bread?"

Comparisons and recommendations:
- "What's the difference between Python and JavaScript?"
- "What are the pros and cons of intermittent fasting?"

This feature should be used for any question that expects a factual, researched, or
informative answer, as opposed to casual small talk or task actions (calendar, downloads, etc.)."#;

const SEARCH_PROMPT: PromptTemplate = PromptTemplate::new(
    "search",
    r#"
{{personality}}

{{context}}
The user is asking a question that requires a factual or researched answer.
Use Google Search if you need current or specific information.

User question: "{{message}}"

Answer clearly and concisely:
- A few sentences for simple questions
- More detail for complex or multi-part questions
- Use plain prose, not bullet points, unless listing things is genuinely clearer
- Do not add filler like "Great question!" or "Certainly!"
- Do not mention that you searched or used any tools
- Just give the answer directly
"#,
);

/// Answers questions using the model's web search tool.
pub struct SearchHandler {
    backend: Arc<dyn LlmBackend>,
}

impl SearchHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CapabilityHandler for SearchHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            name: "Search",
            description: "Answer factual questions and general knowledge searches",
            capabilities: CAPABILITIES,
        }
    }

    #[instrument(skip_all, fields(user_id = %request.user))]
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome> {
        let prompt = SEARCH_PROMPT.render(&[
            ("personality", PERSONALITY),
            ("context", &transcript(request.context)),
            ("message", request.text),
        ]);

        let answer = match LlmCall::new(SEARCH_PROMPT.name, prompt)
            .with_web_search()
            .text(self.backend.as_ref())
            .await
        {
            Ok(answer) => answer,
            Err(e) => rate_limited_or(e, FALLBACK.to_string())?,
        };
        Ok(HandlerOutcome::text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_ai::{LlmError, ScriptedBackend};
    use alfred_assistant::{NoStatus, Reply};
    use alfred_core::UserId;

    fn request(text: &str) -> HandlerRequest<'_> {
        HandlerRequest {
            user: UserId::new(1),
            text,
            context: &[],
            status: &NoStatus,
        }
    }

    fn reply_text(outcome: HandlerOutcome) -> String {
        match outcome {
            HandlerOutcome::Reply(Reply { text, .. }) => text,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn answers_with_web_search_enabled() {
        let backend = Arc::new(ScriptedBackend::new().reply("  Rayleigh scattering.  "));
        let handler = SearchHandler::new(backend.clone());

        let outcome = handler.handle(request("Why is the sky blue?")).await.expect("handle");
        assert_eq!(reply_text(outcome), "Rayleigh scattering.");

        let sent = &backend.requests()[0];
        assert!(sent.web_search);
        assert!(sent.prompt.contains("User question: \"Why is the sky blue?\""));
    }

    #[tokio::test]
    async fn ordinary_failure_gets_friendly_text() {
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::HttpStatus {
            status: 500,
            body: "oops".to_string(),
        }));
        let outcome = SearchHandler::new(backend)
            .handle(request("q"))
            .await
            .expect("handle");
        assert_eq!(reply_text(outcome), FALLBACK);
    }

    #[tokio::test]
    async fn rate_limit_propagates() {
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::RateLimited {
            retry_after_secs: None,
            detail: String::new(),
        }));
        let err = SearchHandler::new(backend).handle(request("q")).await.unwrap_err();
        assert!(err.current_context().is_rate_limited());
    }
}
