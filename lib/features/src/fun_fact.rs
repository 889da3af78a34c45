//! Fun facts.

use crate::common::{TextResponse, rate_limited_or, transcript};
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_assistant::{
    CapabilityHandler, HandlerDescriptor, HandlerOutcome, HandlerRequest, HandlerResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

const FALLBACK: &str = "Sorry, I couldn't retrieve a fun fact right now. Please try again!";

const FUN_FACT_PROMPT: PromptTemplate = PromptTemplate::new(
    "fun_fact",
    r#"
{{context}}You are Alfred, a knowledgeable assistant. Provide a single interesting fun fact.

Requirements:
- Keep it brief (2-3 sentences max)
- Make it genuinely interesting and accurate
- Use a friendly, engaging tone
- Don't start with "Here's a fun fact" or similar, just state the fact
- If the conversation suggests a topic, you can pick a related fact

Return JSON: {"response": "the fun fact here"}
"#,
);

/// Shares a short piece of trivia.
pub struct FunFactHandler {
    backend: Arc<dyn LlmBackend>,
}

impl FunFactHandler {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CapabilityHandler for FunFactHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            name: "FunFact",
            description: "Provide interesting random facts",
            capabilities: "This feature can:\n\
                - Provide interesting random facts\n\
                - Share trivia and knowledge\n\n\
                Examples of what this feature handles:\n\
                - \"Tell me a fun fact\"\n\
                - \"Give me an interesting fact\"\n\
                - \"Tell me something interesting\"\n\
                - \"Got any fun facts?\"",
        }
    }

    #[instrument(skip_all, fields(user_id = %request.user))]
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome> {
        let prompt = FUN_FACT_PROMPT.render(&[("context", &transcript(request.context))]);
        let fact = match LlmCall::new(FUN_FACT_PROMPT.name, prompt)
            .expecting_json()
            .with_temperature(1.0)
            .json::<TextResponse>(self.backend.as_ref())
            .await
        {
            Ok(reply) if !reply.response.trim().is_empty() => reply.response,
            Ok(_) => FALLBACK.to_string(),
            Err(e) => rate_limited_or(e, FALLBACK.to_string())?,
        };
        Ok(HandlerOutcome::text(fact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_ai::{LlmError, ScriptedBackend};
    use alfred_assistant::{NoStatus, Reply};
    use alfred_conversation::Turn;
    use alfred_core::UserId;

    async fn fact(backend: Arc<ScriptedBackend>, context: &[Turn]) -> HandlerResult<String> {
        let outcome = FunFactHandler::new(backend)
            .handle(HandlerRequest {
                user: UserId::new(5),
                text: "tell me a fun fact",
                context,
                status: &NoStatus,
            })
            .await?;
        match outcome {
            HandlerOutcome::Reply(Reply { text, .. }) => Ok(text),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn returns_the_fact() {
        let backend = Arc::new(
            ScriptedBackend::new().reply(r#"{"response": "Octopuses have three hearts."}"#),
        );
        let context = [Turn::user("we were talking about the sea")];

        let text = fact(backend.clone(), &context).await.expect("fact");
        assert_eq!(text, "Octopuses have three hearts.");

        let sent = &backend.requests()[0];
        assert!(sent.json_output);
        assert_eq!(sent.temperature, Some(1.0));
        assert!(sent.prompt.contains("User: we were talking about the sea"));
    }

    #[tokio::test]
    async fn malformed_answer_falls_back() {
        let backend = Arc::new(ScriptedBackend::new().reply("Octopuses have three hearts."));
        assert_eq!(fact(backend, &[]).await.expect("fact"), FALLBACK);
    }

    #[tokio::test]
    async fn rate_limit_propagates() {
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::RateLimited {
            retry_after_secs: None,
            detail: String::new(),
        }));
        assert!(fact(backend, &[]).await.is_err());
    }
}
