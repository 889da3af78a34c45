//! Small talk. Also the handler the router picks for greetings and
//! questions about the bot itself.

use crate::common::{TextResponse, rate_limited_or, transcript};
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_assistant::persona::PERSONALITY;
use alfred_assistant::{
    BOT_NAME, CapabilityHandler, HandlerDescriptor, HandlerOutcome, HandlerRequest, HandlerResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

const CAPABILITIES: &str = r#"This feature handles casual conversation and small talk only.

Examples of what this feature handles:
- "Hello", "Hi", "Hey Alfred"
- "How are you?", "What's up?"
- "What can you do?", "Help me"
- "Thanks!", "Thank you"
- Questions about the bot itself
- Casual banter with no factual answer needed

This is a FALLBACK feature. Use it ONLY when the message is social/conversational with no
factual content. Do NOT use it for questions that have a real answer (e.g. "why does X happen",
"how does Y work", "what is Z"); those belong to the Search feature."#;

const CONVERSATION_PROMPT: PromptTemplate = PromptTemplate::new(
    "conversation",
    r#"
{{personality}}

{{context}}
User message: "{{message}}"

You are Alfred responding to the user. Keep your response:
- Under 2-3 sentences
- Friendly but concise
- Task-oriented (gently guide toward how you can help)
- Consistent with the conversation above
- Never address the user as "Alfred"; YOU are Alfred, THEY are the user

If the user is greeting you or making small talk, respond warmly and briefly offer to help.
If they ask what you can do, describe your capabilities.
If they ask deep or philosophical questions, politely redirect to what you can actually do.

Return JSON: {"response": "your reply here"}
"#,
);

fn fallback() -> String {
    format!(
        "Hello! I'm {BOT_NAME}, your assistant. I can help with calendar events and more. What would you like to do?"
    )
}

/// Greets, chats briefly and steers back to tasks.
pub struct ConversationHandler {
    backend: Arc<dyn LlmBackend>,
}

impl ConversationHandler {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CapabilityHandler for ConversationHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            name: "Conversation",
            description: "Handle greetings, small talk, and general questions",
            capabilities: CAPABILITIES,
        }
    }

    #[instrument(skip_all, fields(user_id = %request.user))]
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome> {
        let prompt = CONVERSATION_PROMPT.render(&[
            ("personality", PERSONALITY),
            ("context", &transcript(request.context)),
            ("message", request.text),
        ]);

        let text = match LlmCall::new(CONVERSATION_PROMPT.name, prompt)
            .expecting_json()
            .json::<TextResponse>(self.backend.as_ref())
            .await
        {
            Ok(reply) if !reply.response.trim().is_empty() => reply.response,
            Ok(_) => fallback(),
            Err(e) => rate_limited_or(e, fallback())?,
        };
        Ok(HandlerOutcome::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_ai::{LlmError, ScriptedBackend};
    use alfred_assistant::NoStatus;
    use alfred_core::UserId;

    async fn chat(backend: Arc<ScriptedBackend>, text: &str) -> HandlerResult<HandlerOutcome> {
        ConversationHandler::new(backend)
            .handle(HandlerRequest {
                user: UserId::new(9),
                text,
                context: &[],
                status: &NoStatus,
            })
            .await
    }

    fn text_of(outcome: HandlerOutcome) -> String {
        match outcome {
            HandlerOutcome::Reply(reply) => reply.text,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn replies_in_persona() {
        let backend = Arc::new(
            ScriptedBackend::new().reply(r#"{"response": "Hello! How can I help you today?"}"#),
        );
        let outcome = chat(backend.clone(), "Hey Alfred!").await.expect("chat");
        assert_eq!(text_of(outcome), "Hello! How can I help you today?");

        let prompt = &backend.requests()[0].prompt;
        assert!(prompt.starts_with("You are Alfred"));
        assert!(prompt.contains("User message: \"Hey Alfred!\""));
    }

    #[tokio::test]
    async fn failure_uses_greeting() {
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::RequestFailed {
            reason: "connection reset".to_string(),
        }));
        let outcome = chat(backend, "hi").await.expect("chat");
        assert_eq!(text_of(outcome), fallback());
        assert!(fallback().contains("I'm Alfred"));
    }

    #[tokio::test]
    async fn rate_limit_propagates() {
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::RateLimited {
            retry_after_secs: None,
            detail: String::new(),
        }));
        assert!(chat(backend, "hi").await.is_err());
    }
}
