//! Helpers shared by the handlers.

use alfred_ai::LlmError;
use alfred_assistant::{BOT_NAME, HandlerError, HandlerResult};
use alfred_conversation::{Turn, format_transcript};
use serde::Deserialize;

/// The `{"response": "..."}` shape used by the conversational prompts.
#[derive(Debug, Deserialize)]
pub(crate) struct TextResponse {
    pub response: String,
}

/// Renders the recent conversation for a prompt.
pub(crate) fn transcript(context: &[Turn]) -> String {
    format_transcript(context, BOT_NAME)
}

/// Lets rate limits through to the dispatcher and swaps anything else for
/// `fallback`.
pub(crate) fn rate_limited_or<T>(error: LlmError, fallback: T) -> HandlerResult<T> {
    if error.is_rate_limited() {
        return Err(HandlerError::from(error).into());
    }
    Ok(fallback)
}
