//! Fixed user-facing texts produced by the dispatcher.

/// Reply when the user cancels a pending action.
pub const CANCELLED: &str = "Cancelled.";

/// Reply when any LLM quota is exhausted.
pub const RATE_LIMIT: &str = "⚠️ I'm currently experiencing API rate limit issues with Google Gemini.\n\n\
**What's happening:** The Gemini API quota has been exceeded.\n\n\
**What you can do:**\n\
• Wait a few minutes and try again\n\
• Check API usage at: https://ai.dev/rate-limit\n\
• The quota may reset at midnight PT\n\n\
Sorry for the inconvenience! This is a temporary issue with the free tier API limits.";

/// Reply when a handler fails for any other reason.
#[must_use]
pub fn generic_error(error: &str) -> String {
    format!("An error occurred while processing your request: {error}")
}

/// Reply when no handler matched.
#[must_use]
pub fn no_match(summary: &str, prefix: &str) -> String {
    format!(
        "I'm not sure how to help with that yet.\n\n\
         Here's what I can do:\n{summary}\n\n\
         Type `{prefix}help` for more information and examples."
    )
}

/// Note appended when an unrelated message drops a pending action.
#[must_use]
pub fn discarded(description: &str) -> String {
    format!("_(I've dropped the earlier request to {description}. Ask again if you still want it.)_")
}
