//! Classifies replies to a pending confirmation.

use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const CLASSIFY_PROMPT: PromptTemplate = PromptTemplate::new(
    "classify_confirmation",
    r#"
A user was asked to confirm or cancel a pending action: {{action}}.
Their reply: "{{message}}"

Return JSON: {"classification": "confirm"} if they agree, {"classification": "cancel"} if they decline, or {"classification": "other"} if the message is unrelated to a confirmation.
"#,
);

/// How a reply relates to the pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    /// Run the action.
    Confirm,
    /// Drop the action.
    Cancel,
    /// Unrelated message.
    Other,
}

#[derive(Deserialize)]
struct Classification {
    classification: Option<String>,
}

/// LLM-backed confirm / cancel / other classifier.
#[derive(Clone)]
pub struct ConfirmationClassifier {
    backend: Arc<dyn LlmBackend>,
}

impl std::fmt::Debug for ConfirmationClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationClassifier")
            .field("model", &self.backend.model())
            .finish()
    }
}

impl ConfirmationClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Classifies `text` as a reply to the action described by `pending`.
    ///
    /// Any failure, and any label other than confirm or cancel, counts as
    /// [`Confirmation::Other`].
    pub async fn classify(&self, text: &str, pending: &str) -> Confirmation {
        let prompt = CLASSIFY_PROMPT.render(&[("action", pending), ("message", text)]);
        let result = LlmCall::new(CLASSIFY_PROMPT.name, prompt)
            .expecting_json()
            .with_temperature(0.0)
            .json::<Classification>(self.backend.as_ref())
            .await;

        let classification = match result {
            Ok(c) => match c.classification.as_deref().map(str::trim) {
                Some(label) if label.eq_ignore_ascii_case("confirm") => Confirmation::Confirm,
                Some(label) if label.eq_ignore_ascii_case("cancel") => Confirmation::Cancel,
                _ => Confirmation::Other,
            },
            Err(e) => {
                warn!(error = %e, "confirmation classification failed");
                Confirmation::Other
            }
        };
        debug!(?classification, "classified confirmation reply");
        classification
    }
}
