//! Intent router.
//!
//! One LLM call per message picks a handler. The model sees the recent
//! transcript, the message, and every registered handler's descriptor, and
//! answers with a [`RoutingVerdict`]. A verdict is accepted only when it
//! names a registered handler with confidence at or above the threshold.
//!
//! Routing never fails outward: transport errors, quota errors and
//! malformed JSON all come back as "no handler".

use crate::handler::{CapabilityHandler, HandlerDescriptor};
use crate::persona::BOT_NAME;
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_conversation::{Turn, format_transcript};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default minimum confidence for accepting a verdict.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

const ROUTING_PROMPT: PromptTemplate = PromptTemplate::new(
    "route",
    r#"
You are an intelligent routing system for a personal assistant bot.

{{context}}
User message: "{{message}}"

Available features:
{{features}}

Your task: Determine which feature should handle this user's message.

Rules:
1. Analyze what the user is trying to accomplish
2. Consider the conversation context above (if any) to understand references like "it", "that", "the event"
3. Match their intent to the most appropriate feature
4. Consider the capabilities and examples of each feature
5. If the message doesn't clearly match any feature, return feature_index: null
6. Be generous with calendar - if someone mentions time/date/event, it's probably calendar

Return ONLY valid JSON with this structure:
{
  "feature_index": <index of best matching feature, or null>,
  "confidence": <confidence level 0.0-1.0>,
  "reasoning": "<brief explanation of why this feature matches>"
}

Examples:
- "Meeting tomorrow at 3pm" -> calendar feature (high confidence)
- After creating an event, user says "make it 2 hours" -> calendar feature (using context)
- "Remind me to call mom" -> reminder feature if available, else null
- "What's the weather?" -> search feature if available, else null
- "Random chat message" -> conversation feature (low confidence)
"#,
);

/// The model's routing answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingVerdict {
    /// Index into the registry, or none.
    #[serde(default)]
    pub feature_index: Option<i64>,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
    /// Free-text rationale.
    #[serde(default)]
    pub reasoning: String,
}

/// Outcome of a routing attempt, with enough detail for logging and for the
/// dispatcher to pick a fallback message.
#[derive(Clone)]
pub enum RouteDecision {
    /// A handler was accepted.
    Matched {
        handler: Arc<dyn CapabilityHandler>,
        verdict: RoutingVerdict,
    },
    /// The model answered but nothing was accepted.
    NoMatch { verdict: RoutingVerdict },
    /// The call failed or the answer could not be decoded.
    Failed { rate_limited: bool },
}

impl RouteDecision {
    /// Returns the accepted handler, if any.
    #[must_use]
    pub fn handler(&self) -> Option<Arc<dyn CapabilityHandler>> {
        match self {
            Self::Matched { handler, .. } => Some(Arc::clone(handler)),
            Self::NoMatch { .. } | Self::Failed { .. } => None,
        }
    }
}

impl fmt::Debug for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { handler, verdict } => f
                .debug_struct("Matched")
                .field("handler", &handler.descriptor().name)
                .field("verdict", verdict)
                .finish(),
            Self::NoMatch { verdict } => {
                f.debug_struct("NoMatch").field("verdict", verdict).finish()
            }
            Self::Failed { rate_limited } => f
                .debug_struct("Failed")
                .field("rate_limited", rate_limited)
                .finish(),
        }
    }
}

#[derive(Serialize)]
struct FeatureEntry {
    index: usize,
    #[serde(flatten)]
    descriptor: HandlerDescriptor,
}

/// Routes messages to registered handlers.
pub struct IntentRouter {
    backend: Arc<dyn LlmBackend>,
    handlers: Vec<Arc<dyn CapabilityHandler>>,
    threshold: f64,
}

impl fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.handlers.iter().map(|h| h.descriptor().name).collect();
        f.debug_struct("IntentRouter")
            .field("model", &self.backend.model())
            .field("handlers", &names)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl IntentRouter {
    /// Creates a router with the default threshold and no handlers.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            handlers: Vec::new(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Sets the acceptance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Appends a handler to the registry.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) {
        let descriptor = handler.descriptor();
        info!(
            handler = descriptor.name,
            index = self.handlers.len(),
            "registered handler"
        );
        self.handlers.push(handler);
    }

    /// Returns the registered handlers in index order.
    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn CapabilityHandler>] {
        &self.handlers
    }

    /// Returns the acceptance threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the handler for `text`, or `None`.
    pub async fn route(&self, text: &str, context: &[Turn]) -> Option<Arc<dyn CapabilityHandler>> {
        self.route_decision(text, context).await.handler()
    }

    /// Routes `text` and reports why a handler was or wasn't chosen.
    #[instrument(skip(self, context), fields(context_len = context.len()))]
    pub async fn route_decision(&self, text: &str, context: &[Turn]) -> RouteDecision {
        if self.handlers.is_empty() {
            return RouteDecision::NoMatch {
                verdict: RoutingVerdict {
                    feature_index: None,
                    confidence: 0.0,
                    reasoning: "no handlers registered".to_string(),
                },
            };
        }

        let prompt = match self.routing_prompt(text, context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "could not describe handlers for routing");
                return RouteDecision::Failed {
                    rate_limited: false,
                };
            }
        };

        let verdict: RoutingVerdict = match LlmCall::new(ROUTING_PROMPT.name, prompt)
            .expecting_json()
            .with_temperature(0.0)
            .json(self.backend.as_ref())
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                let rate_limited = e.is_rate_limited();
                warn!(error = %e, rate_limited, "routing failed, treating as no match");
                return RouteDecision::Failed { rate_limited };
            }
        };

        self.accept(verdict)
    }

    fn accept(&self, verdict: RoutingVerdict) -> RouteDecision {
        let Some(index) = verdict.feature_index else {
            debug!(reasoning = %verdict.reasoning, "model picked no handler");
            return RouteDecision::NoMatch { verdict };
        };

        if verdict.confidence < self.threshold {
            debug!(
                index,
                confidence = verdict.confidence,
                threshold = self.threshold,
                "confidence below threshold"
            );
            return RouteDecision::NoMatch { verdict };
        }

        let handler = usize::try_from(index)
            .ok()
            .and_then(|i| self.handlers.get(i));
        match handler {
            Some(handler) => {
                info!(
                    handler = handler.descriptor().name,
                    confidence = verdict.confidence,
                    reasoning = %verdict.reasoning,
                    "routed message"
                );
                RouteDecision::Matched {
                    handler: Arc::clone(handler),
                    verdict,
                }
            }
            None => {
                warn!(index, registered = self.handlers.len(), "model picked an unknown handler");
                RouteDecision::NoMatch { verdict }
            }
        }
    }

    fn routing_prompt(&self, text: &str, context: &[Turn]) -> Result<String, serde_json::Error> {
        let features: Vec<FeatureEntry> = self
            .handlers
            .iter()
            .enumerate()
            .map(|(index, h)| FeatureEntry {
                index,
                descriptor: h.descriptor(),
            })
            .collect();
        let features = serde_json::to_string_pretty(&features)?;
        let transcript = format_transcript(context, BOT_NAME);

        Ok(ROUTING_PROMPT.render(&[
            ("context", &transcript),
            ("features", &features),
            ("message", text),
        ]))
    }

    /// Returns one `• **Name**: description` line per handler.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.handlers.is_empty() {
            return "No features available".to_string();
        }
        self.handlers
            .iter()
            .map(|h| {
                let d = h.descriptor();
                format!("• **{}**: {}", d.name, d.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
