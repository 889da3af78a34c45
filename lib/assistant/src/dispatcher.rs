//! Message dispatcher.
//!
//! Entry point for one inbound message. The sequence is:
//!
//! 1. read the sender's recent context, then record the message
//! 2. if a confirmation is pending, classify the message; confirm runs the
//!    stored action, cancel drops it, anything else drops it and carries on
//! 3. route the message and invoke the chosen handler
//! 4. relay the handler's reply, or stage its deferred action and relay the
//!    question
//! 5. with no handler, relay the capability summary
//!
//! Handler and action errors never escape: they become a rate-limit notice
//! or a generic error message.

use crate::confirmation::{Confirmation, ConfirmationClassifier};
use crate::error::{HandlerError, is_rate_limited};
use crate::handler::{DeferredAction, HandlerOutcome, HandlerRequest, Reply, StatusSink};
use crate::notices;
use crate::router::{IntentRouter, RouteDecision};
use alfred_conversation::{ContextStore, PendingAction, PendingConfirmations, TurnRole};
use alfred_core::UserId;
use rootcause::prelude::Report;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Default command prefix shown in the no-match help hint.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

/// Drives one message through context, confirmation, routing and handling.
pub struct Dispatcher {
    router: IntentRouter,
    classifier: ConfirmationClassifier,
    context: ContextStore,
    pending: PendingConfirmations<DeferredAction>,
    command_prefix: String,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("context", &self.context.policy())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher that owns the per-user state.
    #[must_use]
    pub fn new(router: IntentRouter, classifier: ConfirmationClassifier, context: ContextStore) -> Self {
        Self {
            router,
            classifier,
            context,
            pending: PendingConfirmations::new(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
        }
    }

    /// Sets the prefix used in the `help` hint.
    #[must_use]
    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    /// Returns the context store.
    #[must_use]
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Returns true if `user` has an action awaiting confirmation.
    #[must_use]
    pub fn has_pending(&self, user: UserId) -> bool {
        self.pending.has_pending(user)
    }

    /// Handles one inbound message and returns what to send back.
    #[instrument(skip(self, status), fields(user_id = %user))]
    pub async fn dispatch(&self, user: UserId, text: &str, status: &dyn StatusSink) -> Reply {
        let context = self.context.get(user);
        info!(context_len = context.len(), "inbound message");
        self.context.append(user, TurnRole::User, text);

        let mut discarded = None;
        if let Some(description) = self.pending.describe(user) {
            match self.classifier.classify(text, &description).await {
                Confirmation::Confirm => {
                    let reply = match self.pending.take(user) {
                        Some(pending) => self.run_pending(pending).await,
                        None => Reply::text(notices::CANCELLED),
                    };
                    return self.finish(user, reply, true);
                }
                Confirmation::Cancel => {
                    if let Some(pending) = self.pending.take(user) {
                        info!(pending_id = %pending.id, "pending action cancelled");
                    }
                    return self.finish(user, Reply::text(notices::CANCELLED), true);
                }
                Confirmation::Other => {
                    if let Some(pending) = self.pending.take(user) {
                        info!(
                            pending_id = %pending.id,
                            description = %pending.description,
                            "unrelated message discards pending action"
                        );
                        discarded = Some(pending.description);
                    }
                }
            }
        }

        let decision = self.router.route_decision(text, &context).await;
        let (mut reply, remember) = match decision {
            RouteDecision::Matched { handler, .. } => {
                let name = handler.descriptor().name;
                let request = HandlerRequest {
                    user,
                    text,
                    context: &context,
                    status,
                };
                match handler.handle(request).await {
                    Ok(HandlerOutcome::Reply(reply)) => (reply, true),
                    Ok(HandlerOutcome::NeedsConfirmation {
                        prompt,
                        description,
                        action,
                    }) => {
                        self.pending
                            .stage(PendingAction::new(user, description, action));
                        (Reply::text(prompt), true)
                    }
                    Err(report) => {
                        error!(handler = name, error = %report, "handler failed");
                        (self.render_error(&report), false)
                    }
                }
            }
            RouteDecision::NoMatch { .. } => (self.no_match(), true),
            RouteDecision::Failed { rate_limited: true } => {
                (Reply::text(notices::RATE_LIMIT), false)
            }
            RouteDecision::Failed { rate_limited: false } => (self.no_match(), true),
        };

        if let Some(description) = discarded {
            reply.text.push_str("\n\n");
            reply.text.push_str(&notices::discarded(&description));
        }
        self.finish(user, reply, remember)
    }

    async fn run_pending(&self, pending: PendingAction<DeferredAction>) -> Reply {
        info!(pending_id = %pending.id, description = %pending.description, "running confirmed action");
        match (pending.action)().await {
            Ok(reply) => reply,
            Err(report) => {
                error!(pending_id = %pending.id, error = %report, "confirmed action failed");
                self.render_error(&report)
            }
        }
    }

    fn render_error(&self, report: &Report<HandlerError>) -> Reply {
        if is_rate_limited(report) {
            warn!("rate limited");
            return Reply::text(notices::RATE_LIMIT);
        }
        Reply::text(notices::generic_error(&report.current_context().to_string()))
    }

    fn no_match(&self) -> Reply {
        Reply::text(notices::no_match(&self.router.summary(), &self.command_prefix))
    }

    fn finish(&self, user: UserId, reply: Reply, remember: bool) -> Reply {
        if remember {
            self.context.append(user, TurnRole::Assistant, reply.text.clone());
        }
        debug!(reply = %reply.text, attachments = reply.attachments.len(), "outbound reply");
        reply
    }
}
