//! Capability handler contract.
//!
//! A handler owns one task domain (calendar, search, ...). The router picks
//! a handler from its descriptor; the dispatcher then calls
//! [`CapabilityHandler::handle`] and relays whatever comes back.

use crate::error::HandlerError;
use alfred_conversation::Turn;
use alfred_core::UserId;
use async_trait::async_trait;
use futures::future::BoxFuture;
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

/// Static description of a handler, used in routing prompts and help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    /// Display name, e.g. "Calendar".
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Longer capability text with example requests.
    pub capabilities: &'static str,
}

/// A file to upload alongside a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Where the file lives on disk.
    pub path: PathBuf,
    /// Name shown to the user.
    pub filename: String,
    /// The transport deletes the file once it has been sent.
    pub ephemeral: bool,
}

/// Text (and files) sent back for one inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Message text.
    pub text: String,
    /// Files to upload after the text.
    pub attachments: Vec<Attachment>,
}

impl Reply {
    /// Creates a text-only reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Result type shared by handlers and deferred actions.
pub type HandlerResult<T> = Result<T, Report<HandlerError>>;

/// A zero-argument operation run only after the user confirms.
pub type DeferredAction = Box<dyn FnOnce() -> BoxFuture<'static, HandlerResult<Reply>> + Send>;

/// Boxes an async closure as a [`DeferredAction`].
pub fn deferred<F, Fut>(action: F) -> DeferredAction
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = HandlerResult<Reply>> + Send + 'static,
{
    Box::new(move || Box::pin(action()))
}

/// What a handler produced.
pub enum HandlerOutcome {
    /// Relay this straight away.
    Reply(Reply),
    /// Ask the user first; run `action` if they agree.
    NeedsConfirmation {
        /// Question shown to the user.
        prompt: String,
        /// Short description used in logs and the discard note.
        description: String,
        /// The destructive operation.
        action: DeferredAction,
    },
}

impl HandlerOutcome {
    /// Creates a text-only reply outcome.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply(Reply::text(text))
    }

    /// Creates an outcome that waits for confirmation.
    #[must_use]
    pub fn confirm(
        prompt: impl Into<String>,
        description: impl Into<String>,
        action: DeferredAction,
    ) -> Self {
        Self::NeedsConfirmation {
            prompt: prompt.into(),
            description: description.into(),
            action,
        }
    }
}

impl fmt::Debug for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(reply) => f.debug_tuple("Reply").field(reply).finish(),
            Self::NeedsConfirmation {
                prompt,
                description,
                ..
            } => f
                .debug_struct("NeedsConfirmation")
                .field("prompt", prompt)
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

/// Receives progress messages while a handler runs.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Posts an interim message to the user.
    async fn post(&self, text: &str);
}

/// A [`StatusSink`] that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

#[async_trait]
impl StatusSink for NoStatus {
    async fn post(&self, _text: &str) {}
}

/// Everything a handler gets for one message.
#[derive(Clone, Copy)]
pub struct HandlerRequest<'a> {
    /// Sender.
    pub user: UserId,
    /// Message text with any bot mention removed.
    pub text: &'a str,
    /// Recent turns, oldest first, not including this message.
    pub context: &'a [Turn],
    /// Where to post progress messages.
    pub status: &'a dyn StatusSink,
}

impl fmt::Debug for HandlerRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRequest")
            .field("user", &self.user)
            .field("text", &self.text)
            .field("context_len", &self.context.len())
            .finish_non_exhaustive()
    }
}

/// A unit implementing one task domain.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Returns the handler's static description.
    fn descriptor(&self) -> HandlerDescriptor;

    /// Handles one message.
    ///
    /// # Errors
    ///
    /// Returns an error when the work could not be done; the dispatcher
    /// renders it for the user.
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome>;
}
