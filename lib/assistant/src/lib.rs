//! Message handling core of the Alfred assistant.
//!
//! This crate provides:
//!
//! - **Handler contract**: [`CapabilityHandler`] plus the reply, attachment
//!   and deferred-action types handlers produce
//! - **Intent Router**: one LLM call per message to pick a handler
//! - **Confirmation classifier**: confirm / cancel / other for pending actions
//! - **Dispatcher**: the per-message state machine tying it all together
//! - **Persona and notices**: the fixed texts users see

pub mod confirmation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod notices;
pub mod persona;
pub mod router;

pub use confirmation::{Confirmation, ConfirmationClassifier};
pub use dispatcher::{DEFAULT_COMMAND_PREFIX, Dispatcher};
pub use error::HandlerError;
pub use handler::{
    Attachment, CapabilityHandler, DeferredAction, HandlerDescriptor, HandlerOutcome,
    HandlerRequest, HandlerResult, NoStatus, Reply, StatusSink, deferred,
};
pub use persona::BOT_NAME;
pub use router::{DEFAULT_CONFIDENCE_THRESHOLD, IntentRouter, RouteDecision, RoutingVerdict};
