//! Core types shared by every Alfred crate.
//!
//! Strongly-typed identifiers used by the conversation, AI and transport
//! layers. Each crate defines its own error enum and reports it through
//! `rootcause`.

pub mod id;

pub use id::{InvocationId, ParseIdError, PendingActionId, UserId};
