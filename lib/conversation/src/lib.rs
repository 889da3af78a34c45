//! Conversation state for the Alfred assistant.
//!
//! This crate provides:
//!
//! - **Turns**: timestamped user/assistant messages and transcript rendering
//! - **Context Store**: per-user bounded, time-windowed turn log
//! - **Pending Confirmations**: per-user single slot for deferred actions

pub mod context;
pub mod pending;
pub mod turn;

pub use context::{ContextPolicy, ContextStore, DEFAULT_MAX_TURNS, DEFAULT_WINDOW_MINUTES};
pub use pending::{PendingAction, PendingConfirmations};
pub use turn::{Turn, TurnRole, format_transcript};
