//! Capability handlers for the Alfred assistant.
//!
//! Each handler implements [`alfred_assistant::CapabilityHandler`]:
//!
//! - [`CalendarHandler`]: view, create, modify and delete calendar events
//! - [`MediaHandler`]: download linked videos as MP3 or MP4
//! - [`SearchHandler`]: factual questions with web grounding
//! - [`FunFactHandler`]: trivia
//! - [`ConversationHandler`]: greetings and small talk
//!
//! Handlers turn LLM failures into friendly text, except rate limits, which
//! they return as errors so the dispatcher can show the quota notice.

mod common;

pub mod calendar;
pub mod conversation;
pub mod fun_fact;
pub mod media;
pub mod search;

pub use calendar::CalendarHandler;
pub use conversation::ConversationHandler;
pub use fun_fact::FunFactHandler;
pub use media::{DEFAULT_MAX_UPLOAD_MB, DEFAULT_MAX_URLS, MediaHandler};
pub use search::SearchHandler;
