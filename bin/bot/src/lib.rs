//! Discord front end for the Alfred personal assistant.
//!
//! - [`config`]: environment-driven settings
//! - [`app`]: builds the dispatcher and registers handlers
//! - [`discord`]: the serenity event handler that relays messages

pub mod app;
pub mod config;
pub mod discord;
