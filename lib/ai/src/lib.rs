//! LLM primitives for the Alfred assistant.
//!
//! This crate provides:
//!
//! - **Backend**: the provider-neutral [`LlmBackend`] trait plus a Gemini
//!   implementation
//! - **LLM Call**: single-shot inference with an optional strict-JSON
//!   contract, decoded through one typed step ([`decode_json`])
//! - **Prompt templates**: `{{variable}}` substitution for the fixed prompts
//!   used by the router and the capability handlers

pub mod backend;
pub mod error;
pub mod gemini;
pub mod llm_call;
pub mod prompt;
pub mod scripted;

pub use backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
pub use error::{LlmError, is_rate_limit_message};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use llm_call::{LlmCall, LlmCallResult, decode_json};
pub use prompt::PromptTemplate;
pub use scripted::ScriptedBackend;
