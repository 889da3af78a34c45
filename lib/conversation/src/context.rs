//! Conversation context store.
//!
//! Keeps a short, recent log of turns per user so prompts can resolve
//! references like "move it to 4pm". Two limits apply on every read:
//!
//! - turns older than the window are dropped
//! - of what remains, only the most recent `max_turns` are kept
//!
//! The filtered log is written back, so reads also evict. Nothing is
//! persisted; the store lives as long as the process.

use crate::turn::{Turn, TurnRole};
use alfred_core::UserId;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Default number of turns kept per user.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Default window, in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// Retention limits for the context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    /// Maximum number of turns returned per user.
    pub max_turns: usize,
    /// Maximum age of a returned turn.
    pub window: TimeDelta,
}

impl ContextPolicy {
    /// Creates a policy from a turn count and a window in minutes.
    ///
    /// Windows too long to represent are clamped to the longest one.
    #[must_use]
    pub fn new(max_turns: usize, window_minutes: i64) -> Self {
        Self {
            max_turns,
            window: TimeDelta::try_minutes(window_minutes).unwrap_or(TimeDelta::MAX),
        }
    }
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, DEFAULT_WINDOW_MINUTES)
    }
}

/// Per-user bounded, time-windowed turn log.
#[derive(Debug, Default)]
pub struct ContextStore {
    policy: ContextPolicy,
    logs: Mutex<HashMap<UserId, Vec<Turn>>>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(policy: ContextPolicy) -> Self {
        Self {
            policy,
            logs: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the retention policy.
    #[must_use]
    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }

    /// Appends a turn stamped with the current time.
    pub fn append(&self, user: UserId, role: TurnRole, text: impl Into<String>) {
        self.push(user, Turn::new(role, text));
    }

    /// Appends an already-built turn.
    pub fn push(&self, user: UserId, turn: Turn) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user)
            .or_default()
            .push(turn);
    }

    /// Returns the user's recent turns, oldest first, pruning the log.
    #[must_use]
    pub fn get(&self, user: UserId) -> Vec<Turn> {
        self.get_at(user, Utc::now())
    }

    /// Same as [`ContextStore::get`] with an explicit clock.
    #[must_use]
    pub fn get_at(&self, user: UserId, now: DateTime<Utc>) -> Vec<Turn> {
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(log) = logs.get_mut(&user) else {
            return Vec::new();
        };

        let before = log.len();
        // A window reaching past the earliest representable time keeps everything.
        if let Some(cutoff) = now.checked_sub_signed(self.policy.window) {
            log.retain(|turn| turn.timestamp > cutoff);
        }
        if log.len() > self.policy.max_turns {
            let excess = log.len() - self.policy.max_turns;
            log.drain(..excess);
        }
        if log.len() != before {
            trace!(user_id = %user, evicted = before - log.len(), "pruned context");
        }

        let turns = log.clone();
        if log.is_empty() {
            logs.remove(&user);
        }
        turns
    }
}
