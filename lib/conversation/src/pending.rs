//! Pending-confirmation tracker.
//!
//! Destructive operations (deleting events, batch downloads) are not run
//! straight away. The handler hands back a deferred action, which waits here
//! until the same user's next message says yes, no, or something else.
//!
//! Each user has a single slot. Staging a second action replaces the first.

use alfred_core::{PendingActionId, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// A deferred action waiting for a yes/no answer.
pub struct PendingAction<A> {
    /// Identifier used in logs.
    pub id: PendingActionId,
    /// The user who must confirm.
    pub user: UserId,
    /// Short human-readable description, e.g. "delete 2 event(s)".
    pub description: String,
    /// When the action was staged.
    pub staged_at: DateTime<Utc>,
    /// The action itself.
    pub action: A,
}

impl<A> PendingAction<A> {
    /// Wraps an action for `user`.
    #[must_use]
    pub fn new(user: UserId, description: impl Into<String>, action: A) -> Self {
        Self {
            id: PendingActionId::new(),
            user,
            description: description.into(),
            staged_at: Utc::now(),
            action,
        }
    }
}

impl<A> fmt::Debug for PendingAction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAction")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("description", &self.description)
            .field("staged_at", &self.staged_at)
            .finish_non_exhaustive()
    }
}

/// Single-slot-per-user holder of deferred actions.
pub struct PendingConfirmations<A> {
    slots: Mutex<HashMap<UserId, PendingAction<A>>>,
}

impl<A> Default for PendingConfirmations<A> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<A> fmt::Debug for PendingConfirmations<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PendingConfirmations")
            .field("pending", &slots.len())
            .finish()
    }
}

impl<A> PendingConfirmations<A> {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pending`, returning whatever it replaced.
    pub fn stage(&self, pending: PendingAction<A>) -> Option<PendingAction<A>> {
        let user = pending.user;
        let id = pending.id;
        let replaced = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user, pending);

        match &replaced {
            Some(previous) => warn!(
                user_id = %user,
                pending_id = %id,
                replaced_id = %previous.id,
                replaced = %previous.description,
                "new confirmation replaces an unanswered one"
            ),
            None => debug!(user_id = %user, pending_id = %id, "confirmation staged"),
        }
        replaced
    }

    /// Removes and returns the user's pending action.
    pub fn take(&self, user: UserId) -> Option<PendingAction<A>> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user)
    }

    /// Returns true if the user has an action waiting.
    #[must_use]
    pub fn has_pending(&self, user: UserId) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user)
    }

    /// Returns the description of the user's pending action.
    #[must_use]
    pub fn describe(&self, user: UserId) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .map(|p| p.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_then_take_empties_slot() {
        let tracker = PendingConfirmations::new();
        let user = UserId::new(7);

        assert!(tracker.stage(PendingAction::new(user, "delete 1 event(s)", 1)).is_none());
        assert!(tracker.has_pending(user));
        assert_eq!(tracker.describe(user).as_deref(), Some("delete 1 event(s)"));

        let taken = tracker.take(user).expect("pending action");
        assert_eq!(taken.action, 1);
        assert!(!tracker.has_pending(user));
        assert!(tracker.take(user).is_none());
    }

    #[test]
    fn second_stage_replaces_first() {
        let tracker = PendingConfirmations::new();
        let user = UserId::new(7);

        tracker.stage(PendingAction::new(user, "first", "a"));
        let replaced = tracker
            .stage(PendingAction::new(user, "second", "b"))
            .expect("replaced action");

        assert_eq!(replaced.description, "first");
        assert_eq!(tracker.take(user).map(|p| p.action), Some("b"));
    }

    #[test]
    fn slots_are_per_user() {
        let tracker = PendingConfirmations::new();
        tracker.stage(PendingAction::new(UserId::new(1), "one", ()));

        assert!(tracker.has_pending(UserId::new(1)));
        assert!(!tracker.has_pending(UserId::new(2)));
    }
}
