//! Conversation turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human talking to the bot.
    User,
    /// The bot.
    Assistant,
}

/// One message in a user's recent conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub text: String,
}

impl Turn {
    /// Creates a turn stamped with the current time.
    #[must_use]
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self::at(Utc::now(), role, text)
    }

    /// Creates a turn with an explicit timestamp.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>, role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            role,
            text: text.into(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }
}

/// Renders turns as a prompt section.
///
/// Returns an empty string when there is nothing to show, so callers can
/// splice the result into a prompt unconditionally.
#[must_use]
pub fn format_transcript(turns: &[Turn], assistant_name: &str) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let mut out = String::from("Recent conversation:\n");
    for turn in turns {
        let speaker = match turn.role {
            TurnRole::User => "User",
            TurnRole::Assistant => assistant_name,
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(&turn.text);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_labels_speakers() {
        let turns = vec![Turn::user("hi"), Turn::assistant("hello there")];
        assert_eq!(
            format_transcript(&turns, "Alfred"),
            "Recent conversation:\nUser: hi\nAlfred: hello there\n"
        );
    }

    #[test]
    fn empty_transcript_is_blank() {
        assert_eq!(format_transcript(&[], "Alfred"), "");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&TurnRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
    }
}
