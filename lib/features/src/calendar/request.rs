//! The JSON shape the calendar prompt asks for, and its conversion into
//! calendar-service types.

use alfred_integration::{EventUpdates, NewEvent, Reminders};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::warn;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// What the user asked the calendar to do.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum CalendarRequest {
    View {
        #[serde(default)]
        start_date: Option<String>,
        #[serde(default)]
        end_date: Option<String>,
    },
    Create {
        #[serde(default)]
        events: Vec<EventDraft>,
    },
    Modify {
        #[serde(default)]
        search_query: String,
        #[serde(default)]
        updates: UpdateDraft,
    },
    Delete {
        #[serde(default)]
        search_query: String,
    },
}

/// One event as the model described it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct EventDraft {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub reminders: Option<Reminders>,
}

impl EventDraft {
    /// Converts to a [`NewEvent`], or `None` if either time is missing or
    /// malformed.
    pub fn to_new_event(&self) -> Option<NewEvent> {
        let start = parse_datetime(self.start_datetime.as_deref()?)?;
        let end = parse_datetime(self.end_datetime.as_deref()?)?;

        Some(NewEvent {
            summary: non_blank(self.summary.as_deref())
                .unwrap_or_else(|| "Untitled Event".to_string()),
            description: non_blank(self.description.as_deref()),
            location: non_blank(self.location.as_deref()),
            start,
            end,
            recurrence: non_blank(self.recurrence.as_deref()).map(|rule| rrule_line(&rule)),
            reminders: self.reminders.clone(),
        })
    }
}

/// Fields the model wants changed on matching events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct UpdateDraft {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub reminders: Option<Reminders>,
}

impl UpdateDraft {
    /// Converts to [`EventUpdates`]. Unreadable times are dropped.
    pub fn to_updates(&self) -> EventUpdates {
        EventUpdates {
            summary: non_blank(self.summary.as_deref()),
            description: non_blank(self.description.as_deref()),
            location: non_blank(self.location.as_deref()),
            start: self.start_datetime.as_deref().and_then(parse_update_time),
            end: self.end_datetime.as_deref().and_then(parse_update_time),
            reminders: self.reminders.clone(),
        }
    }
}

fn parse_update_time(raw: &str) -> Option<NaiveDateTime> {
    let parsed = parse_datetime(raw);
    if parsed.is_none() {
        warn!(raw, "ignoring unreadable time in calendar update");
    }
    parsed
}

/// Parses the `YYYY-MM-DD HH:MM` form the prompt asks for (seconds and a
/// `T` separator are tolerated).
pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Parses a `YYYY-MM-DD` date.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The Calendar API rejects recurrence rules without the `RRULE:` prefix.
fn rrule_line(rule: &str) -> String {
    if rule.starts_with("RRULE:") {
        rule.to_string()
    } else {
        format!("RRULE:{rule}")
    }
}
