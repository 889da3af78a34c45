//! Calendar service abstraction.
//!
//! Event types mirror the Google Calendar v3 resource closely enough to be
//! decoded from it directly; other backends (and test doubles) build them
//! by hand.

use crate::error::CalendarError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};

/// A calendar the account can read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    /// Calendar id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub summary: String,
}

/// Start or end of an event: a timestamp, or a date for all-day events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    /// Timestamp for timed events, in the calendar's offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    /// Date for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl EventTime {
    /// A timed instant.
    #[must_use]
    pub fn at(date_time: DateTime<FixedOffset>) -> Self {
        Self {
            date_time: Some(date_time),
            date: None,
        }
    }

    /// An all-day date.
    #[must_use]
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(date),
        }
    }

    /// Returns true for all-day events.
    #[must_use]
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none()
    }

    /// Date in the event's own offset.
    #[must_use]
    pub fn local_date(&self) -> Option<NaiveDate> {
        self.date_time.map(|dt| dt.date_naive()).or(self.date)
    }

    /// Wall-clock time in the event's own offset.
    #[must_use]
    pub fn local_datetime(&self) -> Option<NaiveDateTime> {
        self.date_time
            .map(|dt| dt.naive_local())
            .or_else(|| self.date.and_then(|d| d.and_hms_opt(0, 0, 0)))
    }

    /// Raw string form used to spot duplicates across calendars.
    #[must_use]
    pub fn key(&self) -> String {
        match (self.date_time, self.date) {
            (Some(dt), _) => dt.to_rfc3339(),
            (None, Some(d)) => d.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// A single popup or email reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// "popup" or "email".
    #[serde(default = "default_reminder_method")]
    pub method: String,
    /// Minutes before start.
    pub minutes: u32,
}

fn default_reminder_method() -> String {
    "popup".to_string()
}

/// Reminder settings for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    /// Use the calendar's default reminders.
    #[serde(default)]
    pub use_default: bool,
    /// Explicit reminders.
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

impl Reminders {
    /// Popup reminders at the given minute offsets.
    #[must_use]
    pub fn popups(minutes: &[u32]) -> Self {
        Self {
            use_default: false,
            overrides: minutes
                .iter()
                .map(|&minutes| ReminderOverride {
                    method: default_reminder_method(),
                    minutes,
                })
                .collect(),
        }
    }
}

/// An event as stored in the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event id.
    #[serde(default)]
    pub id: String,
    /// Title.
    #[serde(default)]
    pub summary: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Location.
    #[serde(default)]
    pub location: Option<String>,
    /// Start.
    #[serde(default)]
    pub start: EventTime,
    /// End.
    #[serde(default)]
    pub end: EventTime,
    /// `RRULE:` lines for recurring events.
    #[serde(default)]
    pub recurrence: Vec<String>,
    /// Reminder settings.
    #[serde(default)]
    pub reminders: Option<Reminders>,
}

impl CalendarEvent {
    /// Title, or "Untitled" when the event has none.
    #[must_use]
    pub fn title(&self) -> &str {
        if self.summary.is_empty() {
            "Untitled"
        } else {
            &self.summary
        }
    }

    /// Returns true for a recurring series.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        !self.recurrence.is_empty()
    }
}

/// An event to create. Times are wall-clock in the service's time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Title.
    pub summary: String,
    /// Description.
    pub description: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Start.
    pub start: NaiveDateTime,
    /// End.
    pub end: NaiveDateTime,
    /// A single `RRULE:` line.
    pub recurrence: Option<String>,
    /// Reminder settings.
    pub reminders: Option<Reminders>,
}

/// Fields to change on an existing event. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventUpdates {
    /// New title.
    pub summary: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New start.
    pub start: Option<NaiveDateTime>,
    /// New end.
    pub end: Option<NaiveDateTime>,
    /// New reminders.
    pub reminders: Option<Reminders>,
}

impl EventUpdates {
    /// Returns true if nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.reminders.is_none()
    }
}

/// Calendar operations used by the calendar handler.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Lists every calendar the account can read.
    async fn list_calendars(&self) -> Result<Vec<CalendarSummary>, Report<CalendarError>>;

    /// Lists single events of `calendar_id` that may fall on
    /// `[first, last]` (inclusive local dates), ordered by start.
    ///
    /// Implementations may return events slightly outside the range; callers
    /// filter on [`EventTime::local_date`].
    async fn list_events(
        &self,
        calendar_id: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, Report<CalendarError>>;

    /// Finds upcoming events whose text matches `query`.
    async fn search_events(&self, query: &str) -> Result<Vec<CalendarEvent>, Report<CalendarError>>;

    /// Creates an event.
    async fn create_event(&self, event: &NewEvent) -> Result<CalendarEvent, Report<CalendarError>>;

    /// Applies `updates` to an event.
    async fn update_event(
        &self,
        event_id: &str,
        updates: &EventUpdates,
    ) -> Result<CalendarEvent, Report<CalendarError>>;

    /// Deletes an event.
    async fn delete_event(&self, event_id: &str) -> Result<(), Report<CalendarError>>;

    /// IANA time zone the service interprets wall-clock times in.
    fn time_zone(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_google_event_resource() {
        let event: CalendarEvent = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "summary": "Standup",
            "start": {"dateTime": "2026-02-18T09:00:00-08:00", "timeZone": "America/Los_Angeles"},
            "end": {"dateTime": "2026-02-18T09:15:00-08:00"},
            "recurrence": ["RRULE:FREQ=DAILY"],
            "reminders": {"useDefault": false, "overrides": [{"method": "popup", "minutes": 10}]},
            "status": "confirmed"
        }))
        .expect("decode");

        assert_eq!(event.title(), "Standup");
        assert!(event.is_recurring());
        assert!(!event.start.is_all_day());
        assert_eq!(
            event.start.local_date(),
            NaiveDate::from_ymd_opt(2026, 2, 18)
        );
        assert_eq!(event.reminders, Some(Reminders::popups(&[10])));
    }

    #[test]
    fn all_day_event_uses_date() {
        let event: CalendarEvent = serde_json::from_value(serde_json::json!({
            "id": "d",
            "start": {"date": "2026-03-01"},
            "end": {"date": "2026-03-02"}
        }))
        .expect("decode");

        assert!(event.start.is_all_day());
        assert_eq!(event.title(), "Untitled");
        assert_eq!(event.start.key(), "2026-03-01");
    }

    #[test]
    fn local_date_keeps_event_offset() {
        // 23:30 in Los Angeles is already the next day in UTC.
        let event: CalendarEvent = serde_json::from_value(serde_json::json!({
            "start": {"dateTime": "2026-02-18T23:30:00-08:00"}
        }))
        .expect("decode");
        assert_eq!(
            event.start.local_date(),
            NaiveDate::from_ymd_opt(2026, 2, 18)
        );
    }

    #[test]
    fn empty_updates() {
        assert!(EventUpdates::default().is_empty());
        let updates = EventUpdates {
            location: Some("Zoom".to_string()),
            ..EventUpdates::default()
        };
        assert!(!updates.is_empty());
    }
}
