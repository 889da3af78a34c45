//! Reply texts for the calendar handler.

use alfred_integration::{CalendarEvent, EventTime, EventUpdates, Reminders};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt::Write as _;

/// Matches listed in a confirmation prompt before the rest are elided.
const MAX_LISTED_MATCHES: usize = 10;

const CONFIRM_HINT: &str = "Reply **yes** to confirm or **no** to cancel.";

fn day_and_time(at: NaiveDateTime) -> String {
    at.format("%a, %b %d at %-I:%M %p").to_string()
}

fn clock_time(at: NaiveDateTime) -> String {
    at.format("%-I:%M %p").to_string()
}

/// "Mon, Feb 17 at 3:00 PM → 4:00 PM", with the date repeated when the
/// event ends on another day.
pub(crate) fn time_span(start: NaiveDateTime, end: NaiveDateTime) -> String {
    if start.date() == end.date() {
        format!("{} → {}", day_and_time(start), clock_time(end))
    } else {
        format!("{} → {}", day_and_time(start), day_and_time(end))
    }
}

fn event_when(start: &EventTime, end: &EventTime) -> String {
    if start.is_all_day() {
        return match start.date {
            Some(date) => format!("{}, all day", date.format("%a, %b %d")),
            None => "All day".to_string(),
        };
    }
    match (start.local_datetime(), end.local_datetime()) {
        (Some(start), Some(end)) => time_span(start, end),
        (Some(start), None) => day_and_time(start),
        _ => "time unknown".to_string(),
    }
}

fn reminder_summary(reminders: Option<&Reminders>) -> Option<String> {
    let reminders = reminders.filter(|r| !r.use_default && !r.overrides.is_empty())?;
    let minutes: Vec<String> = reminders
        .overrides
        .iter()
        .map(|r| format!("{}min", r.minutes))
        .collect();
    Some(minutes.join(", "))
}

/// Detail block for a single created event.
pub(crate) fn created_event(event: &CalendarEvent) -> String {
    let mut text = format!(
        "✓ **{}**\n📅 {}",
        event.title(),
        event_when(&event.start, &event.end)
    );
    if event.is_recurring() {
        text.push_str("\n🔁 Recurring");
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(text, "\n📝 Description: {description}");
    }
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(text, "\n📍 Location: {location}");
    }
    if let Some(reminders) = reminder_summary(event.reminders.as_ref()) {
        let _ = write!(text, "\n🔔 Reminders: {reminders}");
    }
    text
}

/// Reply for a batch of created events.
pub(crate) fn created_events(events: &[CalendarEvent]) -> String {
    if let [event] = events {
        return created_event(event);
    }
    let details: Vec<String> = events
        .iter()
        .map(|event| {
            let mut detail = format!(
                "• **{}**\n  📅 {}",
                event.title(),
                event_when(&event.start, &event.end)
            );
            if event.is_recurring() {
                detail.push_str("\n  🔁 Recurring");
            }
            if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
                let _ = write!(detail, "\n  📍 {location}");
            }
            detail
        })
        .collect();
    format!("✓ Created {} events:\n\n{}", events.len(), details.join("\n\n"))
}

/// Human label for a viewed date range.
pub(crate) fn range_label(first: NaiveDate, last: NaiveDate, today: NaiveDate) -> String {
    if first != last {
        return format!("{} - {}", first.format("%b %d"), last.format("%b %d"));
    }
    if first == today {
        "today".to_string()
    } else if Some(first) == today.checked_add_signed(TimeDelta::days(1)) {
        "tomorrow".to_string()
    } else {
        first.format("%A, %B %d").to_string()
    }
}

/// One schedule line. Multi-day views include the day.
pub(crate) fn schedule_line(event: &CalendarEvent, with_day: bool) -> String {
    let when = match (event.start.is_all_day(), event.start.local_datetime()) {
        (true, Some(start)) if with_day => format!("{}, all day", start.format("%a, %b %d")),
        (false, Some(start)) if with_day => day_and_time(start),
        (false, Some(start)) => clock_time(start),
        _ => "All day".to_string(),
    };
    let location = event
        .location
        .as_deref()
        .filter(|l| !l.is_empty())
        .map(|l| format!(" @ {l}"))
        .unwrap_or_default();
    format!("• {when}: **{}**{location}", event.title())
}

/// Full schedule reply.
pub(crate) fn schedule(label: &str, events: &[CalendarEvent], with_day: bool) -> String {
    if events.is_empty() {
        return format!("You have no events scheduled for {label}.");
    }
    let lines: Vec<String> = events
        .iter()
        .map(|event| schedule_line(event, with_day))
        .collect();
    format!("📅 Your schedule for {label}:\n\n{}", lines.join("\n"))
}

fn update_lines(updates: &EventUpdates) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(summary) = &updates.summary {
        lines.push(format!("📝 Title: **{summary}**"));
    }
    if let Some(description) = &updates.description {
        lines.push(format!("📝 Description: {description}"));
    }
    if let Some(location) = &updates.location {
        lines.push(format!("📍 Location: {location}"));
    }
    if let Some(start) = updates.start {
        lines.push(format!("🕐 Starts: {}", day_and_time(start)));
    }
    if let Some(end) = updates.end {
        lines.push(format!("🕐 Ends: {}", day_and_time(end)));
    }
    if let Some(reminders) = &updates.reminders {
        match reminders.overrides.first() {
            Some(first) if !reminders.use_default => {
                lines.push(format!("🔔 Reminder: {} min before", first.minutes));
            }
            _ => lines.push("🔔 Reminder: calendar default".to_string()),
        }
    }
    lines
}

fn match_list(matches: &[CalendarEvent]) -> String {
    let mut lines: Vec<String> = matches
        .iter()
        .take(MAX_LISTED_MATCHES)
        .map(|event| {
            let recurring = if event.is_recurring() { " 🔁" } else { "" };
            format!(
                "• **{}** ({}){recurring}",
                event.title(),
                event_when(&event.start, &event.end)
            )
        })
        .collect();
    if matches.len() > MAX_LISTED_MATCHES {
        lines.push(format!("…and {} more", matches.len() - MAX_LISTED_MATCHES));
    }
    lines.join("\n")
}

fn found_header(count: usize, query: &str) -> String {
    let noun = if count == 1 { "event" } else { "events" };
    format!("I found {count} {noun} matching '{query}':")
}

/// Confirmation prompt for a modification.
pub(crate) fn confirm_modify(query: &str, matches: &[CalendarEvent], updates: &EventUpdates) -> String {
    format!(
        "{}\n\n{}\n\nApply these changes?\n{}\n\n{CONFIRM_HINT}",
        found_header(matches.len(), query),
        match_list(matches),
        update_lines(updates).join("\n"),
    )
}

/// Confirmation prompt for a deletion.
pub(crate) fn confirm_delete(query: &str, matches: &[CalendarEvent]) -> String {
    let question = if matches.len() == 1 {
        "Delete it?"
    } else {
        "Delete all of them?"
    };
    format!(
        "{}\n\n{}\n\n{question} {CONFIRM_HINT}",
        found_header(matches.len(), query),
        match_list(matches),
    )
}

/// Result of an applied modification.
pub(crate) fn modified(titles: &[String], recurring: bool, updates: &EventUpdates) -> String {
    let recurring = if recurring { "\n🔁 Recurring" } else { "" };
    let details = update_lines(updates).join("\n");
    match titles {
        [title] => format!("✓ Modified **{title}**{recurring}\n{details}"),
        _ => format!("✓ Modified {} events{recurring}\n{details}", titles.len()),
    }
}

/// Result of an applied deletion.
pub(crate) fn deleted(titles: &[String], recurring: bool) -> String {
    let recurring = if recurring { "\n🔁 Recurring series removed" } else { "" };
    match titles {
        [title] => format!("🗑️ Deleted **{title}**{recurring}"),
        _ => format!(
            "🗑️ Deleted {} events{recurring}\n{}",
            titles.len(),
            titles
                .iter()
                .map(|t| format!("• {t}"))
                .collect::<Vec<_>>()
                .join("\n")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};

    fn timed(summary: &str, start: &str, end: &str) -> CalendarEvent {
        let parse = |s: &str| DateTime::<FixedOffset>::parse_from_rfc3339(s).expect("rfc3339");
        CalendarEvent {
            id: summary.to_lowercase(),
            summary: summary.to_string(),
            start: EventTime::at(parse(start)),
            end: EventTime::at(parse(end)),
            ..CalendarEvent::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn single_event_detail() {
        let mut event = timed(
            "Lunch with Sarah",
            "2026-02-20T12:00:00-08:00",
            "2026-02-20T13:00:00-08:00",
        );
        event.location = Some("Cafe".to_string());
        event.recurrence = vec!["RRULE:FREQ=WEEKLY".to_string()];
        event.reminders = Some(Reminders::popups(&[60, 10]));

        assert_eq!(
            created_events(&[event]),
            "✓ **Lunch with Sarah**\n📅 Fri, Feb 20 at 12:00 PM → 1:00 PM\n🔁 Recurring\n📍 Location: Cafe\n🔔 Reminders: 60min, 10min"
        );
    }

    #[test]
    fn multi_event_list() {
        let a = timed("A", "2026-02-20T09:00:00-08:00", "2026-02-20T10:00:00-08:00");
        let b = timed("B", "2026-02-20T23:00:00-08:00", "2026-02-21T01:00:00-08:00");
        let text = created_events(&[a, b]);
        assert!(text.starts_with("✓ Created 2 events:\n\n• **A**\n  📅 Fri, Feb 20 at 9:00 AM → 10:00 AM"));
        assert!(text.contains("Fri, Feb 20 at 11:00 PM → Sat, Feb 21 at 1:00 AM"));
    }

    #[test]
    fn labels() {
        let today = date(2026, 2, 17);
        assert_eq!(range_label(today, today, today), "today");
        assert_eq!(range_label(date(2026, 2, 18), date(2026, 2, 18), today), "tomorrow");
        assert_eq!(
            range_label(date(2026, 2, 20), date(2026, 2, 20), today),
            "Friday, February 20"
        );
        assert_eq!(
            range_label(today, date(2026, 2, 23), today),
            "Feb 17 - Feb 23"
        );
    }

    #[test]
    fn schedule_lines() {
        let mut standup = timed("Standup", "2026-02-17T09:00:00-08:00", "2026-02-17T09:15:00-08:00");
        standup.location = Some("Zoom".to_string());
        let holiday = CalendarEvent {
            summary: "Holiday".to_string(),
            start: EventTime::all_day(date(2026, 2, 17)),
            end: EventTime::all_day(date(2026, 2, 18)),
            ..CalendarEvent::default()
        };

        assert_eq!(
            schedule("today", &[holiday.clone(), standup.clone()], false),
            "📅 Your schedule for today:\n\n• All day: **Holiday**\n• 9:00 AM: **Standup** @ Zoom"
        );
        assert_eq!(
            schedule_line(&standup, true),
            "• Tue, Feb 17 at 9:00 AM: **Standup** @ Zoom"
        );
        assert_eq!(schedule_line(&holiday, true), "• Tue, Feb 17, all day: **Holiday**");
        assert_eq!(schedule("today", &[], false), "You have no events scheduled for today.");
    }

    #[test]
    fn modification_summaries() {
        let updates = EventUpdates {
            summary: Some("Tutor Hours".to_string()),
            reminders: Some(Reminders::popups(&[30])),
            ..EventUpdates::default()
        };
        assert_eq!(
            modified(&["Tutor Hours".to_string()], true, &updates),
            "✓ Modified **Tutor Hours**\n🔁 Recurring\n📝 Title: **Tutor Hours**\n🔔 Reminder: 30 min before"
        );
        assert!(
            modified(&["a".to_string(), "b".to_string()], false, &updates)
                .starts_with("✓ Modified 2 events\n📝 Title")
        );
    }

    #[test]
    fn confirmation_prompts_list_matches() {
        let event = timed("Dentist", "2026-02-19T10:00:00-08:00", "2026-02-19T11:00:00-08:00");
        let prompt = confirm_delete("dentist", std::slice::from_ref(&event));
        assert_eq!(
            prompt,
            "I found 1 event matching 'dentist':\n\n• **Dentist** (Thu, Feb 19 at 10:00 AM → 11:00 AM)\n\nDelete it? Reply **yes** to confirm or **no** to cancel."
        );

        let many: Vec<CalendarEvent> = (0..12).map(|_| event.clone()).collect();
        let prompt = confirm_modify(
            "dentist",
            &many,
            &EventUpdates {
                location: Some("Downtown".to_string()),
                ..EventUpdates::default()
            },
        );
        assert!(prompt.starts_with("I found 12 events matching 'dentist':"));
        assert!(prompt.contains("…and 2 more"));
        assert!(prompt.contains("📍 Location: Downtown"));
    }

    #[test]
    fn deletion_summaries() {
        assert_eq!(deleted(&["Dentist".to_string()], false), "🗑️ Deleted **Dentist**");
        assert_eq!(
            deleted(&["A".to_string(), "B".to_string()], true),
            "🗑️ Deleted 2 events\n🔁 Recurring series removed\n• A\n• B"
        );
    }
}
