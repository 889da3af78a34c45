//! Calendar handler.
//!
//! One LLM call turns the message into a [`request::CalendarRequest`]. Views
//! and creations run straight away; modifications and deletions are staged
//! behind a yes/no confirmation and applied to every matching event.

mod render;
mod request;

use crate::common::{rate_limited_or, transcript};
use alfred_ai::{LlmBackend, LlmCall, PromptTemplate};
use alfred_assistant::{
    CapabilityHandler, HandlerDescriptor, HandlerError, HandlerOutcome, HandlerRequest,
    HandlerResult, Reply, deferred,
};
use alfred_integration::{CalendarError, CalendarEvent, CalendarService, EventUpdates};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use request::{CalendarRequest, EventDraft, parse_date};
use rootcause::prelude::Report;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const NOT_UNDERSTOOD: &str = "I couldn't understand your calendar request. Try something like: 'Meeting tomorrow at 3pm' or 'Rename office hours to tutor hours'";

const CAPABILITIES: &str = r#"This feature can:
- Create calendar events from natural language descriptions
- Modify/update existing calendar events (rename, change time, location, reminders)
- Delete events
- View your schedule and upcoming events
- Schedule meetings, appointments, and reminders
- Handle time-based requests (dates, times, durations)
- Search and update recurring events

Examples of what this feature handles:

Creating events:
- "Meeting tomorrow at 3pm"
- "Lunch with Sarah on Friday at noon for 2 hours"
- "Doctor appointment next Tuesday at 10am"
- "Team standup every weekday at 9am"

Modifying events:
- "Rename all 'office hours' events to 'tutor hours'"
- "Update my team meeting to start at 3pm instead"
- "Change location of dentist appointment to downtown office"

Deleting events:
- "Cancel my dentist appointment"
- "Delete all the office hours events"

Viewing schedule:
- "What's on my schedule today?"
- "What do I have tomorrow?"
- "Show me my events this week"
- "Do I have anything scheduled for Friday?"

Keywords that indicate this feature: meeting, appointment, schedule, calendar, event, book, reserve, remind (when time-based), rename, change, update, modify, move, cancel, delete, what's on, upcoming"#;

const CALENDAR_PROMPT: PromptTemplate = PromptTemplate::new(
    "calendar",
    r#"
Current date and time: {{now}} (Today is {{weekday}})
Time zone: {{time_zone}}

{{context}}
You are Alfred's calendar request parser. Decide whether the user wants to VIEW their schedule, CREATE new events, MODIFY existing events or DELETE existing events.

User message: "{{message}}"

Use the conversation above to resolve references like "it", "them" or "that event".

Return ONLY valid JSON in one of these shapes:

VIEW:
{"action": "view", "start_date": "YYYY-MM-DD", "end_date": "YYYY-MM-DD"}

CREATE:
{"action": "create", "events": [{"summary": "Brief title", "description": "optional", "start_datetime": "YYYY-MM-DD HH:MM", "end_datetime": "YYYY-MM-DD HH:MM", "location": "optional", "recurrence": "optional RRULE", "reminders": {"useDefault": false, "overrides": [{"method": "popup", "minutes": 60}]}}]}

MODIFY:
{"action": "modify", "search_query": "event name or keywords", "updates": {"summary": "new title", "description": "new description", "location": "new location", "start_datetime": "YYYY-MM-DD HH:MM", "end_datetime": "YYYY-MM-DD HH:MM", "reminders": {"useDefault": false, "overrides": [{"method": "popup", "minutes": 60}]}}}

DELETE:
{"action": "delete", "search_query": "event name or keywords"}

EXAMPLES:
"What do I have tomorrow?" -> {"action": "view", "start_date": "<tomorrow>", "end_date": "<tomorrow>"}
"Meeting tomorrow at 3pm" -> {"action": "create", "events": [{"summary": "Meeting", "start_datetime": "<tomorrow> 15:00", "end_datetime": "<tomorrow> 16:00"}]}
"Rename office hours to tutor hours" -> {"action": "modify", "search_query": "office hours", "updates": {"summary": "Tutor Hours"}}
"Change team meeting location to Zoom" -> {"action": "modify", "search_query": "team meeting", "updates": {"location": "Zoom"}}
"Cancel my dentist appointment" -> {"action": "delete", "search_query": "dentist"}

GUIDELINES:
- Calculate every date relative to the current date above; count weekdays from today
- Use 24-hour times (13:00 for 1 PM); default to a one hour duration
- Keep titles brief and put details in the description
- For MODIFY include only the fields being changed
- Reminder minutes: "1 hour" = 60, "30 min" = 30
- Recurrence MUST start with "RRULE:" (e.g. "RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20260331T235959Z")
"#,
);

/// Wall-clock time at `instant` in `zone`, or in the process's local zone
/// when no zone is known.
fn wall_clock(instant: DateTime<Utc>, zone: Option<Tz>) -> NaiveDateTime {
    match zone {
        Some(tz) => instant.with_timezone(&tz).naive_local(),
        None => instant.with_timezone(&Local).naive_local(),
    }
}

fn calendar_failure(report: &Report<CalendarError>) -> Report<HandlerError> {
    HandlerError::service("calendar", report.current_context().to_string()).into()
}

/// Creates, lists, modifies and deletes calendar events.
pub struct CalendarHandler {
    backend: Arc<dyn LlmBackend>,
    calendar: Arc<dyn CalendarService>,
    zone: Option<Tz>,
    clock: fn() -> DateTime<Utc>,
}

impl CalendarHandler {
    /// Creates the handler. "Now" is read in the calendar's time zone.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, calendar: Arc<dyn CalendarService>) -> Self {
        let zone = match calendar.time_zone().parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                warn!(time_zone = calendar.time_zone(), error = %e, "unknown calendar time zone, using local time");
                None
            }
        };
        Self {
            backend,
            calendar,
            zone,
            clock: Utc::now,
        }
    }

    /// Replaces the clock used for "today" and the prompt's current time.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        wall_clock((self.clock)(), self.zone)
    }

    async fn view(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        today: NaiveDate,
    ) -> HandlerResult<String> {
        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            return Ok("I couldn't understand the date range for viewing your schedule.".to_string());
        };
        let (Some(first), Some(last)) = (parse_date(start_date), parse_date(end_date)) else {
            return Ok("I couldn't parse the date range. Please try again.".to_string());
        };
        let (first, last) = if last < first { (last, first) } else { (first, last) };
        let label = render::range_label(first, last, today);

        let calendars = self
            .calendar
            .list_calendars()
            .await
            .map_err(|e| calendar_failure(&e))?;

        let mut events = Vec::new();
        for calendar in &calendars {
            match self.calendar.list_events(&calendar.id, first, last).await {
                Ok(found) => {
                    debug!(calendar = %calendar.summary, count = found.len(), "fetched events");
                    events.extend(found);
                }
                Err(e) => {
                    warn!(calendar = %calendar.summary, error = %e.current_context(), "skipping calendar");
                }
            }
        }

        let events = arrange_schedule(events, first, last);
        info!(%first, %last, count = events.len(), "viewed schedule");
        Ok(render::schedule(&label, &events, first != last))
    }

    async fn create(&self, drafts: &[EventDraft]) -> HandlerResult<String> {
        let events: Vec<_> = drafts
            .iter()
            .filter_map(|draft| {
                let event = draft.to_new_event();
                if event.is_none() {
                    warn!(?draft, "skipping unparseable event");
                }
                event
            })
            .collect();
        if events.is_empty() {
            return Ok("I couldn't parse the event details. Please try again.".to_string());
        }

        let mut created = Vec::with_capacity(events.len());
        let mut last_error = None;
        for event in &events {
            match self.calendar.create_event(event).await {
                Ok(stored) => {
                    info!(event_id = %stored.id, summary = %event.summary, "created event");
                    created.push(stored);
                }
                Err(e) => {
                    warn!(summary = %event.summary, error = %e.current_context(), "failed to create event");
                    last_error = Some(e);
                }
            }
        }

        if created.is_empty() {
            if let Some(e) = last_error
                && matches!(e.current_context(), CalendarError::RateLimited { .. })
            {
                return Err(calendar_failure(&e));
            }
            return Ok("Sorry, I couldn't create any calendar events. Please try again.".to_string());
        }
        Ok(render::created_events(&created))
    }

    async fn find_matches(&self, query: &str) -> HandlerResult<Vec<CalendarEvent>> {
        self.calendar
            .search_events(query)
            .await
            .map_err(|e| calendar_failure(&e))
    }

    async fn modify(&self, query: &str, updates: EventUpdates) -> HandlerResult<HandlerOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(HandlerOutcome::text(
                "I couldn't understand what events you want to modify. Please be more specific.",
            ));
        }
        if updates.is_empty() {
            return Ok(HandlerOutcome::text(format!(
                "What would you like to change about '{query}'? I can update the title, time, location, description or reminders."
            )));
        }

        let matches = self.find_matches(query).await?;
        if matches.is_empty() {
            return Ok(HandlerOutcome::text(format!(
                "I couldn't find any events matching '{query}'."
            )));
        }

        let prompt = render::confirm_modify(query, &matches, &updates);
        let description = format!("modify {} event(s) matching '{query}'", matches.len());
        let calendar = Arc::clone(&self.calendar);
        Ok(HandlerOutcome::confirm(
            prompt,
            description,
            deferred(move || async move {
                apply_updates(calendar.as_ref(), &matches, &updates).await
            }),
        ))
    }

    async fn delete(&self, query: &str) -> HandlerResult<HandlerOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(HandlerOutcome::text(
                "I couldn't understand which events you want to delete. Please be more specific.",
            ));
        }

        let matches = self.find_matches(query).await?;
        if matches.is_empty() {
            return Ok(HandlerOutcome::text(format!(
                "I couldn't find any events matching '{query}'."
            )));
        }

        let prompt = render::confirm_delete(query, &matches);
        let description = format!("delete {} event(s) matching '{query}'", matches.len());
        let calendar = Arc::clone(&self.calendar);
        Ok(HandlerOutcome::confirm(
            prompt,
            description,
            deferred(move || async move { apply_deletes(calendar.as_ref(), &matches).await }),
        ))
    }
}

/// Keeps events on `[first, last]`, orders them by day with all-day events
/// first, and drops duplicates seen on several calendars.
fn arrange_schedule(
    events: Vec<CalendarEvent>,
    first: NaiveDate,
    last: NaiveDate,
) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|event| on_range(event, first, last))
        .collect();

    events.sort_by_key(|event| {
        (
            event.start.local_date(),
            !event.start.is_all_day(),
            event.start.date_time.map(|dt| dt.to_utc()),
        )
    });

    let mut seen = HashSet::new();
    events.retain(|event| {
        let fresh = seen.insert((event.title().to_string(), event.start.key()));
        if !fresh {
            debug!(summary = %event.title(), "skipping duplicate event");
        }
        fresh
    });
    events
}

fn on_range(event: &CalendarEvent, first: NaiveDate, last: NaiveDate) -> bool {
    let Some(start) = event.start.local_date() else {
        return false;
    };
    if event.start.is_all_day() {
        // All-day end dates are exclusive.
        let end = event.end.date.unwrap_or(start);
        return start <= last && (end > first || start >= first);
    }
    (first..=last).contains(&start)
}

async fn apply_updates(
    calendar: &dyn CalendarService,
    matches: &[CalendarEvent],
    updates: &EventUpdates,
) -> HandlerResult<Reply> {
    let mut titles = Vec::new();
    let mut recurring = false;
    let mut last_error = None;

    for event in matches {
        match calendar.update_event(&event.id, updates).await {
            Ok(_) => {
                info!(event_id = %event.id, "modified event");
                titles.push(updates.summary.clone().unwrap_or_else(|| event.title().to_string()));
                recurring |= event.is_recurring();
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e.current_context(), "failed to modify event");
                last_error = Some(e);
            }
        }
    }

    if titles.is_empty() {
        return nothing_applied(last_error, "modify");
    }
    Ok(Reply::text(render::modified(&titles, recurring, updates)))
}

async fn apply_deletes(
    calendar: &dyn CalendarService,
    matches: &[CalendarEvent],
) -> HandlerResult<Reply> {
    let mut titles = Vec::new();
    let mut recurring = false;
    let mut last_error = None;

    for event in matches {
        match calendar.delete_event(&event.id).await {
            Ok(()) => {
                info!(event_id = %event.id, "deleted event");
                titles.push(event.title().to_string());
                recurring |= event.is_recurring();
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e.current_context(), "failed to delete event");
                last_error = Some(e);
            }
        }
    }

    if titles.is_empty() {
        return nothing_applied(last_error, "delete");
    }
    Ok(Reply::text(render::deleted(&titles, recurring)))
}

fn nothing_applied(last_error: Option<Report<CalendarError>>, verb: &str) -> HandlerResult<Reply> {
    if let Some(e) = last_error
        && matches!(e.current_context(), CalendarError::RateLimited { .. })
    {
        return Err(calendar_failure(&e));
    }
    Ok(Reply::text(format!(
        "I found matching events but couldn't {verb} them. Please try again."
    )))
}

#[async_trait]
impl CapabilityHandler for CalendarHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            name: "Calendar",
            description: "Create and manage Google Calendar events",
            capabilities: CAPABILITIES,
        }
    }

    #[instrument(skip_all, fields(user_id = %request.user))]
    async fn handle(&self, request: HandlerRequest<'_>) -> HandlerResult<HandlerOutcome> {
        let now = self.now();
        let now_text = now.format("%A, %Y-%m-%d %H:%M:%S").to_string();
        let weekday = now.format("%A").to_string();
        let prompt = CALENDAR_PROMPT.render(&[
            ("now", &now_text),
            ("weekday", &weekday),
            ("time_zone", self.calendar.time_zone()),
            ("context", &transcript(request.context)),
            ("message", request.text),
        ]);

        let parsed = LlmCall::new(CALENDAR_PROMPT.name, prompt)
            .expecting_json()
            .json::<CalendarRequest>(self.backend.as_ref())
            .await;
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return rate_limited_or(e, HandlerOutcome::text(NOT_UNDERSTOOD)),
        };
        debug!(?parsed, "parsed calendar request");

        match parsed {
            CalendarRequest::View {
                start_date,
                end_date,
            } => self
                .view(start_date.as_deref(), end_date.as_deref(), now.date())
                .await
                .map(HandlerOutcome::text),
            CalendarRequest::Create { events } => {
                self.create(&events).await.map(HandlerOutcome::text)
            }
            CalendarRequest::Modify {
                search_query,
                updates,
            } => self.modify(&search_query, updates.to_updates()).await,
            CalendarRequest::Delete { search_query } => self.delete(&search_query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_ai::{LlmError, ScriptedBackend};
    use alfred_assistant::NoStatus;
    use alfred_core::UserId;
    use alfred_integration::{CalendarSummary, EventTime, NewEvent};
    use chrono::{DateTime, FixedOffset, TimeZone};
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};

    const PST: i32 = -8 * 3600;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(PST).expect("offset")
    }

    fn pst(date: &str, time: &str) -> DateTime<FixedOffset> {
        let naive = request::parse_datetime(&format!("{date} {time}")).expect("datetime");
        offset()
            .from_local_datetime(&naive)
            .single()
            .expect("unambiguous")
    }

    fn timed(id: &str, summary: &str, date: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: summary.to_string(),
            start: EventTime::at(pst(date, start)),
            end: EventTime::at(pst(date, end)),
            ..CalendarEvent::default()
        }
    }

    /// 10:30 in Los Angeles.
    fn fixed_now() -> DateTime<Utc> {
        request::parse_datetime("2026-02-17 18:30").expect("now").and_utc()
    }

    /// 20:00 on Monday in Los Angeles, already Tuesday in UTC.
    fn late_evening() -> DateTime<Utc> {
        request::parse_datetime("2026-02-17 04:00").expect("now").and_utc()
    }

    /// In-memory calendar recording every write.
    #[derive(Default)]
    struct MemoryCalendar {
        calendars: HashMap<String, Vec<CalendarEvent>>,
        failing_calendars: HashSet<String>,
        search_results: Vec<CalendarEvent>,
        fail_writes: Option<CalendarError>,
        created: Mutex<Vec<NewEvent>>,
        updated: Mutex<Vec<(String, EventUpdates)>>,
        deleted: Mutex<Vec<String>>,
    }

    impl MemoryCalendar {
        fn with_calendar(mut self, id: &str, events: Vec<CalendarEvent>) -> Self {
            self.calendars.insert(id.to_string(), events);
            self
        }

        fn write_error(&self) -> Option<Report<CalendarError>> {
            self.fail_writes.clone().map(Report::from)
        }

        fn created(&self) -> Vec<NewEvent> {
            self.created.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        fn updated(&self) -> Vec<(String, EventUpdates)> {
            self.updated.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    #[async_trait]
    impl CalendarService for MemoryCalendar {
        async fn list_calendars(&self) -> Result<Vec<CalendarSummary>, Report<CalendarError>> {
            let mut ids: Vec<&String> = self.calendars.keys().chain(&self.failing_calendars).collect();
            ids.sort();
            Ok(ids
                .into_iter()
                .map(|id| CalendarSummary {
                    id: id.clone(),
                    summary: id.clone(),
                })
                .collect())
        }

        async fn list_events(
            &self,
            calendar_id: &str,
            _first: NaiveDate,
            _last: NaiveDate,
        ) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
            if self.failing_calendars.contains(calendar_id) {
                return Err(CalendarError::HttpStatus {
                    status: 403,
                    body: "forbidden".to_string(),
                }
                .into());
            }
            Ok(self.calendars.get(calendar_id).cloned().unwrap_or_default())
        }

        async fn search_events(
            &self,
            _query: &str,
        ) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
            Ok(self.search_results.clone())
        }

        async fn create_event(
            &self,
            event: &NewEvent,
        ) -> Result<CalendarEvent, Report<CalendarError>> {
            if let Some(e) = self.write_error() {
                return Err(e);
            }
            self.created
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            let at = |naive: NaiveDateTime| {
                EventTime::at(offset().from_local_datetime(&naive).single().expect("time"))
            };
            Ok(CalendarEvent {
                id: format!("new-{}", event.summary),
                summary: event.summary.clone(),
                description: event.description.clone(),
                location: event.location.clone(),
                start: at(event.start),
                end: at(event.end),
                recurrence: event.recurrence.iter().cloned().collect(),
                reminders: event.reminders.clone(),
            })
        }

        async fn update_event(
            &self,
            event_id: &str,
            updates: &EventUpdates,
        ) -> Result<CalendarEvent, Report<CalendarError>> {
            if let Some(e) = self.write_error() {
                return Err(e);
            }
            self.updated
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((event_id.to_string(), updates.clone()));
            Ok(CalendarEvent {
                id: event_id.to_string(),
                ..CalendarEvent::default()
            })
        }

        async fn delete_event(&self, event_id: &str) -> Result<(), Report<CalendarError>> {
            if let Some(e) = self.write_error() {
                return Err(e);
            }
            self.deleted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event_id.to_string());
            Ok(())
        }

        fn time_zone(&self) -> &str {
            "America/Los_Angeles"
        }
    }

    fn handler(
        backend: &Arc<ScriptedBackend>,
        calendar: &Arc<MemoryCalendar>,
    ) -> CalendarHandler {
        CalendarHandler::new(backend.clone(), calendar.clone()).with_clock(fixed_now)
    }

    async fn run(handler: &CalendarHandler, text: &str) -> HandlerResult<HandlerOutcome> {
        handler
            .handle(HandlerRequest {
                user: UserId::new(7),
                text,
                context: &[],
                status: &NoStatus,
            })
            .await
    }

    fn reply_text(outcome: HandlerOutcome) -> String {
        match outcome {
            HandlerOutcome::Reply(reply) => reply.text,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_event_from_parsed_request() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "create", "events": [{"summary": "Meeting", "start_datetime": "2026-02-18 15:00", "end_datetime": "2026-02-18 16:00"}]}"#,
        ));
        let calendar = Arc::new(MemoryCalendar::default());

        let outcome = run(&handler(&backend, &calendar), "Meeting tomorrow at 3pm")
            .await
            .expect("handle");

        assert_eq!(
            reply_text(outcome),
            "✓ **Meeting**\n📅 Wed, Feb 18 at 3:00 PM → 4:00 PM"
        );
        assert_eq!(calendar.created().len(), 1);

        let prompt = &backend.requests()[0];
        assert!(prompt.json_output);
        assert!(prompt.prompt.contains("Current date and time: Tuesday, 2026-02-17 10:30:00"));
        assert!(prompt.prompt.contains("Time zone: America/Los_Angeles"));
    }

    #[tokio::test]
    async fn current_time_follows_calendar_zone() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "view", "start_date": "2026-02-16", "end_date": "2026-02-16"}"#,
        ));
        let calendar = Arc::new(MemoryCalendar::default().with_calendar(
            "primary",
            vec![timed("late", "Late call", "2026-02-16", "21:00", "22:00")],
        ));
        let handler =
            CalendarHandler::new(backend.clone(), calendar.clone()).with_clock(late_evening);

        let text = reply_text(run(&handler, "what's on tonight?").await.expect("handle"));

        let prompt = &backend.requests()[0].prompt;
        assert!(prompt.contains("Current date and time: Monday, 2026-02-16 20:00:00"));
        assert!(text.starts_with("📅 Your schedule for today:"));
        assert!(text.contains("**Late call**"));
    }

    #[test]
    fn wall_clock_uses_zone_when_known() {
        let instant = late_evening();
        let tokyo = "Asia/Tokyo".parse::<Tz>().ok();
        assert_eq!(
            wall_clock(instant, tokyo),
            request::parse_datetime("2026-02-17 13:00").expect("tokyo")
        );
        assert_eq!(
            wall_clock(instant, None),
            instant.with_timezone(&Local).naive_local()
        );
    }

    #[tokio::test]
    async fn unparseable_events_are_reported() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "create", "events": [{"summary": "Meeting", "start_datetime": "tomorrow"}]}"#,
        ));
        let calendar = Arc::new(MemoryCalendar::default());

        let outcome = run(&handler(&backend, &calendar), "Meeting sometime")
            .await
            .expect("handle");
        assert_eq!(
            reply_text(outcome),
            "I couldn't parse the event details. Please try again."
        );
        assert!(calendar.created().is_empty());
    }

    #[tokio::test]
    async fn failed_creation_is_apologised_for() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "create", "events": [{"summary": "Meeting", "start_datetime": "2026-02-18 15:00", "end_datetime": "2026-02-18 16:00"}]}"#,
        ));
        let calendar = Arc::new(MemoryCalendar {
            fail_writes: Some(CalendarError::HttpStatus {
                status: 500,
                body: String::new(),
            }),
            ..MemoryCalendar::default()
        });

        let outcome = run(&handler(&backend, &calendar), "Meeting tomorrow at 3pm")
            .await
            .expect("handle");
        assert_eq!(
            reply_text(outcome),
            "Sorry, I couldn't create any calendar events. Please try again."
        );
    }

    #[tokio::test]
    async fn rate_limited_creation_propagates() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "create", "events": [{"summary": "Meeting", "start_datetime": "2026-02-18 15:00", "end_datetime": "2026-02-18 16:00"}]}"#,
        ));
        let calendar = Arc::new(MemoryCalendar {
            fail_writes: Some(CalendarError::RateLimited {
                retry_after_secs: None,
            }),
            ..MemoryCalendar::default()
        });

        let err = run(&handler(&backend, &calendar), "Meeting tomorrow at 3pm")
            .await
            .unwrap_err();
        assert!(err.current_context().is_rate_limited());
    }

    #[tokio::test]
    async fn view_merges_calendars_and_filters_dates() {
        let mut dup = timed("b1", "Standup", "2026-02-17", "09:00", "09:15");
        dup.id = "other-copy".to_string();
        let holiday = CalendarEvent {
            id: "h".to_string(),
            summary: "Holiday".to_string(),
            start: EventTime::all_day(NaiveDate::from_ymd_opt(2026, 2, 17).expect("date")),
            end: EventTime::all_day(NaiveDate::from_ymd_opt(2026, 2, 18).expect("date")),
            ..CalendarEvent::default()
        };
        let calendar = Arc::new(
            MemoryCalendar {
                failing_calendars: HashSet::from(["broken".to_string()]),
                ..MemoryCalendar::default()
            }
            .with_calendar(
                "primary",
                vec![
                    timed("a", "Lunch", "2026-02-17", "12:00", "13:00"),
                    timed("b", "Standup", "2026-02-17", "09:00", "09:15"),
                    timed("c", "Tomorrow thing", "2026-02-18", "09:00", "10:00"),
                ],
            )
            .with_calendar("work", vec![dup, holiday]),
        );
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "view", "start_date": "2026-02-17", "end_date": "2026-02-17"}"#,
        ));

        let outcome = run(&handler(&backend, &calendar), "What's on today?")
            .await
            .expect("handle");

        assert_eq!(
            reply_text(outcome),
            "📅 Your schedule for today:\n\n• All day: **Holiday**\n• 9:00 AM: **Standup**\n• 12:00 PM: **Lunch**"
        );
    }

    #[tokio::test]
    async fn empty_view_says_so() {
        let calendar = Arc::new(MemoryCalendar::default().with_calendar("primary", Vec::new()));
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "view", "start_date": "2026-02-18", "end_date": "2026-02-18"}"#,
        ));

        let outcome = run(&handler(&backend, &calendar), "Anything tomorrow?")
            .await
            .expect("handle");
        assert_eq!(
            reply_text(outcome),
            "You have no events scheduled for tomorrow."
        );
    }

    #[tokio::test]
    async fn view_without_dates_asks_again() {
        let calendar = Arc::new(MemoryCalendar::default());
        let backend = Arc::new(ScriptedBackend::new().reply(r#"{"action": "view"}"#));

        let outcome = run(&handler(&backend, &calendar), "What's on?")
            .await
            .expect("handle");
        assert_eq!(
            reply_text(outcome),
            "I couldn't understand the date range for viewing your schedule."
        );
    }

    #[tokio::test]
    async fn modification_waits_for_confirmation() {
        let mut office = timed("oh1", "Office Hours", "2026-02-19", "14:00", "15:00");
        office.recurrence = vec!["RRULE:FREQ=WEEKLY".to_string()];
        let calendar = Arc::new(MemoryCalendar {
            search_results: vec![office],
            ..MemoryCalendar::default()
        });
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "modify", "search_query": "office hours", "updates": {"summary": "Tutor Hours"}}"#,
        ));

        let outcome = run(&handler(&backend, &calendar), "Rename office hours to tutor hours")
            .await
            .expect("handle");

        let HandlerOutcome::NeedsConfirmation {
            prompt,
            description,
            action,
        } = outcome
        else {
            panic!("expected confirmation");
        };
        assert!(prompt.starts_with("I found 1 event matching 'office hours':"));
        assert_eq!(description, "modify 1 event(s) matching 'office hours'");
        assert!(calendar.updated().is_empty());

        let reply = action().await.expect("apply");
        assert_eq!(
            reply.text,
            "✓ Modified **Tutor Hours**\n🔁 Recurring\n📝 Title: **Tutor Hours**"
        );
        let updated = calendar.updated();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, "oh1");
    }

    #[tokio::test]
    async fn deletion_waits_for_confirmation() {
        let calendar = Arc::new(MemoryCalendar {
            search_results: vec![
                timed("d1", "Dentist", "2026-02-19", "10:00", "11:00"),
                timed("d2", "Dentist follow-up", "2026-03-19", "10:00", "11:00"),
            ],
            ..MemoryCalendar::default()
        });
        let backend = Arc::new(
            ScriptedBackend::new().reply(r#"{"action": "delete", "search_query": "dentist"}"#),
        );

        let outcome = run(&handler(&backend, &calendar), "Cancel my dentist appointments")
            .await
            .expect("handle");
        let HandlerOutcome::NeedsConfirmation { action, .. } = outcome else {
            panic!("expected confirmation");
        };

        let reply = action().await.expect("apply");
        assert_eq!(
            reply.text,
            "🗑️ Deleted 2 events\n• Dentist\n• Dentist follow-up"
        );
        assert_eq!(calendar.deleted(), vec!["d1".to_string(), "d2".to_string()]);
    }

    #[tokio::test]
    async fn no_matches_needs_no_confirmation() {
        let calendar = Arc::new(MemoryCalendar::default());
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"action": "modify", "search_query": "yoga", "updates": {"location": "Gym"}}"#,
        ));

        let outcome = run(&handler(&backend, &calendar), "Move yoga to the gym")
            .await
            .expect("handle");
        assert_eq!(
            reply_text(outcome),
            "I couldn't find any events matching 'yoga'."
        );
    }

    #[tokio::test]
    async fn failed_writes_after_confirmation_are_reported() {
        let calendar = Arc::new(MemoryCalendar {
            search_results: vec![timed("x", "Gym", "2026-02-19", "07:00", "08:00")],
            fail_writes: Some(CalendarError::HttpStatus {
                status: 404,
                body: String::new(),
            }),
            ..MemoryCalendar::default()
        });
        let backend = Arc::new(
            ScriptedBackend::new().reply(r#"{"action": "delete", "search_query": "gym"}"#),
        );

        let outcome = run(&handler(&backend, &calendar), "Delete gym")
            .await
            .expect("handle");
        let HandlerOutcome::NeedsConfirmation { action, .. } = outcome else {
            panic!("expected confirmation");
        };
        let reply = action().await.expect("apply");
        assert_eq!(
            reply.text,
            "I found matching events but couldn't delete them. Please try again."
        );
    }

    #[tokio::test]
    async fn garbage_from_model_gets_guidance() {
        let calendar = Arc::new(MemoryCalendar::default());
        let backend = Arc::new(ScriptedBackend::new().reply("I'm not sure what you mean"));

        let outcome = run(&handler(&backend, &calendar), "calendar stuff")
            .await
            .expect("handle");
        assert_eq!(reply_text(outcome), NOT_UNDERSTOOD);
    }

    #[tokio::test]
    async fn rate_limited_parse_propagates() {
        let calendar = Arc::new(MemoryCalendar::default());
        let backend = Arc::new(ScriptedBackend::new().fail(LlmError::RateLimited {
            retry_after_secs: Some(30),
            detail: String::new(),
        }));

        let err = run(&handler(&backend, &calendar), "Meeting tomorrow")
            .await
            .unwrap_err();
        assert!(err.current_context().is_rate_limited());
    }

    #[test]
    fn multi_day_all_day_event_overlaps_range() {
        let date = |d| NaiveDate::from_ymd_opt(2026, 2, d).expect("date");
        let trip = CalendarEvent {
            summary: "Trip".to_string(),
            start: EventTime::all_day(date(15)),
            end: EventTime::all_day(date(19)),
            ..CalendarEvent::default()
        };
        assert!(on_range(&trip, date(17), date(17)));
        assert!(!on_range(&trip, date(19), date(20)));
        assert!(!on_range(&trip, date(10), date(14)));
    }
}
