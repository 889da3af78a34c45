//! Google Calendar v3 REST client.

use crate::calendar::{
    CalendarEvent, CalendarService, CalendarSummary, EventUpdates, NewEvent,
};
use crate::error::CalendarError;
use crate::oauth::AccessTokenSource;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use rootcause::prelude::Report;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Maximum number of events requested per list call.
const MAX_RESULTS: &str = "250";

/// Maximum number of matches returned by a search.
const MAX_SEARCH_RESULTS: &str = "50";

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCalendarConfig {
    /// Calendar written to and searched.
    pub calendar_id: String,
    /// IANA zone for wall-clock times.
    pub time_zone: String,
    /// API base URL.
    pub base_url: String,
}

impl Default for GoogleCalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: "America/Los_Angeles".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// A [`CalendarService`] backed by the Google Calendar REST API.
pub struct GoogleCalendar {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    config: GoogleCalendarConfig,
}

impl std::fmt::Debug for GoogleCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendar")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GoogleCalendar {
    /// Creates a client.
    #[must_use]
    pub fn new(tokens: Arc<dyn AccessTokenSource>, config: GoogleCalendarConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            config,
        }
    }

    /// Base URL with `segments` appended, each percent-encoded as a path
    /// segment (calendar ids contain `@` and `#`).
    fn url(&self, segments: &[&str]) -> Result<Url, Report<CalendarError>> {
        let invalid = |reason: String| CalendarError::InvalidConfig { reason };
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| invalid(format!("base URL {}: {e}", self.config.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("base URL {} cannot take a path", self.config.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn events_url(&self, calendar_id: &str) -> Result<Url, Report<CalendarError>> {
        self.url(&["calendars", calendar_id, "events"])
    }

    fn event_url(&self, event_id: &str) -> Result<Url, Report<CalendarError>> {
        self.url(&["calendars", self.config.calendar_id.as_str(), "events", event_id])
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
    ) -> Result<RequestBuilder, Report<CalendarError>> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, Report<CalendarError>> {
        let response = builder
            .send()
            .await
            .map_err(|e| CalendarError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(CalendarError::RateLimited { retry_after_secs }.into());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "calendar API error");
        Err(CalendarError::HttpStatus {
            status: status.as_u16(),
            body,
        }
        .into())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, Report<CalendarError>> {
        let response = self.send(builder).await?;
        let value = response
            .json()
            .await
            .map_err(|e| CalendarError::ResponseParseFailed {
                reason: e.to_string(),
            })?;
        Ok(value)
    }

    fn wall_clock(&self, at: NaiveDateTime) -> JsonValue {
        json!({
            "dateTime": at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "timeZone": self.config.time_zone,
        })
    }

    fn create_body(&self, event: &NewEvent) -> JsonValue {
        let mut body = Map::new();
        body.insert("summary".into(), json!(event.summary));
        body.insert("start".into(), self.wall_clock(event.start));
        body.insert("end".into(), self.wall_clock(event.end));
        if let Some(description) = &event.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(location) = &event.location {
            body.insert("location".into(), json!(location));
        }
        if let Some(rule) = &event.recurrence {
            body.insert("recurrence".into(), json!([rule]));
        }
        if let Some(reminders) = &event.reminders {
            body.insert("reminders".into(), json!(reminders));
        }
        JsonValue::Object(body)
    }

    fn patch_body(&self, updates: &EventUpdates) -> JsonValue {
        let mut body = Map::new();
        if let Some(summary) = &updates.summary {
            body.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &updates.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(location) = &updates.location {
            body.insert("location".into(), json!(location));
        }
        if let Some(start) = updates.start {
            body.insert("start".into(), self.wall_clock(start));
        }
        if let Some(end) = updates.end {
            body.insert("end".into(), self.wall_clock(end));
        }
        if let Some(reminders) = &updates.reminders {
            body.insert("reminders".into(), json!(reminders));
        }
        JsonValue::Object(body)
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    #[instrument(skip(self))]
    async fn list_calendars(&self) -> Result<Vec<CalendarSummary>, Report<CalendarError>> {
        let builder = self
            .request(Method::GET, self.url(&["users", "me", "calendarList"])?)
            .await?;
        let page: ListPage<CalendarSummary> = self.send_json(builder).await?;
        debug!(calendars = page.items.len(), "listed calendars");
        Ok(page.items)
    }

    #[instrument(skip(self))]
    async fn list_events(
        &self,
        calendar_id: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
        // The window is widened by a day on each side so that any UTC offset
        // is covered; callers filter on local dates.
        let from = first
            .checked_sub_days(Days::new(1))
            .unwrap_or(first)
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let to = last
            .checked_add_days(Days::new(2))
            .unwrap_or(last)
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();

        let builder = self
            .request(Method::GET, self.events_url(calendar_id)?)
            .await?
            .query(&[
                ("timeMin", from.to_rfc3339().as_str()),
                ("timeMax", to.to_rfc3339().as_str()),
                ("timeZone", self.config.time_zone.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", MAX_RESULTS),
            ]);
        let page: ListPage<CalendarEvent> = self.send_json(builder).await?;
        debug!(calendar_id, events = page.items.len(), "listed events");
        Ok(page.items)
    }

    #[instrument(skip(self))]
    async fn search_events(&self, query: &str) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
        let now = Utc::now().to_rfc3339();
        let builder = self
            .request(Method::GET, self.events_url(&self.config.calendar_id)?)
            .await?
            .query(&[
                ("q", query),
                ("timeMin", now.as_str()),
                ("timeZone", self.config.time_zone.as_str()),
                ("maxResults", MAX_SEARCH_RESULTS),
            ]);
        let page: ListPage<CalendarEvent> = self.send_json(builder).await?;
        debug!(matches = page.items.len(), "searched events");
        Ok(page.items)
    }

    #[instrument(skip(self, event), fields(summary = %event.summary))]
    async fn create_event(&self, event: &NewEvent) -> Result<CalendarEvent, Report<CalendarError>> {
        let builder = self
            .request(Method::POST, self.events_url(&self.config.calendar_id)?)
            .await?
            .json(&self.create_body(event));
        self.send_json(builder).await
    }

    #[instrument(skip(self, updates))]
    async fn update_event(
        &self,
        event_id: &str,
        updates: &EventUpdates,
    ) -> Result<CalendarEvent, Report<CalendarError>> {
        let builder = self
            .request(Method::PATCH, self.event_url(event_id)?)
            .await?
            .json(&self.patch_body(updates));
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, event_id: &str) -> Result<(), Report<CalendarError>> {
        let builder = self
            .request(Method::DELETE, self.event_url(event_id)?)
            .await?;
        self.send(builder).await?;
        Ok(())
    }

    fn time_zone(&self) -> &str {
        &self.config.time_zone
    }
}
