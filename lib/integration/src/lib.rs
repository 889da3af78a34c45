//! External services used by the Alfred assistant.
//!
//! This crate provides:
//!
//! - **Calendar**: the [`CalendarService`] trait and a Google Calendar REST
//!   client authenticated with an OAuth refresh token
//! - **Media**: the [`MediaDownloader`] trait and a `yt-dlp` process driver

pub mod calendar;
pub mod error;
pub mod google_calendar;
pub mod media;
pub mod oauth;
pub mod ytdlp;

pub use calendar::{
    CalendarEvent, CalendarService, CalendarSummary, EventTime, EventUpdates, NewEvent,
    ReminderOverride, Reminders,
};
pub use error::{CalendarError, MediaError};
pub use google_calendar::{GoogleCalendar, GoogleCalendarConfig};
pub use media::{DownloadedMedia, MediaDownloader, MediaFormat, UnsupportedFormat};
pub use oauth::{AccessTokenSource, GoogleCredentials, RefreshingTokenSource, StaticToken};
pub use ytdlp::YtDlp;
