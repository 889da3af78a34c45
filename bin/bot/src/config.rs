//! Bot configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating sections from keys (`DISCORD__TOKEN`, `MEDIA__MAX_URLS`).
//! Only the Discord token and the Gemini API key are required.

use alfred_ai::GeminiConfig;
use alfred_assistant::{DEFAULT_COMMAND_PREFIX, DEFAULT_CONFIDENCE_THRESHOLD};
use alfred_conversation::{ContextPolicy, DEFAULT_MAX_TURNS, DEFAULT_WINDOW_MINUTES};
use alfred_features::{DEFAULT_MAX_UPLOAD_MB, DEFAULT_MAX_URLS};
use alfred_integration::{GoogleCalendarConfig, GoogleCredentials};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// Discord connection settings.
    pub discord: DiscordConfig,

    /// LLM settings.
    pub gemini: GeminiConfig,

    /// Conversation memory limits.
    #[serde(default)]
    pub context: ContextConfig,

    /// Intent routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Google Calendar settings. The calendar handler is only registered
    /// when credentials are present.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Media download settings.
    #[serde(default)]
    pub media: MediaConfig,
}

/// Discord settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: String,

    /// User that gets a DM once the bot is connected.
    #[serde(default)]
    pub owner_id: Option<u64>,

    /// Prefix for text commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}

/// Conversation memory limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Turns kept per user.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Age after which turns are forgotten.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_window_minutes() -> i64 {
    DEFAULT_WINDOW_MINUTES
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            window_minutes: default_window_minutes(),
        }
    }
}

impl ContextConfig {
    /// The retention policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> ContextPolicy {
        ContextPolicy::new(self.max_turns, self.window_minutes)
    }
}

/// Intent routing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Lowest confidence at which a routing verdict is accepted.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// OAuth client id.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Long-lived refresh token for the account.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Calendar that new events go into and searches run against.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// IANA time zone for wall-clock times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            calendar_id: default_calendar_id(),
            timezone: default_timezone(),
        }
    }
}

impl CalendarConfig {
    /// OAuth credentials, if all three parts are set.
    #[must_use]
    pub fn credentials(&self) -> Option<GoogleCredentials> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Some(GoogleCredentials {
            client_id: present(&self.client_id)?,
            client_secret: present(&self.client_secret)?,
            refresh_token: present(&self.refresh_token)?,
        })
    }

    /// Settings for the REST client.
    #[must_use]
    pub fn service_config(&self) -> GoogleCalendarConfig {
        GoogleCalendarConfig {
            calendar_id: self.calendar_id.clone(),
            time_zone: self.timezone.clone(),
            ..GoogleCalendarConfig::default()
        }
    }
}

/// Media download settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// `yt-dlp` executable.
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: PathBuf,

    /// Where downloads are written before upload.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Links accepted per request.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Largest file attached to a reply, in MB.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_yt_dlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("alfred_media")
}

fn default_max_urls() -> usize {
    DEFAULT_MAX_URLS
}

fn default_max_upload_mb() -> u64 {
    DEFAULT_MAX_UPLOAD_MB
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp_path(),
            download_dir: default_download_dir(),
            max_urls: default_max_urls(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, config::ConfigError> {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<config::Map<String, String>>();
        BotConfig::from_environment(config::Environment::default().source(Some(source)))
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = load(&[("DISCORD__TOKEN", "discord-token"), ("GEMINI__API_KEY", "key")])
            .expect("config");

        assert_eq!(config.discord.token, "discord-token");
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.discord.owner_id, None);
        assert_eq!(config.gemini.api_key, "key");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.context.max_turns, 10);
        assert_eq!(config.context.window_minutes, 15);
        assert!((config.routing.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.calendar.credentials(), None);
        assert_eq!(config.media.max_urls, 5);
        assert_eq!(config.media.max_upload_mb, 25);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DISCORD__TOKEN", "t"),
            ("DISCORD__OWNER_ID", "123456789"),
            ("GEMINI__API_KEY", "k"),
            ("CONTEXT__MAX_TURNS", "4"),
            ("CALENDAR__CLIENT_ID", "id"),
            ("CALENDAR__CLIENT_SECRET", "secret"),
            ("CALENDAR__REFRESH_TOKEN", "refresh"),
            ("CALENDAR__TIMEZONE", "Europe/Berlin"),
        ])
        .expect("config");

        assert_eq!(config.discord.owner_id, Some(123_456_789));
        assert_eq!(config.context.policy().max_turns, 4);
        let credentials = config.calendar.credentials().expect("credentials");
        assert_eq!(credentials.refresh_token, "refresh");
        assert_eq!(config.calendar.service_config().time_zone, "Europe/Berlin");
        assert_eq!(config.calendar.service_config().calendar_id, "primary");
    }

    #[test]
    fn partial_credentials_disable_calendar() {
        let calendar = CalendarConfig {
            client_id: Some("id".to_string()),
            refresh_token: Some("  ".to_string()),
            ..CalendarConfig::default()
        };
        assert_eq!(calendar.credentials(), None);
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(load(&[("GEMINI__API_KEY", "k")]).is_err());
    }
}
