//! Wires configuration, services and handlers into a [`Dispatcher`].

use crate::config::BotConfig;
use alfred_ai::LlmBackend;
use alfred_assistant::{ConfirmationClassifier, Dispatcher, IntentRouter};
use alfred_conversation::ContextStore;
use alfred_features::{
    CalendarHandler, ConversationHandler, FunFactHandler, MediaHandler, SearchHandler,
};
use alfred_integration::{CalendarError, GoogleCalendar, RefreshingTokenSource, YtDlp};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the dispatcher with every handler the configuration allows.
///
/// Registration order is Calendar, FunFact, Media Download, Search,
/// Conversation; the router prompt lists handlers in this order.
///
/// # Errors
///
/// Returns an error if calendar credentials are present but unusable.
pub fn build_dispatcher(
    config: &BotConfig,
    backend: Arc<dyn LlmBackend>,
) -> Result<Dispatcher, Report<CalendarError>> {
    let mut router = IntentRouter::new(Arc::clone(&backend))
        .with_threshold(config.routing.confidence_threshold);

    if let Some(credentials) = config.calendar.credentials() {
        let tokens = Arc::new(RefreshingTokenSource::new(credentials)?);
        let calendar = Arc::new(GoogleCalendar::new(tokens, config.calendar.service_config()));
        router.register(Arc::new(CalendarHandler::new(Arc::clone(&backend), calendar)));
        info!(calendar_id = %config.calendar.calendar_id, "calendar enabled");
    } else {
        warn!("calendar credentials not configured; calendar handler disabled");
    }

    let downloader = Arc::new(YtDlp::new(
        &config.media.yt_dlp_path,
        &config.media.download_dir,
    ));
    router.register(Arc::new(FunFactHandler::new(Arc::clone(&backend))));
    router.register(Arc::new(
        MediaHandler::new(Arc::clone(&backend), downloader)
            .with_limits(config.media.max_urls, config.media.max_upload_mb),
    ));
    router.register(Arc::new(SearchHandler::new(Arc::clone(&backend))));
    router.register(Arc::new(ConversationHandler::new(Arc::clone(&backend))));

    let names: Vec<&str> = router.handlers().iter().map(|h| h.descriptor().name).collect();
    info!(handlers = ?names, "handlers registered");

    Ok(Dispatcher::new(
        router,
        ConfirmationClassifier::new(backend),
        ContextStore::new(config.context.policy()),
    )
    .with_command_prefix(config.discord.command_prefix.clone()))
}
