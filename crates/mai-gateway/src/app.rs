use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use dashmap::DashMap;
use mai_channels::types::ChannelStatus;
use mai_config::ConfigStore;
use mai_dialog::DialogOrchestrator;
use mai_email::transport::MailTransport;
use mai_llm::LlmClient;
use mai_memory::MemoryStore;
use mai_sessions::SessionManager;
use mai_speech::SpeechClient;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::GatewayConfig;

/// Central shared state handed to every admin HTTP handler (spec §6).
pub struct AppState {
    pub config: GatewayConfig,
    pub store: Arc<MemoryStore>,
    pub config_store: Arc<ConfigStore>,
    pub llm: Arc<LlmClient>,
    pub sessions: Arc<SessionManager>,
    pub dialog: Arc<DialogOrchestrator>,
    pub speech: Arc<SpeechClient>,
    /// `mai-email`'s live IMAP/SMTP transport, shared with the e-mail
    /// supervisor task so an admin-initiated retry reuses the same
    /// connection settings rather than opening a second one.
    pub email_transport: AsyncMutex<Box<dyn MailTransport>>,
    /// Latest known status per channel name ("mumble", "sip", "email"),
    /// updated by each channel's supervisor loop.
    pub channel_status: DashMap<String, ChannelStatus>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: GatewayConfig,
        store: Arc<MemoryStore>,
        config_store: Arc<ConfigStore>,
        llm: Arc<LlmClient>,
        sessions: Arc<SessionManager>,
        dialog: Arc<DialogOrchestrator>,
        speech: Arc<SpeechClient>,
        email_transport: Box<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            store,
            config_store,
            llm,
            sessions,
            dialog,
            speech,
            email_transport: AsyncMutex::new(email_transport),
            channel_status: DashMap::new(),
        }
    }
}

/// Assemble the full admin HTTP surface (spec §6).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api/memories", get(crate::http::memory::list_memories).post(crate::http::memory::create_memory))
        .route("/api/schedule", get(crate::http::schedule::list_schedule).post(crate::http::schedule::create_event))
        .route("/api/schedule/upcoming", get(crate::http::schedule::upcoming))
        .route(
            "/api/schedule/{id}",
            patch(crate::http::schedule::update_event).delete(crate::http::schedule::delete_event),
        )
        .route("/api/conversations/{session_id}", get(crate::http::conversations::recent_turns))
        .route("/api/conversations/{session_id}/search", get(crate::http::conversations::search))
        .route("/api/email/logs/{id}", get(crate::http::email::get_log))
        .route("/api/email/logs/{id}/retry", post(crate::http::email::retry_log))
        .route("/api/email/mapping", post(crate::http::email::map_address))
        .route("/api/settings", get(crate::http::settings::list_settings).post(crate::http::settings::set_setting))
        .route(
            "/api/settings/email",
            get(crate::http::settings::get_email_settings).put(crate::http::settings::put_email_settings),
        )
        .route("/", get(|| async { "mai-ai gateway" }))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
