use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mai_channels::channel::Channel;
use mai_config::ConfigStore;
use mai_dialog::DialogOrchestrator;
use mai_email::transport::{ImapSmtpTransport, MailTransport};
use mai_email::reply::ReplyEnvelope;
use mai_email::{EmailAdapter, EmailAdapterConfig};
use mai_llm::LlmClient;
use mai_memory::MemoryStore;
use mai_mumble::{LiveMumbleTransport, MumbleAdapter};
use mai_scheduler::reminder;
use mai_sessions::SessionManager;
use mai_sip::{SipAdapter, SipAdapterConfig};
use mai_speech::SpeechClient;
use rusqlite::Connection;
use tracing::{info, warn};

mod app;
mod config;
mod http;
mod supervisor;

use app::{build_router, AppState};
use config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "mai_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("MAI_CONFIG").ok();
    let config = GatewayConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        GatewayConfig::default()
    });

    let conn = Connection::open(&config.database.path)?;
    let store = Arc::new(MemoryStore::new(conn)?);
    let config_store = Arc::new(ConfigStore::new(Arc::clone(&store)));
    config_store.preload()?;

    let llm = Arc::new(LlmClient::new(config.llm.ollama_url.clone()));
    let sessions = Arc::new(SessionManager::new(Arc::clone(&store), Arc::clone(&config_store)));
    let dialog = Arc::new(DialogOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&config_store),
        Arc::clone(&llm),
        Arc::clone(&sessions),
    ));
    let speech = Arc::new(SpeechClient::new(config.speech.whisper_url.clone(), config.speech.tts_url.clone()));

    let email_settings = store.get_email_settings()?;
    let email_transport: Box<dyn MailTransport> = Box::new(ImapSmtpTransport::new(email_settings));

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&store),
        Arc::clone(&config_store),
        Arc::clone(&llm),
        Arc::clone(&sessions),
        Arc::clone(&dialog),
        Arc::clone(&speech),
        email_transport,
    ));

    if config.mumble.enabled {
        let transport = Box::new(LiveMumbleTransport::new(config.mumble.server_addr.clone(), config.mumble.username.clone()));
        let adapter = MumbleAdapter::new(transport, Arc::clone(&dialog), Arc::clone(&speech), Arc::clone(&config_store));
        tokio::spawn(supervisor::run_mumble(Arc::clone(&state), adapter));
    }

    if config.sip.enabled {
        let cfg = SipAdapterConfig {
            local_sip_addr: config.sip.local_sip_addr,
            local_media_ip: config.sip.local_media_ip,
            rtp_port_range: (config.sip.rtp_port_min, config.sip.rtp_port_max),
            contact_uri: config.sip.contact_uri.clone(),
            greeting: config.sip.greeting.clone(),
            manual_vad_threshold_rms: config.sip.manual_vad_threshold_rms,
        };
        let adapter = SipAdapter::new(cfg, Arc::clone(&dialog), Arc::clone(&speech), Arc::clone(&config_store));
        tokio::spawn(supervisor::run_sip(Arc::clone(&state), adapter));
    }

    if config.email.enabled {
        let email_settings = store.get_email_settings()?;
        let transport = Box::new(ImapSmtpTransport::new(email_settings));
        let adapter_cfg = EmailAdapterConfig {
            bot_email: config.email.bot_email.clone(),
            poll_interval: Duration::from_secs(config.email.poll_interval_secs),
        };
        let adapter = EmailAdapter::new(adapter_cfg, transport, Arc::clone(&store), Arc::clone(&dialog), Arc::clone(&config_store), Arc::clone(&llm));
        tokio::spawn(supervisor::run_email(Arc::clone(&state), adapter));
    }

    tokio::spawn(reminder_sweep_loop(Arc::clone(&state)));

    let router = build_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", config.admin_http.bind, config.admin_http.port).parse()?;
    info!(%addr, "mai-ai gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Drives the reminder sweep (spec §4.10) once a minute, sending due
/// reminders through the same IMAP/SMTP transport the e-mail channel uses.
async fn reminder_sweep_loop(state: Arc<AppState>) {
    let tz: chrono_tz::Tz = state.config_store.display_timezone().parse().unwrap_or(chrono_tz::UTC);
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        let now = Utc::now();
        let bot_email = state.config.email.bot_email.clone();
        let result = reminder::run_sweep(&state.store, now, &tz, |due| {
            let bot_email = bot_email.clone();
            let state = Arc::clone(&state);
            async move {
                let Some(recipient) = due.event.recipient_email.clone() else {
                    return Err("reminder has no recipient_email configured".to_string());
                };
                let envelope = ReplyEnvelope {
                    to: recipient,
                    subject: format!("Reminder: {}", due.event.title),
                    in_reply_to: None,
                    references: Vec::new(),
                    plain_body: reminder_body(&due),
                    html_body: format!("<p>{}</p>", reminder_body(&due).replace('\n', "<br>")),
                };
                let mut transport = state.email_transport.lock().await;
                transport.send(&bot_email, &envelope).await.map_err(|e| e.to_string())
            }
        })
        .await;

        if let Err(e) = result {
            warn!(error = %e, "reminder sweep failed");
        }
    }
}

fn reminder_body(due: &reminder::DueReminder) -> String {
    let mut body = format!("Reminder: {} on {}", due.event.title, due.event.event_date);
    if let Some(time) = due.event.event_time {
        body.push_str(&format!(" at {time}"));
    }
    if let Some(description) = &due.event.description {
        body.push_str(&format!("\n\n{description}"));
    }
    body
}
