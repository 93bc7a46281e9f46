//! E-mail channel adapter (C13/C14, spec §4.13/§4.14). Unlike Mumble/SIP
//! there's no persistent connection to hold open — `run` just ticks two
//! independent timers: an IMAP poll and the daily digest sweep.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mai_channels::channel::Channel;
use mai_channels::error::ChannelError;
use mai_channels::types::{ChannelStatus, OutboundMessage};
use mai_config::ConfigStore;
use mai_dialog::DialogOrchestrator;
use mai_llm::LlmClient;
use mai_memory::MemoryStore;
use tokio::time::interval;
use tracing::{info, warn};

use crate::error::EmailError;
use crate::transport::MailTransport;
use crate::{poller, summary};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
const DIGEST_TICK_INTERVAL: Duration = Duration::from_secs(60);

pub struct EmailAdapterConfig {
    pub bot_email: String,
    pub poll_interval: Duration,
}

impl Default for EmailAdapterConfig {
    fn default() -> Self {
        Self { bot_email: String::new(), poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

pub struct EmailAdapter {
    cfg: EmailAdapterConfig,
    transport: Box<dyn MailTransport>,
    store: Arc<MemoryStore>,
    dialog: Arc<DialogOrchestrator>,
    config: Arc<ConfigStore>,
    llm: Arc<LlmClient>,
    status: Mutex<ChannelStatus>,
}

impl EmailAdapter {
    pub fn new(
        cfg: EmailAdapterConfig,
        transport: Box<dyn MailTransport>,
        store: Arc<MemoryStore>,
        dialog: Arc<DialogOrchestrator>,
        config: Arc<ConfigStore>,
        llm: Arc<LlmClient>,
    ) -> Self {
        Self { cfg, transport, store, dialog, config, llm, status: Mutex::new(ChannelStatus::Disconnected) }
    }

    /// Drive both timers until cancelled. The caller (the channel
    /// supervisor) restarts this after a transient failure via
    /// `mai_channels::ReconnectGuard`, matching the Mumble/SIP adapters.
    pub async fn run(&mut self) -> Result<(), EmailError> {
        *self.status.lock().unwrap() = ChannelStatus::Connected;
        let mut poll_ticker = interval(self.cfg.poll_interval);
        let mut digest_ticker = interval(DIGEST_TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = poll_ticker.tick() => self.poll_once().await,
                _ = digest_ticker.tick() => self.digest_once().await,
            }
        }
    }

    async fn poll_once(&mut self) {
        match poller::poll_once(self.transport.as_mut(), &self.store, &self.dialog, &self.llm, &self.cfg.bot_email).await {
            Ok(n) if n > 0 => info!(processed = n, "email poll cycle processed messages"),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "email poll cycle failed");
                *self.status.lock().unwrap() = ChannelStatus::Error(e.to_string());
            }
        }
    }

    async fn digest_once(&mut self) {
        let now = Utc::now();
        if let Err(e) = summary::run_once(self.transport.as_mut(), &self.store, &self.config, &self.llm, &self.cfg.bot_email, now).await {
            warn!(error = %e, "daily digest sweep failed");
        }
    }
}

#[async_trait]
impl Channel for EmailAdapter {
    fn name(&self) -> &str {
        "email"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        *self.status.lock().unwrap() = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.status.lock().unwrap() = ChannelStatus::Disconnected;
        Ok(())
    }

    /// There's no live socket to push through outside a poll/reply cycle;
    /// e-mail delivery happens inline in `poller`/`summary`.
    async fn send(&self, _msg: &OutboundMessage) -> Result<(), ChannelError> {
        Err(ChannelError::Invariant("email channel has no out-of-band send path outside a poll cycle".into()))
    }

    fn status(&self) -> ChannelStatus {
        self.status.lock().unwrap().clone()
    }
}
