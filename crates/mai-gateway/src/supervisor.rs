//! Per-channel supervisor loops: connect, run until the connection drops or
//! errors, reconnect with backoff, repeat. One function per channel because
//! each adapter's `run()` has a different receiver (`&mut self` for
//! Mumble/Email, `&self` for SIP) and error type — not worth forcing a
//! shared abstraction the channel adapters themselves don't share.

use std::sync::Arc;

use mai_channels::channel::Channel;
use mai_channels::types::ChannelStatus;
use mai_channels::ReconnectGuard;
use mai_email::EmailAdapter;
use mai_mumble::MumbleAdapter;
use mai_sip::SipAdapter;
use tracing::{error, warn};

use crate::app::AppState;

pub async fn run_mumble(state: Arc<AppState>, mut adapter: MumbleAdapter) {
    let guard = ReconnectGuard::new();
    if let Err(e) = Channel::connect(&mut adapter).await {
        error!(error = %e, "mumble initial connect failed");
    }
    loop {
        state.channel_status.insert("mumble".to_string(), adapter.status());
        if let Err(e) = adapter.run().await {
            warn!(error = %e, "mumble channel run loop exited, reconnecting");
        }
        state.channel_status.insert("mumble".to_string(), ChannelStatus::Disconnected);
        if let Err(e) = guard.reconnect("mumble", &mut adapter).await {
            error!(error = %e, "mumble reconnect exhausted, backing off before retrying supervisor loop");
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }
}

pub async fn run_sip(state: Arc<AppState>, mut adapter: SipAdapter) {
    let guard = ReconnectGuard::new();
    if let Err(e) = Channel::connect(&mut adapter).await {
        error!(error = %e, "sip initial bind failed");
    }
    loop {
        state.channel_status.insert("sip".to_string(), adapter.status());
        if let Err(e) = adapter.run().await {
            warn!(error = %e, "sip channel run loop exited, reconnecting");
        }
        state.channel_status.insert("sip".to_string(), ChannelStatus::Disconnected);
        if let Err(e) = guard.reconnect("sip", &mut adapter).await {
            error!(error = %e, "sip reconnect exhausted, backing off before retrying supervisor loop");
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }
}

pub async fn run_email(state: Arc<AppState>, mut adapter: EmailAdapter) {
    let guard = ReconnectGuard::new();
    if let Err(e) = Channel::connect(&mut adapter).await {
        error!(error = %e, "email adapter connect failed");
    }
    loop {
        state.channel_status.insert("email".to_string(), adapter.status());
        if let Err(e) = adapter.run().await {
            warn!(error = %e, "email channel run loop exited, reconnecting");
        }
        state.channel_status.insert("email".to_string(), ChannelStatus::Disconnected);
        if let Err(e) = guard.reconnect("email", &mut adapter).await {
            error!(error = %e, "email reconnect exhausted, backing off before retrying supervisor loop");
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }
}
