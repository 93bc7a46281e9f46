use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use crate::channel::Channel;
use crate::error::ChannelError;

const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_MAX: Duration = Duration::from_secs(300);
const MAX_ATTEMPTS: u32 = 10;

/// Guards a single channel's reconnect attempts so concurrent health-probe
/// failures don't each kick off their own reconnect loop (spec §4.11:
/// "auto-reconnect with a single-flight guard to prevent reconnect storms").
pub struct ReconnectGuard {
    in_flight: Arc<AtomicBool>,
}

impl ReconnectGuard {
    pub fn new() -> Self {
        Self { in_flight: Arc::new(AtomicBool::new(false)) }
    }

    /// Attempt a reconnect with exponential backoff + jitter. If a reconnect
    /// is already underway, returns immediately without starting a second one.
    pub async fn reconnect(&self, name: &str, channel: &mut dyn Channel) -> Result<(), ChannelError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            info!(channel = name, "reconnect already in flight, skipping");
            return Ok(());
        }
        let result = reconnect_with_backoff(name, channel).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

impl Default for ReconnectGuard {
    fn default() -> Self {
        Self::new()
    }
}

async fn reconnect_with_backoff(name: &str, channel: &mut dyn Channel) -> Result<(), ChannelError> {
    let mut delay = BACKOFF_BASE;
    for attempt in 1..=MAX_ATTEMPTS {
        match channel.connect().await {
            Ok(()) => {
                info!(channel = name, attempt, "channel reconnected");
                return Ok(());
            }
            Err(e) if attempt == MAX_ATTEMPTS => {
                error!(channel = name, error = %e, "giving up on reconnect after max attempts");
                return Err(e);
            }
            Err(e) => {
                let jitter_frac: f64 = rand::thread_rng().gen_range(-0.1..=0.1);
                let jittered = delay.mul_f64(1.0 + jitter_frac);
                warn!(channel = name, attempt, error = %e, delay_secs = jittered.as_secs(), "reconnect failed, backing off");
                tokio::time::sleep(jittered).await;
                delay = (delay * 2).min(BACKOFF_MAX);
            }
        }
    }
    unreachable!("backoff loop always returns")
}
