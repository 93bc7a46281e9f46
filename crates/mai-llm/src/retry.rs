use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::LlmError;

/// Exponential-backoff retry (spec §4.2): default 3 attempts, base 2s,
/// capped at 8s, ±20% jitter. Empty-string responses are treated as a soft
/// failure by the caller mapping them to [`LlmError::EmptyResponse`] before
/// this wrapper sees them, so they retry the same as any transient error.
pub async fn with_retry<T, F, Fut>(attempts: u32, base: Duration, cap: Duration, mut call: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_err = None;
    for attempt in 0..attempts {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                warn!(attempt, error = %e, "llm call failed, retrying");
                last_err = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(backoff_delay(attempt, base, cap)).await;
                }
            }
        }
    }
    Err(last_err.expect("attempts > 0"))
}

fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt).min(cap);
    let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered_ms = (exp.as_millis() as f64 * (1.0 + jitter_frac)).max(0.0);
    Duration::from_millis(jittered_ms as u64)
}
