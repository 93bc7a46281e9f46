use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::SpeechError;

/// Exponential-backoff retry, same contract as `mai_llm::retry::with_retry`.
pub async fn with_retry<T, F, Fut>(attempts: u32, base: Duration, cap: Duration, mut call: F) -> Result<T, SpeechError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SpeechError>>,
{
    let mut last_err = None;
    for attempt in 0..attempts {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                warn!(attempt, error = %e, "speech service call failed, retrying");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), Duration::from_millis(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, SpeechError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_service_unavailable() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, SpeechError> = with_retry(3, Duration::from_millis(1), Duration::from_millis(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SpeechError::ServiceUnavailable { provider: "whisper", retry_after_secs: 60 }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
