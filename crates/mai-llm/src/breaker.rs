use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-operation circuit breaker (spec §4.2): 5 consecutive failures opens
/// the breaker for 60s; half-open admits exactly one probe. A probe success
/// closes the breaker; a probe failure re-opens it for another window.
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_duration: Duration,
    state: Mutex<State>,
}

enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_duration: Duration) -> Self {
        Self { failure_threshold, open_duration, state: Mutex::new(State::Closed { consecutive_failures: 0 }) }
    }

    /// Returns `Ok(())` if a call may proceed (closed, or half-open probe
    /// slot granted), or `Err(remaining_secs)` if the breaker is open.
    pub fn check(&self) -> Result<(), u64> {
        let mut state = self.state.lock().unwrap();
        match &*state {
            State::Closed { .. } => Ok(()),
            State::HalfOpen => Err(0),
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.open_duration {
                    *state = State::HalfOpen;
                    Ok(())
                } else {
                    Err((self.open_duration - elapsed).as_secs())
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        *state = State::Closed { consecutive_failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        match &*state {
            State::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    *state = State::Open { opened_at: Instant::now() };
                } else {
                    *state = State::Closed { consecutive_failures: failures };
                }
            }
            State::HalfOpen | State::Open { .. } => {
                *state = State::Open { opened_at: Instant::now() };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.record_failure();
            assert!(breaker.check().is_ok());
        }
        breaker.record_failure();
        assert!(breaker.check().is_err());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        for _ in 0..4 {
            breaker.record_failure();
            assert!(breaker.check().is_ok());
        }
    }

    #[test]
    fn half_open_after_window_elapses() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert!(breaker.check().is_err());
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.check().is_ok(), "should admit a half-open probe after the window");
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.check().is_ok());
        breaker.record_failure();
        assert!(breaker.check().is_err());
    }
}
