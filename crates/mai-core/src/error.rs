use thiserror::Error;

/// Errors shared by every external-service caller in the workspace
/// (spec §7: "Transient external failure" / "Persistent external failure").
///
/// Concrete crates (`mai-llm`, `mai-email`, `mai-sip`, …) define their own
/// richer error enums but funnel service-call failures through this shape
/// so `mai-dialog` can decide, in one place, whether to retry, surface a
/// fallback message, or swallow the failure per spec §7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("service returned an error: {0}")]
    Failed(String),
}

impl ServiceError {
    /// True for errors that should trip a circuit breaker / be retried;
    /// false for errors that are already terminal (e.g. validation).
    pub fn is_transient(&self) -> bool {
        !matches!(self, ServiceError::Unavailable(_))
    }
}
