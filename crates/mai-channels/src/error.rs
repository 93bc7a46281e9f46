use thiserror::Error;

/// Errors surfaced by any channel adapter (spec §7 error kinds 1/2/7).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("upstream service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal invariant breach: {0}")]
    Invariant(String),
}
