use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("wav i/o error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;
