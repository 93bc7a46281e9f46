use thiserror::Error;

#[derive(Debug, Error)]
pub enum MumbleError {
    #[error("mumble connection failed: {0}")]
    Connect(String),

    #[error("mumble stream error: {0}")]
    Stream(String),

    #[error("not connected")]
    NotConnected,

    #[error("speech service error: {0}")]
    Speech(#[from] mai_speech::SpeechError),

    #[error("audio pipeline error: {0}")]
    Audio(#[from] mai_audio::AudioError),

    #[error("dialog error: {0}")]
    Dialog(#[from] mai_dialog::DialogError),
}

impl From<MumbleError> for mai_channels::ChannelError {
    fn from(e: MumbleError) -> Self {
        let message = e.to_string();
        match e {
            MumbleError::Connect(msg) => mai_channels::ChannelError::ConnectionFailed(msg),
            MumbleError::NotConnected => mai_channels::ChannelError::ConnectionFailed(message),
            MumbleError::Speech(_) => mai_channels::ChannelError::ServiceUnavailable(message),
            _ => mai_channels::ChannelError::Invariant(message),
        }
    }
}
