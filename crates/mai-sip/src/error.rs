use thiserror::Error;

#[derive(Debug, Error)]
pub enum SipError {
    #[error("malformed sip message: {0}")]
    MalformedMessage(String),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("malformed sdp: {0}")]
    MalformedSdp(String),

    #[error("no rtp ports available in configured range")]
    NoRtpPortAvailable,

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("speech service error: {0}")]
    Speech(#[from] mai_speech::SpeechError),

    #[error("audio pipeline error: {0}")]
    Audio(#[from] mai_audio::AudioError),

    #[error("dialog error: {0}")]
    Dialog(#[from] mai_dialog::DialogError),
}

impl From<SipError> for mai_channels::ChannelError {
    fn from(e: SipError) -> Self {
        let message = e.to_string();
        match e {
            SipError::Socket(_) => mai_channels::ChannelError::ConnectionFailed(message),
            SipError::Speech(_) => mai_channels::ChannelError::ServiceUnavailable(message),
            _ => mai_channels::ChannelError::Invariant(message),
        }
    }
}
