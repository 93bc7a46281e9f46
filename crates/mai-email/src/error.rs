use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("imap error: {0}")]
    Imap(String),

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("dialog error: {0}")]
    Dialog(#[from] mai_dialog::DialogError),

    #[error("memory store error: {0}")]
    Memory(#[from] mai_memory::MemoryError),

    #[error("llm error: {0}")]
    Llm(#[from] mai_llm::LlmError),

    #[error("attachment extraction failed: {0}")]
    Attachment(String),
}

impl From<EmailError> for mai_channels::ChannelError {
    fn from(e: EmailError) -> Self {
        let message = e.to_string();
        match e {
            EmailError::Imap(_) | EmailError::Smtp(_) => mai_channels::ChannelError::ConnectionFailed(message),
            EmailError::Llm(_) => mai_channels::ChannelError::ServiceUnavailable(message),
            _ => mai_channels::ChannelError::Invariant(message),
        }
    }
}
