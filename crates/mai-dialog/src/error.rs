use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("memory store error: {0}")]
    Memory(#[from] mai_memory::MemoryError),

    #[error("context builder error: {0}")]
    Context(#[from] mai_context::ContextError),

    #[error("llm call failed: {0}")]
    Llm(#[from] mai_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, DialogError>;
