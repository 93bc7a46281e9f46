use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("memory store error: {0}")]
    Memory(#[from] mai_memory::MemoryError),

    #[error("llm call failed: {0}")]
    Llm(#[from] mai_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, ContextError>;
