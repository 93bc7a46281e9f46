use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("llm call failed: {0}")]
    Llm(#[from] mai_llm::LlmError),

    #[error("memory store error: {0}")]
    Memory(#[from] mai_memory::MemoryError),

    #[error("llm returned unparseable output: {0}")]
    Unparseable(String),
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
