use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Memory(#[from] mai_memory::MemoryError),

    #[error("config key {key} has value {value:?} which cannot be parsed as {expected}")]
    InvalidValue { key: String, value: String, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
