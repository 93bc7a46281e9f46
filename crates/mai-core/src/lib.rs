pub mod error;
pub mod time;
pub mod types;

pub use error::ServiceError;
pub use types::{MemoryCategory, Modality, Role, SessionState, TopicState, TtsEngine, UserName};
