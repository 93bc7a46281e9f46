//! Hard-coded fallbacks used when a key is absent from the KV table
//! (spec §4.1). Keep names in sync with [`crate::keys`].

pub const OLLAMA_URL: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "llama3.1";
pub const OLLAMA_VISION_MODEL: &str = "llava";
pub const MEMORY_EXTRACTION_MODEL: &str = "llama3.1";
pub const EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const BOT_PERSONA: &str =
    "You are a helpful, friendly voice assistant. Keep responses concise and natural.";
pub const WHISPER_LANGUAGE: &str = "en";
pub const TTS_ENGINE: &str = "piper";
pub const PIPER_VOICE: &str = "en_US-lessac-medium";
pub const SILERO_VOICE: &str = "en_0";
pub const SHORT_TERM_MEMORY_LIMIT: u32 = 10;
pub const LONG_TERM_MEMORY_LIMIT: u32 = 5;
pub const SEMANTIC_SIMILARITY_THRESHOLD: f64 = 0.75;
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;
pub const SESSION_REACTIVATION_MINUTES: i64 = 60;
pub const DISPLAY_TIMEZONE: &str = mai_core::time::DEFAULT_DISPLAY_TIMEZONE;
