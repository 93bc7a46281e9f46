//! Known config keys (spec §4.1). The set is explicitly non-exhaustive —
//! [`crate::ConfigStore::get`] works for arbitrary keys, these constants just
//! give call sites a typo-proof handle on the documented ones.

pub const OLLAMA_URL: &str = "ollama_url";
pub const OLLAMA_MODEL: &str = "ollama_model";
pub const OLLAMA_VISION_MODEL: &str = "ollama_vision_model";
pub const MEMORY_EXTRACTION_MODEL: &str = "memory_extraction_model";
pub const EMBEDDING_MODEL: &str = "embedding_model";
pub const BOT_PERSONA: &str = "bot_persona";
pub const WHISPER_LANGUAGE: &str = "whisper_language";
pub const TTS_ENGINE: &str = "tts_engine";
pub const PIPER_VOICE: &str = "piper_voice";
pub const SILERO_VOICE: &str = "silero_voice";
pub const SHORT_TERM_MEMORY_LIMIT: &str = "short_term_memory_limit";
pub const LONG_TERM_MEMORY_LIMIT: &str = "long_term_memory_limit";
pub const SEMANTIC_SIMILARITY_THRESHOLD: &str = "semantic_similarity_threshold";
pub const SESSION_TIMEOUT_MINUTES: &str = "session_timeout_minutes";
pub const SESSION_REACTIVATION_MINUTES: &str = "session_reactivation_minutes";
pub const DISPLAY_TIMEZONE: &str = "display_timezone";
