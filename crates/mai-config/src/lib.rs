//! Read-through cache over the KV table `mai-memory` owns (spec §4.1).
//!
//! `ConfigStore` never talks to SQLite directly — it's a typed, cached
//! facade over [`mai_memory::MemoryStore::get_config_value`] /
//! `set_config_value`, consistent with the memory store's exclusive
//! ownership of persistence (spec §3).

pub mod defaults;
pub mod error;
pub mod keys;

use std::sync::Arc;

use dashmap::DashMap;
use mai_core::TtsEngine;
use mai_memory::MemoryStore;
use tracing::warn;

pub use error::{ConfigError, Result};

pub struct ConfigStore {
    store: Arc<MemoryStore>,
    cache: DashMap<String, String>,
}

impl ConfigStore {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store, cache: DashMap::new() }
    }

    /// Warm the cache from every row currently in `bot_config`. Optional —
    /// [`Self::get`] lazily populates misses regardless.
    pub fn preload(&self) -> Result<()> {
        for (key, value) in self.store.all_config_values()? {
            self.cache.insert(key, value);
        }
        Ok(())
    }

    /// Raw string value: cache, then DB, then `default`. Populates the
    /// cache on a DB hit so repeat reads never touch SQLite.
    pub fn get(&self, key: &str, default: &str) -> String {
        if let Some(v) = self.cache.get(key) {
            return v.clone();
        }
        match self.store.get_config_value(key) {
            Ok(Some(v)) => {
                self.cache.insert(key.to_string(), v.clone());
                v
            }
            Ok(None) => default.to_string(),
            Err(e) => {
                warn!(key, error = %e, "config read failed, using default");
                default.to_string()
            }
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key, "").parse() {
            Ok(v) => v,
            Err(_) => default,
        }
    }

    /// Write through to the store and bust (refresh) the cache entry.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set_config_value(key, value)?;
        self.cache.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn invalidate(&self, key: &str) {
        self.cache.remove(key);
    }

    // ── typed convenience accessors for the documented keys ────────────────

    pub fn ollama_url(&self) -> String {
        self.get(keys::OLLAMA_URL, defaults::OLLAMA_URL)
    }

    pub fn ollama_model(&self) -> String {
        self.get(keys::OLLAMA_MODEL, defaults::OLLAMA_MODEL)
    }

    pub fn ollama_vision_model(&self) -> String {
        self.get(keys::OLLAMA_VISION_MODEL, defaults::OLLAMA_VISION_MODEL)
    }

    pub fn memory_extraction_model(&self) -> String {
        self.get(keys::MEMORY_EXTRACTION_MODEL, defaults::MEMORY_EXTRACTION_MODEL)
    }

    pub fn embedding_model(&self) -> String {
        self.get(keys::EMBEDDING_MODEL, defaults::EMBEDDING_MODEL)
    }

    pub fn bot_persona(&self) -> String {
        self.get(keys::BOT_PERSONA, defaults::BOT_PERSONA)
    }

    pub fn whisper_language(&self) -> String {
        self.get(keys::WHISPER_LANGUAGE, defaults::WHISPER_LANGUAGE)
    }

    pub fn tts_engine(&self) -> TtsEngine {
        self.get(keys::TTS_ENGINE, defaults::TTS_ENGINE)
            .parse()
            .unwrap_or(TtsEngine::Piper)
    }

    pub fn piper_voice(&self) -> String {
        self.get(keys::PIPER_VOICE, defaults::PIPER_VOICE)
    }

    pub fn silero_voice(&self) -> String {
        self.get(keys::SILERO_VOICE, defaults::SILERO_VOICE)
    }

    pub fn short_term_memory_limit(&self) -> u32 {
        self.get_parsed(keys::SHORT_TERM_MEMORY_LIMIT, defaults::SHORT_TERM_MEMORY_LIMIT)
    }

    pub fn long_term_memory_limit(&self) -> u32 {
        self.get_parsed(keys::LONG_TERM_MEMORY_LIMIT, defaults::LONG_TERM_MEMORY_LIMIT)
    }

    pub fn semantic_similarity_threshold(&self) -> f64 {
        self.get_parsed(keys::SEMANTIC_SIMILARITY_THRESHOLD, defaults::SEMANTIC_SIMILARITY_THRESHOLD)
    }

    pub fn session_timeout_minutes(&self) -> i64 {
        self.get_parsed(keys::SESSION_TIMEOUT_MINUTES, defaults::SESSION_TIMEOUT_MINUTES)
    }

    pub fn session_reactivation_minutes(&self) -> i64 {
        self.get_parsed(keys::SESSION_REACTIVATION_MINUTES, defaults::SESSION_REACTIVATION_MINUTES)
    }

    /// IANA name governing user-visible timestamp formatting (spec §3).
    pub fn display_timezone(&self) -> String {
        self.get(keys::DISPLAY_TIMEZONE, defaults::DISPLAY_TIMEZONE)
    }
}
