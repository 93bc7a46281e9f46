use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Embedding cache keyed by SHA-256 of `model || 0x00 || text` (spec §4.2:
/// "cached by SHA-256 of input for the life of the process"). Kept separate
/// from the free-form prompt cache the teacher pack doesn't have one of —
/// embeddings are deterministic for a given `(model, text)` pair, chat
/// completions are not, so only embeddings are cached.
pub struct EmbeddingCache {
    entries: DashMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        self.entries.get(&key(model, text)).map(|v| v.clone())
    }

    pub fn insert(&self, model: &str, text: &str, embedding: Vec<f32>) {
        self.entries.insert(key(model, text), embedding);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

fn key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = EmbeddingCache::new();
        assert!(cache.get("nomic-embed-text", "hello").is_none());
        cache.insert("nomic-embed-text", "hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("nomic-embed-text", "hello"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn different_model_is_a_different_key() {
        let cache = EmbeddingCache::new();
        cache.insert("model-a", "hello", vec![1.0]);
        assert!(cache.get("model-b", "hello").is_none());
    }
}
