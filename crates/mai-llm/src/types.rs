use std::time::Duration;

/// Options shared by every C2 call (spec §4.2). `timeout` defaults to 300s
/// for all three operations per spec.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: None,
            stop_sequences: Vec::new(),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedOptions {
    pub model: String,
    pub timeout: Duration,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self { model: String::new(), timeout: Duration::from_secs(300) }
    }
}

#[derive(Debug, Clone)]
pub struct VisionOptions {
    pub model: String,
    pub timeout: Duration,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self { model: String::new(), timeout: Duration::from_secs(300) }
    }
}
