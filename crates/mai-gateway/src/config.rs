//! Static process configuration (spec §5 "Scheduling model"): everything
//! needed before the database is even open. Per-user/runtime knobs (persona,
//! models, SMTP/IMAP credentials) live in `mai-config`/`mai-memory` instead.

use std::net::{IpAddr, SocketAddr};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin_http: AdminHttpConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub mumble: MumbleConfig,
    #[serde(default)]
    pub sip: SipConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "mai.sqlite3".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminHttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for AdminHttpConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1".to_string(), port: 8787 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub ollama_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { ollama_url: "http://127.0.0.1:11434".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub whisper_url: String,
    pub tts_url: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { whisper_url: "http://127.0.0.1:9000".to_string(), tts_url: "http://127.0.0.1:5002".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MumbleConfig {
    pub enabled: bool,
    pub server_addr: String,
    pub username: String,
}

impl Default for MumbleConfig {
    fn default() -> Self {
        Self { enabled: false, server_addr: "127.0.0.1:64738".to_string(), username: "mai".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipConfig {
    pub enabled: bool,
    pub local_sip_addr: SocketAddr,
    pub local_media_ip: IpAddr,
    pub rtp_port_min: u16,
    pub rtp_port_max: u16,
    pub contact_uri: String,
    pub greeting: String,
    pub manual_vad_threshold_rms: Option<f64>,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            local_sip_addr: "0.0.0.0:5060".parse().unwrap(),
            local_media_ip: "0.0.0.0".parse().unwrap(),
            rtp_port_min: 10_000,
            rtp_port_max: 10_200,
            contact_uri: "sip:mai@0.0.0.0:5060".to_string(),
            greeting: "Hello, how can I help you today?".to_string(),
            manual_vad_threshold_rms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub bot_email: String,
    pub poll_interval_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self { enabled: false, bot_email: String::new(), poll_interval_secs: 300 }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            admin_http: AdminHttpConfig::default(),
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            mumble: MumbleConfig::default(),
            sip: SipConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file with `MAI_*` env var overrides (e.g.
    /// `MAI_ADMIN_HTTP_PORT=9000`). Checks, in order: explicit path argument,
    /// `MAI_CONFIG` env var, `./mai.toml`.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("MAI_CONFIG").ok())
            .unwrap_or_else(|| "mai.toml".to_string());

        let config: GatewayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MAI_").split("_"))
            .extract()?;
        Ok(config)
    }
}
