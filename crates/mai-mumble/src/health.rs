//! Health probing (spec §4.11: "periodic probes to Whisper, TTS, DB, and
//! Mumble; auto-reconnect with a single-flight guard to prevent reconnect
//! storms"). The reconnect itself is `mai_channels::ReconnectGuard`; this
//! module only decides when to call it.

use mai_memory::MemoryStore;
use mai_speech::SpeechClient;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub whisper_ok: bool,
    pub tts_ok: bool,
    pub db_ok: bool,
    pub mumble_ok: bool,
}

impl HealthReport {
    pub fn all_ok(&self) -> bool {
        self.whisper_ok && self.tts_ok && self.db_ok && self.mumble_ok
    }
}

pub async fn probe(speech: &SpeechClient, store: &MemoryStore, mumble_connected: bool) -> HealthReport {
    let whisper_ok = speech.whisper_health().await.is_ok();
    if !whisper_ok {
        warn!("whisper health probe failed");
    }
    let tts_ok = speech.tts_health().await.is_ok();
    if !tts_ok {
        warn!("tts health probe failed");
    }
    let db_ok = store.health_check().is_ok();
    if !db_ok {
        warn!("db health probe failed");
    }
    HealthReport { whisper_ok, tts_ok, db_ok, mumble_ok: mumble_connected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_ok_requires_every_flag() {
        let report = HealthReport { whisper_ok: true, tts_ok: true, db_ok: true, mumble_ok: false };
        assert!(!report.all_ok());
        let report = HealthReport { whisper_ok: true, tts_ok: true, db_ok: true, mumble_ok: true };
        assert!(report.all_ok());
    }
}
