//! Anti-feedback half-duplex mute (spec §4.12 "Anti-feedback muting"):
//! the call is muted the instant TTS playback starts so the bot never hears
//! its own voice echoed back through the caller's handset, and stays muted
//! through a settle window after playback ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Extra silence held after playback before re-arming the microphone. The
/// call-opening greeting gets a longer window since it plays right as the
/// line picks up and echo cancellation hasn't settled yet.
pub const POST_PLAYBACK_SETTLE: Duration = Duration::from_millis(500);
pub const POST_WELCOME_SETTLE: Duration = Duration::from_millis(1000);

pub fn settle_duration(is_welcome: bool) -> Duration {
    if is_welcome {
        POST_WELCOME_SETTLE
    } else {
        POST_PLAYBACK_SETTLE
    }
}

/// Tracks whether incoming RTP audio should be discarded. Mutation of the
/// VAD buffer/threshold estimator must be skipped entirely while muted —
/// callers check `is_muted()` before ever handing a frame to `AdaptiveVad`.
#[derive(Default)]
pub struct AntiFeedbackMute {
    muted: AtomicBool,
}

impl AntiFeedbackMute {
    pub fn new() -> Self {
        Self { muted: AtomicBool::new(false) }
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unmuted() {
        assert!(!AntiFeedbackMute::new().is_muted());
    }

    #[test]
    fn mute_and_unmute_round_trip() {
        let guard = AntiFeedbackMute::new();
        guard.mute();
        assert!(guard.is_muted());
        guard.unmute();
        assert!(!guard.is_muted());
    }

    #[test]
    fn welcome_settle_is_longer_than_regular_playback() {
        assert!(settle_duration(true) > settle_duration(false));
    }
}
