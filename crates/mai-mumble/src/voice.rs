//! Per-speaker PCM accumulation and end-of-utterance detection (spec
//! §4.11: "per-speaker PCM accumulation; end-of-utterance declared when no
//! audio arrived for ≥1.5 s").

use std::time::{Duration, Instant};

use mai_audio::{resample, rms};

use crate::error::MumbleError;

pub const END_OF_UTTERANCE_SILENCE: Duration = Duration::from_millis(1500);

const CAPTURE_HZ: u32 = 48_000;
const WHISPER_HZ: u32 = 16_000;
const MIN_RMS: f64 = 50.0;
const PEAK_TARGET: f64 = 0.9;

/// Accumulates one speaker's incoming 48kHz mono PCM frames between
/// utterances. One instance lives per Mumble session id for as long as
/// that user is connected.
pub struct SpeakerAccumulator {
    pcm: Vec<i16>,
    last_audio_at: Option<Instant>,
}

impl SpeakerAccumulator {
    pub fn new() -> Self {
        Self { pcm: Vec::new(), last_audio_at: None }
    }

    pub fn push_frame(&mut self, frame: &[i16], at: Instant) {
        self.pcm.extend_from_slice(frame);
        self.last_audio_at = Some(at);
    }

    /// Whether enough silence has elapsed since the last frame to declare
    /// the accumulated buffer a complete utterance.
    pub fn is_utterance_complete(&self, now: Instant) -> bool {
        match self.last_audio_at {
            Some(last) if !self.pcm.is_empty() => now.saturating_duration_since(last) >= END_OF_UTTERANCE_SILENCE,
            _ => false,
        }
    }

    /// Drain and reset the buffer, returning the completed utterance.
    pub fn take(&mut self) -> Vec<i16> {
        self.last_audio_at = None;
        std::mem::take(&mut self.pcm)
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }
}

impl Default for SpeakerAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepare a finished utterance for Whisper (spec §4.11 "emit a WAV ...
/// resampled as needed" combined with §4.12's quality gate, applied here
/// too since both voice channels feed the same transcription service):
/// resample capture rate down to 16kHz, reject likely hallucination bait by
/// RMS, normalize to 90% peak. Returns `None` when the clip should be
/// dropped before ever reaching Whisper.
pub fn prepare_for_whisper(pcm_48k: &[i16]) -> Result<Option<Vec<i16>>, MumbleError> {
    let resampled = resample::resample_mono(pcm_48k, CAPTURE_HZ, WHISPER_HZ)?;
    if rms::rms(&resampled) < MIN_RMS {
        return Ok(None);
    }
    let mut normalized = resampled;
    rms::normalize_peak(&mut normalized, PEAK_TARGET);
    Ok(Some(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_never_completes() {
        let acc = SpeakerAccumulator::new();
        assert!(!acc.is_utterance_complete(Instant::now()));
    }

    #[test]
    fn short_gap_does_not_end_utterance() {
        let mut acc = SpeakerAccumulator::new();
        let t0 = Instant::now();
        acc.push_frame(&[100; 160], t0);
        assert!(!acc.is_utterance_complete(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn silence_past_threshold_ends_utterance() {
        let mut acc = SpeakerAccumulator::new();
        let t0 = Instant::now();
        acc.push_frame(&[100; 160], t0);
        assert!(acc.is_utterance_complete(t0 + Duration::from_millis(1600)));
    }

    #[test]
    fn take_drains_and_resets() {
        let mut acc = SpeakerAccumulator::new();
        let t0 = Instant::now();
        acc.push_frame(&[1, 2, 3], t0);
        let drained = acc.take();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(acc.is_empty());
        assert!(!acc.is_utterance_complete(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn quiet_clip_is_rejected() {
        let silence = vec![0i16; 48_000];
        assert_eq!(prepare_for_whisper(&silence).unwrap(), None);
    }

    #[test]
    fn loud_clip_passes_and_is_normalized() {
        let loud: Vec<i16> = (0..48_000).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
        let prepared = prepare_for_whisper(&loud).unwrap().expect("should pass the RMS gate");
        let peak = prepared.iter().map(|&s| s.unsigned_abs()).max().unwrap();
        let target = (i16::MAX as f64 * PEAK_TARGET) as i32;
        assert!((peak as i32 - target).abs() <= 2);
    }
}
