//! Adaptive voice activity detection (spec §4.12 "Voice activity
//! detection"): baseline RMS calibrated over the first 3s after the welcome
//! plays, threshold `clamp(40, median + 1.5*(p75-median), 300)`; a manual
//! override in config disables adaptation entirely.

use std::time::{Duration, Instant};

use mai_audio::rms::{percentile, rms};

pub const CALIBRATION_WINDOW: Duration = Duration::from_secs(3);
pub const SILENCE_TIMEOUT: Duration = Duration::from_millis(1500);
const MIN_THRESHOLD: f64 = 40.0;
const MAX_THRESHOLD: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    Voice,
    Silence,
    /// Recording should be taken now — the caller owns draining it.
    UtteranceEnd,
}

pub struct AdaptiveVad {
    manual_threshold: Option<f64>,
    threshold: f64,
    calibrating: bool,
    calibration_samples: Vec<f64>,
    calibration_started: Option<Instant>,
    recording: Vec<i16>,
    last_voice_at: Option<Instant>,
}

impl AdaptiveVad {
    pub fn new(manual_threshold: Option<f64>) -> Self {
        Self {
            manual_threshold,
            threshold: manual_threshold.unwrap_or(MIN_THRESHOLD),
            calibrating: manual_threshold.is_none(),
            calibration_samples: Vec::new(),
            calibration_started: None,
            recording: Vec::new(),
            last_voice_at: None,
        }
    }

    /// Start (or restart) baseline calibration against real audio
    /// (spec §4.12 anti-feedback: "reset baseline calibration so the
    /// threshold re-learns against the real caller"). No-op under manual
    /// override.
    pub fn reset_calibration(&mut self, now: Instant) {
        if self.manual_threshold.is_some() {
            return;
        }
        self.calibrating = true;
        self.calibration_samples.clear();
        self.calibration_started = Some(now);
    }

    pub fn effective_threshold(&self) -> f64 {
        self.manual_threshold.unwrap_or(self.threshold)
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    /// Feed one incoming frame. Must only be called while the call is
    /// unmuted (spec anti-feedback invariant) — muted frames are dropped by
    /// the caller before reaching this.
    pub fn process_frame(&mut self, frame: &[i16], now: Instant) -> VadEvent {
        let level = rms(frame);

        if self.calibrating {
            self.calibration_samples.push(level);
            if let Some(started) = self.calibration_started {
                if now.duration_since(started) >= CALIBRATION_WINDOW {
                    self.finish_calibration();
                }
            }
        }

        if level >= self.effective_threshold() {
            self.recording.extend_from_slice(frame);
            self.last_voice_at = Some(now);
            return VadEvent::Voice;
        }

        if let Some(last_voice) = self.last_voice_at {
            if !self.recording.is_empty() && now.duration_since(last_voice) >= SILENCE_TIMEOUT {
                return VadEvent::UtteranceEnd;
            }
        }
        VadEvent::Silence
    }

    fn finish_calibration(&mut self) {
        let median = percentile(&self.calibration_samples, 0.5);
        let p75 = percentile(&self.calibration_samples, 0.75);
        let computed = median + 1.5 * (p75 - median);
        self.threshold = computed.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        self.calibrating = false;
    }

    pub fn take_recording(&mut self) -> Vec<i16> {
        self.last_voice_at = None;
        std::mem::take(&mut self.recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_override_skips_calibration() {
        let vad = AdaptiveVad::new(Some(100.0));
        assert!(!vad.is_calibrating());
        assert_eq!(vad.effective_threshold(), 100.0);
    }

    #[test]
    fn calibration_computes_threshold_from_baseline() {
        let mut vad = AdaptiveVad::new(None);
        let t0 = Instant::now();
        vad.reset_calibration(t0);
        // Quiet room noise around RMS 10, a couple of louder blips.
        let quiet = vec![10i16; 160];
        let loud = vec![30i16; 160];
        for i in 0..20 {
            let frame = if i % 5 == 0 { &loud } else { &quiet };
            vad.process_frame(frame, t0 + Duration::from_millis(i * 100));
        }
        vad.process_frame(&quiet, t0 + CALIBRATION_WINDOW + Duration::from_millis(1));
        assert!(!vad.is_calibrating());
        assert!(vad.effective_threshold() >= MIN_THRESHOLD);
    }

    #[test]
    fn frame_above_threshold_is_recorded() {
        let mut vad = AdaptiveVad::new(Some(50.0));
        let t0 = Instant::now();
        let event = vad.process_frame(&[1000i16; 160], t0);
        assert_eq!(event, VadEvent::Voice);
    }

    #[test]
    fn silence_past_timeout_ends_the_utterance() {
        let mut vad = AdaptiveVad::new(Some(50.0));
        let t0 = Instant::now();
        vad.process_frame(&[1000i16; 160], t0);
        let event = vad.process_frame(&[0i16; 160], t0 + SILENCE_TIMEOUT + Duration::from_millis(1));
        assert_eq!(event, VadEvent::UtteranceEnd);
    }

    #[test]
    fn silence_before_any_voice_is_just_silence() {
        let mut vad = AdaptiveVad::new(Some(50.0));
        let event = vad.process_frame(&[0i16; 160], Instant::now());
        assert_eq!(event, VadEvent::Silence);
    }

    #[test]
    fn take_recording_drains_and_resets() {
        let mut vad = AdaptiveVad::new(Some(50.0));
        vad.process_frame(&[1000i16; 160], Instant::now());
        let recorded = vad.take_recording();
        assert_eq!(recorded.len(), 160);
        assert!(vad.take_recording().is_empty());
    }
}
