//! RMS-based level measurement, the primitive under the SIP channel's
//! adaptive VAD (spec §4.12) and the hallucination-bait guard (spec §4.12
//! "reject if RMS < 50").

/// Root-mean-square amplitude of a block of 16-bit PCM samples.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Percentile (0.0–1.0) of a sorted-on-the-fly copy of `values`. Used by the
/// adaptive VAD's baseline calibration (spec §4.12: `median + 1.5*(p75 -
/// median)`).
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Scale a block of samples so its peak amplitude reaches `target_fraction`
/// of `i16::MAX` (spec §4.12: "normalize to 90% peak" before Whisper).
pub fn normalize_peak(samples: &mut [i16], target_fraction: f64) {
    let peak = samples.iter().map(|&s| s.unsigned_abs()).max().unwrap_or(0);
    if peak == 0 {
        return;
    }
    let target = (i16::MAX as f64) * target_fraction;
    let gain = target / peak as f64;
    for s in samples.iter_mut() {
        let scaled = (*s as f64) * gain;
        *s = scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_zero_rms() {
        assert_eq!(rms(&[0; 160]), 0.0);
    }

    #[test]
    fn constant_amplitude_rms_matches_amplitude() {
        assert_eq!(rms(&[100; 10]), 100.0);
    }

    #[test]
    fn empty_block_has_zero_rms() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn percentile_of_sorted_values() {
        let values = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 1.0), 50.0);
    }

    #[test]
    fn normalize_peak_scales_to_target() {
        let mut samples = vec![100i16, -200, 50];
        normalize_peak(&mut samples, 0.9);
        let peak = samples.iter().map(|&s| s.unsigned_abs()).max().unwrap();
        let target = (i16::MAX as f64 * 0.9) as i32;
        assert!((peak as i32 - target).abs() <= 1);
    }

    #[test]
    fn normalize_peak_noop_on_silence() {
        let mut samples = vec![0i16; 10];
        normalize_peak(&mut samples, 0.9);
        assert!(samples.iter().all(|&s| s == 0));
    }
}
