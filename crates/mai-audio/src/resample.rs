//! Sample-rate conversion via `rubato`, used for the Mumble path (48kHz <->
//! whatever the external resampler would otherwise do) and the SIP path
//! (8kHz <-> 16kHz for Whisper, spec §4.12).

use rubato::{SincFixedIn, SincInterpolationParameters, SincInterpolationType, VecResampler, WindowFunction};

use crate::error::{AudioError, Result};

/// Resample mono 16-bit PCM from `from_hz` to `to_hz`. A no-op copy when the
/// rates already match.
pub fn resample_mono(samples: &[i16], from_hz: u32, to_hz: u32) -> Result<Vec<i16>> {
    if from_hz == to_hz {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_hz as f64 / from_hz as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f64>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let input: Vec<f64> = samples.iter().map(|&s| s as f64 / i16::MAX as f64).collect();
    let output = resampler
        .process(&[input], None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    Ok(output[0]
        .iter()
        .map(|&v| (v * i16::MAX as f64).clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_a_no_op() {
        let samples = vec![1i16, 2, 3, 4];
        assert_eq!(resample_mono(&samples, 16000, 16000).unwrap(), samples);
    }

    #[test]
    fn upsampling_produces_more_samples() {
        let samples = vec![100i16; 800];
        let out = resample_mono(&samples, 8000, 16000).unwrap();
        assert!(out.len() > samples.len());
    }

    #[test]
    fn downsampling_produces_fewer_samples() {
        let samples = vec![100i16; 4800];
        let out = resample_mono(&samples, 48000, 8000).unwrap();
        assert!(out.len() < samples.len());
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(resample_mono(&[], 8000, 16000).unwrap().is_empty());
    }
}
