//! WAV framing via `hound` (spec §4.11: "emit a WAV, mono, resampled as
//! needed, before handing the clip to Whisper").

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::Result;

/// Encode mono 16-bit PCM samples as an in-memory WAV file.
pub fn write_mono_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a mono 16-bit WAV file back into PCM samples and its sample rate.
pub fn read_mono_wav(bytes: &[u8]) -> Result<(Vec<i16>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let sample_rate = reader.spec().sample_rate;
    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<i16>, _>>()?;
    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_samples_and_rate() {
        let samples = vec![0i16, 100, -100, 32000, -32000];
        let bytes = write_mono_wav(&samples, 48000).unwrap();
        let (decoded, rate) = read_mono_wav(&bytes).unwrap();
        assert_eq!(decoded, samples);
        assert_eq!(rate, 48000);
    }

    #[test]
    fn empty_clip_produces_valid_wav() {
        let bytes = write_mono_wav(&[], 16000).unwrap();
        let (decoded, rate) = read_mono_wav(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(rate, 16000);
    }

    #[test]
    fn wav_header_present() {
        let bytes = write_mono_wav(&[1, 2, 3], 8000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
