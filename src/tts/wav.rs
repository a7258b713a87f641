use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::SynthesisError;

/// Encode mono f32 samples in [-1.0, 1.0] as a 16-bit PCM WAV file.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, SynthesisError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec)?;

        for &sample in samples {
            // NaN clamps to NaN and then casts to 0
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(scaled)?;
        }

        writer.finalize()?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn test_samples_to_wav_empty() {
        let wav = samples_to_wav(&[], 44100).unwrap();
        // Header only, still a valid file
        assert!(wav.starts_with(b"RIFF"));
        let reader = WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_samples_to_wav_decodes_back() {
        let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, 44100).unwrap();
        assert!(wav.starts_with(b"RIFF"));

        let mut reader = WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 16383, -16383, 32767, -32767]);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let wav = samples_to_wav(&[4.0, -4.0, f32::NAN], 44100).unwrap();
        let mut reader = WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![32767, -32767, 0]);
    }
}
