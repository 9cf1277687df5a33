//! Audio output
//!
//! Provides:
//! - Concatenation of per-sentence samples
//! - In-memory WAV encoding (16-bit PCM, mono) and base64 payloads
//! - WAV file saving

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Cursor;
use std::path::Path;

use crate::core::error::{AudioOperation, Result, TtsError};

/// Audio output handler for encoding and saving synthesized speech
pub struct AudioOutput;

impl AudioOutput {
    fn spec(sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Join sentence chunks into one stream
    pub fn concatenate(chunks: &[Vec<i16>]) -> Vec<i16> {
        let total = chunks.iter().map(Vec::len).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in chunks {
            samples.extend_from_slice(chunk);
        }
        samples
    }

    /// Encode samples as a complete WAV file in memory
    pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
        if sample_rate == 0 {
            return Err(TtsError::Audio {
                message: "Sample rate must be positive".to_string(),
                operation: AudioOperation::Encoding,
            });
        }

        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, Self::spec(sample_rate))?;
            for &sample in samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    /// Encode samples as a base64 WAV payload
    pub fn encode_base64(samples: &[i16], sample_rate: u32) -> Result<String> {
        let wav = Self::encode_wav(samples, sample_rate)?;
        Ok(STANDARD.encode(wav))
    }

    /// Save int16 samples to a WAV file
    pub fn save_int16<P: AsRef<Path>>(samples: &[i16], sample_rate: u32, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = hound::WavWriter::create(path, Self::spec(sample_rate)).map_err(|e| TtsError::Audio {
            message: format!("Failed to create WAV file {:?}: {}", path, e),
            operation: AudioOperation::Saving,
        })?;

        for &sample in samples {
            writer.write_sample(sample)?;
        }

        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenate() {
        let joined = AudioOutput::concatenate(&[vec![1, 2], vec![], vec![3]]);
        assert_eq!(joined, vec![1, 2, 3]);
        assert!(AudioOutput::concatenate(&[]).is_empty());
    }

    #[test]
    fn test_encode_wav_decodes_back() {
        let samples: Vec<i16> = (0..100).map(|i| (i * 100 - 5000) as i16).collect();
        let wav = AudioOutput::encode_wav(&samples, 22050).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(wav.len(), 44 + samples.len() * 2);

        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_encode_empty_audio() {
        let wav = AudioOutput::encode_wav(&[], 16000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(matches!(
            AudioOutput::encode_wav(&[0], 0),
            Err(TtsError::Audio { .. })
        ));
    }

    #[test]
    fn test_save_int16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        AudioOutput::save_int16(&[1, 2, 3, 4], 22050, &path).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 4);
    }
}
