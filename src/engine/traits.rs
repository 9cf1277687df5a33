//! Model traits used by the synthesis pipeline
//!
//! The pipeline only sees a mel generator and a vocoder behind these
//! traits, so a registry entry can pair any implementations.

use candle_core::Tensor;
use std::sync::Arc;

use crate::core::error::{InferenceStage, Result, TtsError};
use crate::models::{GlowTts, HiFiGan};

/// Turns a sentence into a mel spectrogram
pub trait MelGenerator: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// Generate a mel spectrogram `[1, n_mels, frames]`
    fn generate_mel(&self, text: &str) -> Result<Tensor>;
}

/// Turns a mel spectrogram into PCM samples
pub trait Vocoder: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// Generate 16-bit samples and the rate they were produced at
    fn generate_wav(&self, mel: &Tensor) -> Result<(Vec<i16>, u32)>;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;
}

/// A mel generator and vocoder registered for one language and gender
#[derive(Clone)]
pub struct ModelPair {
    pub mel: Arc<dyn MelGenerator>,
    pub vocoder: Arc<dyn Vocoder>,
}

impl ModelPair {
    pub fn new(mel: Arc<dyn MelGenerator>, vocoder: Arc<dyn Vocoder>) -> Self {
        Self { mel, vocoder }
    }

    /// Synthesize one sentence
    pub fn synthesize(&self, text: &str) -> Result<(Vec<i16>, u32)> {
        let mel = self.mel.generate_mel(text)?;
        self.vocoder.generate_wav(&mel)
    }
}

impl std::fmt::Debug for ModelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPair")
            .field("mel", &self.mel.name())
            .field("vocoder", &self.vocoder.name())
            .finish()
    }
}

fn inference_error(stage: InferenceStage, e: anyhow::Error) -> TtsError {
    TtsError::Inference {
        stage,
        message: format!("{:#}", e),
    }
}

impl MelGenerator for GlowTts {
    fn name(&self) -> &str {
        "glow-tts"
    }

    fn generate_mel(&self, text: &str) -> Result<Tensor> {
        let ids = self
            .tokenizer()
            .encode(text)
            .map_err(|e| inference_error(InferenceStage::Tokenization, e))?;
        self.generate(&ids)
            .map_err(|e| inference_error(InferenceStage::MelGeneration, e))
    }
}

impl Vocoder for HiFiGan {
    fn name(&self) -> &str {
        "hifi-gan"
    }

    fn generate_wav(&self, mel: &Tensor) -> Result<(Vec<i16>, u32)> {
        let samples = self
            .synthesize(mel)
            .map_err(|e| inference_error(InferenceStage::Vocoding, e))?;
        Ok((samples, HiFiGan::sample_rate(self)))
    }

    fn sample_rate(&self) -> u32 {
        HiFiGan::sample_rate(self)
    }
}
