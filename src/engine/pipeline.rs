//! Request-to-audio pipeline
//!
//! For every input paragraph:
//! 1. Look up the model pair for the language and gender
//! 2. Normalize punctuation and split into sentences
//! 3. Per sentence: expand numbers, transliterate foreign words, synthesize
//! 4. Concatenate the sentences and encode one base64 WAV file
//!
//! Model inference is blocking work and runs on the blocking thread pool.

use std::sync::Arc;
use tracing::{debug, info};

use super::registry::ModelRegistry;
use super::traits::ModelPair;
use crate::audio::AudioOutput;
use crate::core::error::{Result, TtsError};
use crate::server::types::{
    AudioConfig, AudioFile, SourceTarget, TranslitResponse, TransliterationRequest, TtsRequest, TtsResponse,
    DEFAULT_SAMPLING_RATE,
};
use crate::text::language::{canonical_code, transliterates_before_synthesis};
use crate::text::{normalize_nums, normalize_text, pre_process_text, split_sentences};
use crate::transliteration::SentenceTransliterator;

/// Synthesized audio of one input
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// TTS and transliteration pipeline shared by all requests
#[derive(Clone)]
pub struct TtsPipeline {
    registry: Arc<ModelRegistry>,
    transliterator: SentenceTransliterator,
}

impl TtsPipeline {
    pub fn new(registry: Arc<ModelRegistry>, transliterator: SentenceTransliterator) -> Self {
        Self {
            registry,
            transliterator,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn transliterator(&self) -> &SentenceTransliterator {
        &self.transliterator
    }

    /// Synthesize every input of a TTS request
    ///
    /// The reported sampling rate is the one of the last synthesized input.
    pub async fn infer_tts_request(&self, request: &TtsRequest) -> Result<TtsResponse> {
        request.validate()?;
        let language = canonical_code(&request.config.language.source_language);
        let gender = request.config.gender.trim();

        let mut audio = Vec::with_capacity(request.input.len());
        let mut sampling_rate = DEFAULT_SAMPLING_RATE;
        for sentence in &request.input {
            debug!("Infer for gender {} and lang {}: {:?}", gender, language, sentence.source);
            let (file, rate) = self.infer_tts(&language, gender, &sentence.source).await?;
            audio.push(file);
            sampling_rate = rate;
        }

        Ok(TtsResponse {
            audio,
            config: AudioConfig::new(language, sampling_rate),
        })
    }

    /// Synthesize one input and encode it as a base64 WAV file
    pub async fn infer_tts(&self, language: &str, gender: &str, text: &str) -> Result<(AudioFile, u32)> {
        let audio = self.synthesize(language, gender, text).await?;
        let audio_content = AudioOutput::encode_base64(&audio.samples, audio.sample_rate)?;
        debug!("Encoded {} samples at {} Hz", audio.samples.len(), audio.sample_rate);

        Ok((AudioFile { audio_content }, audio.sample_rate))
    }

    /// Synthesize one input paragraph to raw samples
    pub async fn synthesize(&self, language: &str, gender: &str, text: &str) -> Result<SynthesizedAudio> {
        let language = canonical_code(language);
        let models = self.registry.get(&language, gender)?;
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let text = normalize_text(text, &language);
        self.run_tts_paragraph(&text, &language, &models).await
    }

    async fn run_tts_paragraph(&self, text: &str, language: &str, models: &ModelPair) -> Result<SynthesizedAudio> {
        let sentences = split_sentences(text, language);
        if sentences.is_empty() {
            return Err(TtsError::EmptyText);
        }
        info!("Synthesizing {} sentence(s) in {}", sentences.len(), language);

        let mut chunks = Vec::with_capacity(sentences.len());
        let mut sample_rate = models.vocoder.sample_rate();
        for sentence in &sentences {
            let (samples, rate) = self.run_tts(&pre_process_text(sentence, language), language, models).await?;
            chunks.push(samples);
            sample_rate = rate;
        }

        Ok(SynthesizedAudio {
            samples: AudioOutput::concatenate(&chunks),
            sample_rate,
        })
    }

    /// Synthesize a single sentence
    pub async fn run_tts(&self, text: &str, language: &str, models: &ModelPair) -> Result<(Vec<i16>, u32)> {
        let mut text = normalize_nums(text, language);
        if transliterates_before_synthesis(language) && self.transliterator.supports(language) {
            text = self.transliterator.transliterate_sentence(&text, language).await?;
        }
        debug!("Model input: {:?}", text);

        let input = format!(" {}", text);
        let models = models.clone();
        tokio::task::spawn_blocking(move || models.synthesize(&input))
            .await
            .map_err(|e| TtsError::Internal {
                message: format!("Synthesis task failed: {}", e),
                location: Some("TtsPipeline::run_tts".to_string()),
            })?
    }

    /// Transliterate every input of a transliteration request
    pub async fn infer_transliterate_request(&self, request: &TransliterationRequest) -> Result<TranslitResponse> {
        request.validate()?;
        let target = canonical_code(&request.config.language.target_language);
        if !self.transliterator.supports(&target) {
            return Err(TtsError::TransliterationUnavailable { language: target });
        }

        let mut output = Vec::with_capacity(request.input.len());
        for sentence in &request.input {
            let transliterated = self.transliterator.transliterate_sentence(&sentence.source, &target).await?;
            debug!("Transliterated {:?} -> {:?}", sentence.source, transliterated);
            output.push(SourceTarget {
                source: sentence.source.clone(),
                target: transliterated,
            });
        }

        Ok(TranslitResponse::success(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::{MelGenerator, Vocoder};
    use candle_core::{DType, Device, Tensor};
    use std::sync::Mutex;

    /// Records its inputs and emits one frame per character
    struct RecordingMel {
        inputs: Mutex<Vec<String>>,
    }

    impl MelGenerator for RecordingMel {
        fn name(&self) -> &str {
            "recording"
        }

        fn generate_mel(&self, text: &str) -> Result<Tensor> {
            self.inputs.lock().unwrap().push(text.to_string());
            Ok(Tensor::zeros((1, 2, text.chars().count()), DType::F32, &Device::Cpu)?)
        }
    }

    struct FrameVocoder {
        rate: u32,
    }

    impl Vocoder for FrameVocoder {
        fn name(&self) -> &str {
            "frames"
        }

        fn generate_wav(&self, mel: &Tensor) -> Result<(Vec<i16>, u32)> {
            Ok((vec![1; mel.dim(2)?], self.rate))
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }
    }

    fn pipeline(language: &str) -> (TtsPipeline, Arc<RecordingMel>) {
        let mel = Arc::new(RecordingMel {
            inputs: Mutex::new(Vec::new()),
        });
        let registry = ModelRegistry::new();
        registry
            .insert(language, "female", ModelPair::new(mel.clone(), Arc::new(FrameVocoder { rate: 16000 })))
            .unwrap();
        (TtsPipeline::new(Arc::new(registry), SentenceTransliterator::new(None)), mel)
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let (pipeline, _) = pipeline("hi");
        let err = pipeline.infer_tts("ta", "female", "வணக்கம்").await.unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let (pipeline, _) = pipeline("hi");
        let err = pipeline.infer_tts("hi", "female", "   ").await.unwrap_err();
        assert!(matches!(err, TtsError::EmptyText));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_sentences_are_synthesized_and_joined() {
        let (pipeline, mel) = pipeline("hi");
        let audio = pipeline.synthesize("hi", "female", "राम घर गया। सीता आई।").await.unwrap();

        let inputs = mel.inputs.lock().unwrap().clone();
        assert_eq!(inputs, vec![" राम घर गया.".to_string(), " सीता आई.".to_string()]);
        let expected: usize = inputs.iter().map(|s| s.chars().count()).sum();
        assert_eq!(audio.samples.len(), expected);
        assert_eq!(audio.sample_rate, 16000);
    }

    #[tokio::test]
    async fn test_hindi_decimal_stays_in_one_sentence() {
        let (pipeline, mel) = pipeline("hi");
        pipeline.synthesize("hi", "female", "कीमत 2.5 रुपये है।").await.unwrap();

        let inputs = mel.inputs.lock().unwrap().clone();
        assert_eq!(inputs, vec![" कीमत दो दशमलव पाँच रुपये है.".to_string()]);
    }

    #[tokio::test]
    async fn test_english_numbers_and_terminator() {
        let (pipeline, mel) = pipeline("en");
        pipeline.synthesize("en", "female", "I have 2 cats").await.unwrap();

        let inputs = mel.inputs.lock().unwrap().clone();
        assert_eq!(inputs, vec![" I have two cats. ".to_string()]);
    }

    #[tokio::test]
    async fn test_request_reports_last_sample_rate() {
        let (pipeline, _) = pipeline("hi");
        let request = TtsRequest::new(&["नमस्ते", "धन्यवाद"], "HI", "female");
        let response = pipeline.infer_tts_request(&request).await.unwrap();

        assert_eq!(response.audio.len(), 2);
        assert_eq!(response.config.sampling_rate, 16000);
        assert_eq!(response.config.language.source_language, "hi");
        assert!(!response.audio[0].audio_content.is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_uses_default_rate() {
        let (pipeline, _) = pipeline("hi");
        let request = TtsRequest::new(&[], "hi", "female");
        let response = pipeline.infer_tts_request(&request).await.unwrap();
        assert!(response.audio.is_empty());
        assert_eq!(response.config.sampling_rate, DEFAULT_SAMPLING_RATE);
    }

    #[tokio::test]
    async fn test_transliterate_request() {
        let (pipeline, _) = pipeline("hi");
        let request = TransliterationRequest::new(&["नमस्ते"], "hi", "gu");
        let response = pipeline.infer_transliterate_request(&request).await.unwrap();
        assert_eq!(response.output[0].source, "नमस्ते");
        assert_eq!(response.output[0].target, "નમસ્તે");
        assert_eq!(response.status.status_code, 200);
    }

    #[tokio::test]
    async fn test_transliterate_unsupported_target() {
        let (pipeline, _) = pipeline("hi");
        let request = TransliterationRequest::new(&["hello"], "en", "fr");
        let err = pipeline.infer_transliterate_request(&request).await.unwrap_err();
        assert!(matches!(err, TtsError::TransliterationUnavailable { .. }));
        assert_eq!(err.status_code(), 404);
    }
}
