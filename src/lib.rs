//! # Indic TTS - Text-to-Speech and Transliteration Service
//!
//! Speech synthesis for Indian languages with Glow-TTS and HiFi-GAN running
//! on Candle, plus transliteration between Indic scripts.
//!
//! ## Features
//!
//! - **Per-language text processing**: punctuation normalization, sentence
//!   splitting and number expansion for English and eleven Indic languages
//! - **Glow-TTS + HiFi-GAN**: pretrained checkpoints (`.safetensors` or `.pth`)
//! - **Transliteration**: Brahmic script conversion and a romanized backend
//! - **HTTP API**: base64 WAV responses over axum
//! - **GPU Acceleration**: CUDA and Metal support via Candle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use indic_tts::engine::{ModelRegistry, TtsPipeline};
//! use indic_tts::transliteration::SentenceTransliterator;
//!
//! let registry = ModelRegistry::load(&[], Some("models".as_ref()), &Device::Cpu, Default::default())?;
//! let pipeline = TtsPipeline::new(Arc::new(registry), SentenceTransliterator::new(None));
//!
//! let audio = pipeline.synthesize("hi", "female", "नमस्ते, आप कैसे हैं?").await?;
//! AudioOutput::save_int16(&audio.samples, audio.sample_rate, "out.wav")?;
//! ```
//!
//! ## Serving
//!
//! ```rust,ignore
//! use indic_tts::server::{ServerConfig, TtsServer};
//!
//! let config = ServerConfig::load("server.yaml")?;
//! TtsServer::new(config).await?.run().await?;
//! ```

pub mod audio;
pub mod core;
pub mod engine;
pub mod models;
pub mod server;
pub mod text;
pub mod transliteration;

// Re-exports for convenience
pub use audio::AudioOutput;
pub use crate::core::error::{Result, TtsError};
pub use engine::{MelGenerator, ModelPair, ModelRegistry, TtsPipeline, Vocoder};
pub use models::{GlowTts, GlowTtsConfig, HiFiGan, HiFiGanConfig};
pub use server::{ServerConfig, TtsServer};
pub use transliteration::{SentenceTransliterator, Transliterator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sample rate of the pretrained vocoders
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
