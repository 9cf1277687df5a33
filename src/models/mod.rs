//! Neural network models for TTS
//!
//! This module contains the inference graphs of the pretrained models:
//! - Glow-TTS mel spectrogram generator
//! - HiFi-GAN vocoder
//! - Shared layers and checkpoint loading

pub mod glow_tts;
pub mod layers;
pub mod vocoder;
pub mod weights;

// Re-exports for convenient access
pub use glow_tts::{GlowTts, GlowTtsConfig};
pub use vocoder::{HiFiGan, HiFiGanConfig};
pub use weights::{latest_checkpoint, load_checkpoint, Weights};
