//! Vocoder module for mel-to-waveform conversion
//!
//! Implements the HiFi-GAN generator (V1/V2/V3 residual block layouts).

mod hifigan;

pub use hifigan::{to_pcm16, HiFiGan, HiFiGanConfig};
