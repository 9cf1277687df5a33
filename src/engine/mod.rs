//! Synthesis engine
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TtsPipeline                           │
//! │  normalize → split sentences → numbers → transliterate      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      ModelRegistry                          │
//! │            "{language}_{gender}" → ModelPair                │
//! ├─────────────────────────────────────────────────────────────┤
//! │        MelGenerator (Glow-TTS)  │  Vocoder (HiFi-GAN)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod pipeline;
pub mod registry;
pub mod traits;

pub use pipeline::{SynthesizedAudio, TtsPipeline};
pub use registry::{discover, load_pair, model_key, select_device, LoadOptions, ModelRegistry, ModelSpec};
pub use traits::{MelGenerator, ModelPair, Vocoder};
