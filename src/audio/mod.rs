//! Audio processing modules
//!
//! - Concatenation of per-sentence audio
//! - WAV encoding (16-bit PCM, mono) in memory or to disk
//! - Base64 payloads for the HTTP API

mod output;

pub use output::AudioOutput;
