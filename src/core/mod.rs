//! Core abstractions shared across the crate
//!
//! - `error`: Structured error handling mapped onto HTTP status codes

pub mod error;

pub use error::{AudioOperation, InferenceStage, Result, TtsError};
