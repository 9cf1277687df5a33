//! Structured error handling for the TTS service
//!
//! A single error enum covers request validation, model lookup, text
//! processing and inference. The HTTP layer maps each variant to a status
//! code through [`TtsError::status_code`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    /// No model pair registered for the requested language and gender
    #[error("Requested model not found")]
    ModelNotFound { language: String, gender: String },

    /// Transliteration into the requested language is not supported
    #[error("Transliteration not available for language '{language}'")]
    TransliterationUnavailable { language: String },

    /// The text to synthesize was empty
    #[error("No text")]
    EmptyText,

    /// Request validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Model loading errors
    #[error("Model loading error in {component}: {message}")]
    ModelLoad {
        message: String,
        component: String,
        path: Option<PathBuf>,
    },

    /// Inference errors
    #[error("Inference error in {stage}: {message}")]
    Inference {
        stage: InferenceStage,
        message: String,
    },

    /// Audio processing errors
    #[error("Audio processing error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// Transliteration backend errors
    #[error("Transliteration error ({backend}): {message}")]
    Transliteration { backend: String, message: String },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// Shorthand for a validation error on a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// HTTP status code the error is surfaced with
    pub fn status_code(&self) -> u16 {
        match self {
            TtsError::ModelNotFound { .. } | TtsError::TransliterationUnavailable { .. } => 404,
            TtsError::EmptyText => 400,
            TtsError::Validation { .. } => 422,
            _ => 500,
        }
    }

    /// Whether the error was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Inference pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    Tokenization,
    MelGeneration,
    Vocoding,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::Tokenization => write!(f, "tokenization"),
            InferenceStage::MelGeneration => write!(f, "mel generation"),
            InferenceStage::Vocoding => write!(f, "vocoding"),
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Encoding,
    Saving,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Encoding => write!(f, "WAV encoding"),
            AudioOperation::Saving => write!(f, "saving"),
        }
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for TtsError {
    fn from(err: anyhow::Error) -> Self {
        TtsError::Internal {
            message: format!("{:#}", err),
            location: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

/// Convert from candle_core::Error
impl From<candle_core::Error> for TtsError {
    fn from(err: candle_core::Error) -> Self {
        TtsError::Internal {
            message: format!("Tensor operation failed: {}", err),
            location: None,
        }
    }
}

/// Convert from hound::Error
impl From<hound::Error> for TtsError {
    fn from(err: hound::Error) -> Self {
        TtsError::Audio {
            message: err.to_string(),
            operation: AudioOperation::Encoding,
        }
    }
}
