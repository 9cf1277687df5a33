//! Server Types
//!
//! Request and response bodies of the HTTP API. Field names follow the
//! camelCase wire format.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TtsError};

/// Default sample rate reported when no audio was generated
pub const DEFAULT_SAMPLING_RATE: u32 = crate::DEFAULT_SAMPLE_RATE;

/// One input sentence or paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub source: String,
}

impl Sentence {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

/// Language selection of a TTS request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub source_language: String,
}

/// Language selection of a transliteration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslitLanguage {
    pub source_language: String,
    pub target_language: String,
}

/// TTS request configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    pub language: Language,
    /// Speaker gender, e.g. `female` or `male`
    pub gender: String,
}

/// Transliteration request configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslitConfig {
    pub language: TranslitLanguage,
}

/// Body of `POST /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsRequest {
    pub input: Vec<Sentence>,
    pub config: TtsConfig,
}

/// Body of `POST /get_transliteration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransliterationRequest {
    pub input: Vec<Sentence>,
    pub config: TranslitConfig,
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TtsError::validation(field, format!("{} cannot be empty", field)));
    }
    Ok(())
}

impl TtsRequest {
    pub fn new(sentences: &[&str], language: &str, gender: &str) -> Self {
        Self {
            input: sentences.iter().map(|s| Sentence::new(*s)).collect(),
            config: TtsConfig {
                language: Language {
                    source_language: language.to_string(),
                },
                gender: gender.to_string(),
            },
        }
    }

    /// Reject blank required fields
    pub fn validate(&self) -> Result<()> {
        require_non_empty("sourceLanguage", &self.config.language.source_language)?;
        require_non_empty("gender", &self.config.gender)
    }
}

impl TransliterationRequest {
    pub fn new(sentences: &[&str], source_language: &str, target_language: &str) -> Self {
        Self {
            input: sentences.iter().map(|s| Sentence::new(*s)).collect(),
            config: TranslitConfig {
                language: TranslitLanguage {
                    source_language: source_language.to_string(),
                    target_language: target_language.to_string(),
                },
            },
        }
    }

    /// Reject blank required fields
    pub fn validate(&self) -> Result<()> {
        require_non_empty("sourceLanguage", &self.config.language.source_language)?;
        require_non_empty("targetLanguage", &self.config.language.target_language)
    }
}

/// One synthesized input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFile {
    /// Base64 encoded WAV file
    pub audio_content: String,
}

/// Format of the returned audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub language: Language,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,
}

fn default_audio_format() -> String {
    "wav".to_string()
}

fn default_encoding() -> String {
    "base64".to_string()
}

fn default_sampling_rate() -> u32 {
    DEFAULT_SAMPLING_RATE
}

impl AudioConfig {
    pub fn new(source_language: impl Into<String>, sampling_rate: u32) -> Self {
        Self {
            language: Language {
                source_language: source_language.into(),
            },
            audio_format: default_audio_format(),
            encoding: default_encoding(),
            sampling_rate,
        }
    }
}

/// Successful TTS response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsResponse {
    pub audio: Vec<AudioFile>,
    pub config: AudioConfig,
}

/// Source text paired with its transliteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTarget {
    pub source: String,
    pub target: String,
}

/// Status block of a transliteration response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub status_code: u16,
    pub message: String,
}

/// Successful transliteration response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslitResponse {
    pub output: Vec<SourceTarget>,
    pub status: Status,
}

impl TranslitResponse {
    pub fn success(output: Vec<SourceTarget>) -> Self {
        Self {
            output,
            status: Status {
                status_code: 200,
                message: "success".to_string(),
            },
        }
    }
}

/// Error body shared by both endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub status: String,
    pub status_text: String,
}

impl FailureResponse {
    pub fn new(status_text: impl Into<String>) -> Self {
        Self {
            status: "ERROR".to_string(),
            status_text: status_text.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Uptime in seconds
    pub uptime: u64,
    /// Registered model keys, e.g. `hi_female`
    pub models: Vec<String>,
    pub transliteration_backend: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_request_wire_format() {
        let body = r#"{
            "input": [{"source": "नमस्ते"}],
            "config": {"language": {"sourceLanguage": "hi"}, "gender": "female"}
        }"#;
        let request: TtsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request, TtsRequest::new(&["नमस्ते"], "hi", "female"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_missing_field_is_rejected_by_serde() {
        let body = r#"{"input": [{"source": "x"}], "config": {"language": {}, "gender": "male"}}"#;
        assert!(serde_json::from_str::<TtsRequest>(body).is_err());
    }

    #[test]
    fn test_blank_fields_fail_validation() {
        let err = TtsRequest::new(&["x"], "", "female").validate().unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("sourceLanguage cannot be empty"));

        assert!(TtsRequest::new(&["x"], "hi", " ").validate().is_err());
        assert!(TransliterationRequest::new(&["x"], "en", "").validate().is_err());
        assert!(TransliterationRequest::new(&["x"], "", "hi").validate().is_err());
        assert!(TransliterationRequest::new(&["x"], "en", "hi").validate().is_ok());
    }

    #[test]
    fn test_response_wire_format() {
        let response = TtsResponse {
            audio: vec![AudioFile {
                audio_content: "UklGRg==".to_string(),
            }],
            config: AudioConfig::new("ta", 22050),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["audio"][0]["audioContent"], "UklGRg==");
        assert_eq!(json["config"]["language"]["sourceLanguage"], "ta");
        assert_eq!(json["config"]["audioFormat"], "wav");
        assert_eq!(json["config"]["encoding"], "base64");
        assert_eq!(json["config"]["samplingRate"], 22050);
    }

    #[test]
    fn test_translit_and_failure_wire_format() {
        let json = serde_json::to_value(TranslitResponse::success(vec![SourceTarget {
            source: "a".to_string(),
            target: "b".to_string(),
        }]))
        .unwrap();
        assert_eq!(json["status"]["statusCode"], 200);
        assert_eq!(json["status"]["message"], "success");
        assert_eq!(json["output"][0]["target"], "b");

        let json = serde_json::to_value(FailureResponse::new("No text")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ERROR", "status_text": "No text"}));
    }
}
