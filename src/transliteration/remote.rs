//! HTTP client for a romanized-to-native transliteration service
//!
//! The service answers `GET {base_url}/tl/{lang}/{word}` with a JSON body of
//! ranked candidates, `{"result": ["...", ...]}`. The first candidate wins.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::Transliterator;
use crate::core::error::{Result, TtsError};
use crate::text::language::is_transliteration_target;

const BACKEND_NAME: &str = "remote";

/// Remote transliteration backend settings
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Service base URL, e.g. `http://localhost:4321`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Additional attempts after a failed request
    pub retries: u32,
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    result: Vec<String>,
}

/// Transliterator backed by a remote HTTP service
pub struct RemoteTransliterator {
    base_url: Url,
    client: Client,
    retries: u32,
}

impl RemoteTransliterator {
    /// Create a new client for the service at `config.base_url`
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| TtsError::Config {
            message: format!("Invalid transliteration base URL '{}': {}", config.base_url, e),
            path: None,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TtsError::Config {
                message: format!("Transliteration base URL cannot be a base: {}", config.base_url),
                path: None,
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| TtsError::Transliteration {
                backend: BACKEND_NAME.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url,
            client,
            retries: config.retries,
        })
    }

    /// URL of the candidates endpoint for a word
    fn endpoint(&self, word: &str, language: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["tl", language, word]);
        }
        url
    }

    async fn fetch(&self, url: &Url) -> std::result::Result<Option<String>, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("Failed to send request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("Transliteration service error ({}): {}", status, error_text));
        }

        let body: CandidatesResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response body: {}", e))?;

        Ok(body.result.into_iter().next())
    }
}

#[async_trait]
impl Transliterator for RemoteTransliterator {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn supports(&self, language: &str) -> bool {
        is_transliteration_target(language)
    }

    async fn transliterate_word(&self, word: &str, language: &str) -> Result<String> {
        let url = self.endpoint(word, language);
        let mut last_error = String::new();

        for attempt in 0..=self.retries {
            match self.fetch(&url).await {
                Ok(Some(candidate)) => {
                    debug!("Transliterated '{}' -> '{}' ({})", word, candidate, language);
                    return Ok(candidate);
                }
                // no candidates; the word is kept as written
                Ok(None) => return Ok(word.to_string()),
                Err(e) => {
                    warn!("Transliteration attempt {} for '{}' failed: {}", attempt + 1, word, e);
                    last_error = e;
                }
            }
        }

        Err(TtsError::Transliteration {
            backend: BACKEND_NAME.to_string(),
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: base_url.to_string(),
            timeout_secs: 1,
            retries: 0,
        }
    }

    #[test]
    fn test_endpoint_encodes_word() {
        let remote = RemoteTransliterator::new(&config("http://localhost:4321/")).unwrap();
        let url = remote.endpoint("namaste duniya", "hi");
        assert_eq!(url.as_str(), "http://localhost:4321/tl/hi/namaste%20duniya");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let remote = RemoteTransliterator::new(&config("http://example.com/api")).unwrap();
        let url = remote.endpoint("ghar", "mr");
        assert_eq!(url.as_str(), "http://example.com/api/tl/mr/ghar");
    }

    #[test]
    fn test_endpoint_from_server_config() {
        let yaml = "transliteration:\n  base_url: http://localhost:8000\n  timeout: 10\n  retries: 2\n";
        let server = crate::server::ServerConfig::from_yaml(yaml).unwrap();
        let remote = RemoteTransliterator::new(&server.transliteration.remote().unwrap()).unwrap();
        let url = remote.endpoint("ghar", "hi");
        assert_eq!(url.as_str(), "http://localhost:8000/tl/hi/ghar");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RemoteTransliterator::new(&config("not a url")).is_err());
        assert!(RemoteTransliterator::new(&config("mailto:someone@example.com")).is_err());
    }

    #[test]
    fn test_candidates_parsing() {
        let body: CandidatesResponse = serde_json::from_str(r#"{"result": ["नमस्ते", "नमस्ती"]}"#).unwrap();
        assert_eq!(body.result[0], "नमस्ते");
        let empty: CandidatesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.result.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_fails() {
        // port 9 (discard) is not expected to serve HTTP
        let remote = RemoteTransliterator::new(&config("http://127.0.0.1:9")).unwrap();
        let result = remote.transliterate_word("ghar", "hi").await;
        assert!(matches!(result, Err(TtsError::Transliteration { .. })));
    }
}
