//! Server Configuration
//!
//! YAML configuration of the HTTP service. Every field has a default, so an
//! empty file (or no file at all) yields a working CPU setup that discovers
//! models under `models/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{Result, TtsError};
use crate::engine::{LoadOptions, ModelSpec};
use crate::models::glow_tts::{DEFAULT_LENGTH_SCALE, DEFAULT_NOISE_SCALE};
use crate::transliteration::RemoteConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model configuration
    #[serde(default)]
    pub models: ModelsConfig,

    /// Transliteration backend configuration
    #[serde(default)]
    pub transliteration: TransliterationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Compute device: `cpu`, `cuda` or `metal`
    #[serde(default = "default_device")]
    pub device: String,

    /// Directory scanned for `<language>/<gender>/{glow,hifi}` models
    #[serde(default = "default_models_dir")]
    pub models_dir: Option<PathBuf>,

    /// Explicit model entries, loaded before discovery
    #[serde(default)]
    pub entries: Vec<ModelSpec>,

    /// Prior sampling temperature
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,

    /// Duration multiplier
    #[serde(default = "default_length_scale")]
    pub length_scale: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            models_dir: default_models_dir(),
            entries: Vec::new(),
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
        }
    }
}

impl ModelsConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            noise_scale: self.noise_scale,
            length_scale: self.length_scale,
        }
    }
}

/// Romanized transliteration service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransliterationConfig {
    /// Base URL of the service; romanized words are kept as written when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retry attempts
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for TransliterationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl TransliterationConfig {
    /// Remote backend settings, if a base URL is configured
    pub fn remote(&self) -> Option<RemoteConfig> {
        self.base_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| RemoteConfig {
                base_url: url.trim().to_string(),
                timeout_secs: self.timeout,
                retries: self.retries,
            })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable access log
    #[serde(default = "default_true")]
    pub access_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            access_log: true,
        }
    }
}

/// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_models_dir() -> Option<PathBuf> {
    Some(PathBuf::from("models"))
}

fn default_noise_scale() -> f64 {
    DEFAULT_NOISE_SCALE
}

fn default_length_scale() -> f64 {
    DEFAULT_LENGTH_SCALE
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TtsError::Config {
            message: format!("Failed to read config: {}", e),
            path: Some(path.to_path_buf()),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            TtsError::Config { message, .. } => TtsError::Config {
                message,
                path: Some(path.to_path_buf()),
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| TtsError::Config {
                message: format!("Invalid config: {}", e),
                path: None,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| TtsError::Config {
            message: format!("Failed to serialize config: {}", e),
            path: None,
        })?;
        std::fs::write(path.as_ref(), content).map_err(|e| TtsError::Io {
            message: e.to_string(),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| TtsError::Config { message, path: None };

        if !(self.models.noise_scale >= 0.0) {
            return Err(invalid(format!("noise_scale must be >= 0, got {}", self.models.noise_scale)));
        }
        if !(self.models.length_scale > 0.0) {
            return Err(invalid(format!("length_scale must be > 0, got {}", self.models.length_scale)));
        }
        for entry in &self.models.entries {
            if entry.language.trim().is_empty() || entry.gender.trim().is_empty() {
                return Err(invalid("Model entries need a language and a gender".to_string()));
            }
        }
        Ok(())
    }

    /// Socket address string, e.g. `0.0.0.0:5000`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            models: ModelsConfig::default(),
            transliteration: TransliterationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = ServerConfig::from_yaml("").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.models.device, "cpu");
        assert_eq!(config.models.models_dir, Some(PathBuf::from("models")));
        assert_eq!(config.models.load_options(), LoadOptions::default());
        assert!(config.transliteration.remote().is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
port: 8000
models:
  device: cuda
  noise_scale: 0.5
  entries:
    - language: hi
      gender: female
      glow: /models/hi/glow
      hifi: /models/hi/hifi
transliteration:
  base_url: http://localhost:4321
  retries: 0
"#;
        let config = ServerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.models.noise_scale, 0.5);
        assert_eq!(config.models.length_scale, DEFAULT_LENGTH_SCALE);
        assert_eq!(config.models.entries[0].glow, PathBuf::from("/models/hi/glow"));

        let remote = config.transliteration.remote().unwrap();
        assert_eq!(remote.base_url, "http://localhost:4321");
        assert_eq!(remote.timeout_secs, 10);
        assert_eq!(remote.retries, 0);
    }

    #[test]
    fn test_invalid_scales_rejected() {
        assert!(ServerConfig::from_yaml("models:\n  length_scale: 0\n").is_err());
        assert!(ServerConfig::from_yaml("models:\n  noise_scale: -1\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        let mut config = ServerConfig::default();
        config.port = 9000;
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.port, 9000);
        assert_eq!(loaded.models.models_dir, config.models.models_dir);
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load("/nonexistent/server.yaml").unwrap_err();
        assert!(matches!(err, TtsError::Config { path: Some(_), .. }));
    }
}
