//! Glow-TTS training configuration
//!
//! Parsed from the `config.json` shipped next to each checkpoint. Only the
//! `data` and `model` sections are read; training settings are ignored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::text::SymbolTokenizer;

/// Top-level Glow-TTS config file
#[derive(Debug, Clone, Deserialize)]
pub struct GlowTtsConfig {
    pub data: GlowDataConfig,
    pub model: GlowModelConfig,
}

/// Text and audio settings
#[derive(Debug, Clone, Deserialize)]
pub struct GlowDataConfig {
    #[serde(default = "default_cleaners")]
    pub text_cleaners: Vec<String>,
    #[serde(default = "default_add_blank")]
    pub add_blank: bool,
    #[serde(default)]
    pub punc: String,
    #[serde(default)]
    pub chars: String,
    #[serde(default = "default_n_mel_channels")]
    pub n_mel_channels: usize,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,
}

/// Network hyperparameters
#[derive(Debug, Clone, Deserialize)]
pub struct GlowModelConfig {
    #[serde(default = "default_hidden_channels")]
    pub hidden_channels: usize,
    #[serde(default = "default_filter_channels")]
    pub filter_channels: usize,
    #[serde(default = "default_filter_channels_dp")]
    pub filter_channels_dp: usize,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_n_blocks_dec")]
    pub n_blocks_dec: usize,
    #[serde(default = "default_n_layers_enc")]
    pub n_layers_enc: usize,
    #[serde(default = "default_n_heads")]
    pub n_heads: usize,
    #[serde(default = "default_dilation_rate")]
    pub dilation_rate: usize,
    #[serde(default = "default_kernel_size_dec")]
    pub kernel_size_dec: usize,
    #[serde(default = "default_n_block_layers")]
    pub n_block_layers: usize,
    #[serde(default = "default_n_sqz")]
    pub n_sqz: usize,
    #[serde(default = "default_n_split")]
    pub n_split: usize,
    #[serde(default = "default_true")]
    pub prenet: bool,
    #[serde(default = "default_true")]
    pub mean_only: bool,
    #[serde(default)]
    pub sigmoid_scale: bool,
    #[serde(default = "default_window_size")]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub hidden_channels_enc: Option<usize>,
    #[serde(default)]
    pub hidden_channels_dec: Option<usize>,
}

fn default_cleaners() -> Vec<String> {
    vec!["basic_indic_cleaners".to_string()]
}

fn default_add_blank() -> bool {
    true
}

fn default_n_mel_channels() -> usize {
    80
}

fn default_sampling_rate() -> u32 {
    22050
}

fn default_hidden_channels() -> usize {
    192
}

fn default_filter_channels() -> usize {
    768
}

fn default_filter_channels_dp() -> usize {
    256
}

fn default_kernel_size() -> usize {
    3
}

fn default_n_blocks_dec() -> usize {
    12
}

fn default_n_layers_enc() -> usize {
    6
}

fn default_n_heads() -> usize {
    2
}

fn default_dilation_rate() -> usize {
    1
}

fn default_kernel_size_dec() -> usize {
    5
}

fn default_n_block_layers() -> usize {
    4
}

fn default_n_sqz() -> usize {
    2
}

fn default_n_split() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_window_size() -> Option<usize> {
    Some(4)
}

impl GlowTtsConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Glow-TTS config {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Invalid Glow-TTS config {:?}", path))
    }

    /// Parse from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the structural constraints of the flow decoder
    pub fn validate(&self) -> Result<()> {
        let m = &self.model;
        if m.n_sqz == 0 || m.n_split < 2 || m.n_split % 2 != 0 {
            anyhow::bail!("n_sqz must be positive and n_split even (got {}, {})", m.n_sqz, m.n_split);
        }
        if (self.data.n_mel_channels * m.n_sqz) % m.n_split != 0 {
            anyhow::bail!(
                "n_mel_channels * n_sqz ({}) is not divisible by n_split ({})",
                self.data.n_mel_channels * m.n_sqz,
                m.n_split
            );
        }
        if self.encoder_channels() % m.n_heads != 0 {
            anyhow::bail!(
                "encoder channels ({}) not divisible by n_heads ({})",
                self.encoder_channels(),
                m.n_heads
            );
        }
        if self.data.chars.is_empty() {
            anyhow::bail!("Glow-TTS config has an empty character set");
        }
        Ok(())
    }

    /// Hidden width of the text encoder
    pub fn encoder_channels(&self) -> usize {
        self.model.hidden_channels_enc.unwrap_or(self.model.hidden_channels)
    }

    /// Hidden width of the flow decoder
    pub fn decoder_channels(&self) -> usize {
        self.model.hidden_channels_dec.unwrap_or(self.model.hidden_channels)
    }

    /// Build the symbol tokenizer described by the data section
    pub fn tokenizer(&self) -> Result<SymbolTokenizer> {
        SymbolTokenizer::new(
            &self.data.punc,
            &self.data.chars,
            &self.data.text_cleaners,
            self.data.add_blank,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "train": {"batch_size": 32},
        "data": {"text_cleaners": ["basic_indic_cleaners"], "add_blank": true,
                 "punc": "!,.? ", "chars": "अआइ", "n_mel_channels": 80, "sampling_rate": 22050},
        "model": {"hidden_channels": 192, "n_sqz": 2, "mean_only": true, "window_size": 4}
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = GlowTtsConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.model.filter_channels, 768);
        assert_eq!(config.model.n_blocks_dec, 12);
        assert_eq!(config.model.window_size, Some(4));
        assert_eq!(config.encoder_channels(), 192);
        assert_eq!(config.data.sampling_rate, 22050);
    }

    #[test]
    fn test_tokenizer_from_config() {
        let config = GlowTtsConfig::from_json(CONFIG).unwrap();
        let tokenizer = config.tokenizer().unwrap();
        // "_" + 5 punctuation + 3 characters, plus the blank
        assert_eq!(tokenizer.vocab_size(), 10);
    }

    #[test]
    fn test_invalid_split_rejected() {
        let bad = CONFIG.replace("\"n_sqz\": 2", "\"n_sqz\": 2, \"n_split\": 3");
        assert!(GlowTtsConfig::from_json(&bad).is_err());
    }
}
