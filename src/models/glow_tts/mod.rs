//! Glow-TTS mel spectrogram generator
//!
//! Inference path of the flow-based Glow-TTS model:
//! - Text encoder predicts a Gaussian prior and a log duration per symbol
//! - Durations are rounded up and the prior is expanded to frame rate
//! - A latent is sampled from the prior and decoded by the reversed flows
//!
//! A model directory holds a `config.json` and either `model.safetensors`
//! or the newest `G_<step>.pth` training checkpoint.

mod attention;
mod config;
mod encoder;
mod flows;

pub use config::{GlowDataConfig, GlowModelConfig, GlowTtsConfig};

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use std::path::Path;

use crate::models::weights::{latest_checkpoint, load_checkpoint};
use crate::text::SymbolTokenizer;
use encoder::{EncoderOutput, TextEncoder};
use flows::{FlowDecoder, FlowParams};

/// Sampling temperature of the prior
pub const DEFAULT_NOISE_SCALE: f64 = 0.667;

/// Duration multiplier; larger is slower speech
pub const DEFAULT_LENGTH_SCALE: f64 = 1.0;

/// Glow-TTS model ready for inference
pub struct GlowTts {
    config: GlowTtsConfig,
    tokenizer: SymbolTokenizer,
    encoder: TextEncoder,
    decoder: FlowDecoder,
    device: Device,
    noise_scale: f64,
    length_scale: f64,
}

impl GlowTts {
    /// Load a model directory with `config.json` and a checkpoint
    pub fn load<P: AsRef<Path>>(dir: P, device: &Device) -> Result<Self> {
        let dir = dir.as_ref();
        let config = GlowTtsConfig::load(dir.join("config.json"))?;
        let checkpoint = latest_checkpoint(dir, "G_")?;
        Self::load_checkpoint(config, checkpoint, device)
    }

    /// Load weights for an already parsed config
    pub fn load_checkpoint<P: AsRef<Path>>(config: GlowTtsConfig, checkpoint: P, device: &Device) -> Result<Self> {
        let weights = load_checkpoint(checkpoint.as_ref(), Some("model"), device)?;
        let tokenizer = config.tokenizer()?;

        let encoder = TextEncoder::from_weights(&weights, "encoder", &config)
            .context("Failed to build Glow-TTS text encoder")?;
        if encoder.vocab_size() != tokenizer.vocab_size() {
            anyhow::bail!(
                "Embedding table has {} symbols but the config defines {}",
                encoder.vocab_size(),
                tokenizer.vocab_size()
            );
        }
        let decoder = FlowDecoder::from_weights(&weights, "decoder", flow_params(&config))
            .context("Failed to build Glow-TTS flow decoder")?;

        tracing::info!(
            "Glow-TTS loaded: {} symbols, {} mel channels",
            tokenizer.vocab_size(),
            config.data.n_mel_channels
        );

        Ok(Self {
            config,
            tokenizer,
            encoder,
            decoder,
            device: device.clone(),
            noise_scale: DEFAULT_NOISE_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
        })
    }

    /// Create with random weights
    pub fn new_random(config: GlowTtsConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let tokenizer = config.tokenizer()?;
        let encoder = TextEncoder::new_random(&config, tokenizer.vocab_size(), device)?;
        let decoder = FlowDecoder::new_random(flow_params(&config), device)?;

        Ok(Self {
            config,
            tokenizer,
            encoder,
            decoder,
            device: device.clone(),
            noise_scale: DEFAULT_NOISE_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
        })
    }

    /// Override the sampling scales
    pub fn with_scales(mut self, noise_scale: f64, length_scale: f64) -> Self {
        self.noise_scale = noise_scale;
        self.length_scale = length_scale;
        self
    }

    pub fn config(&self) -> &GlowTtsConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &SymbolTokenizer {
        &self.tokenizer
    }

    /// Generate a mel spectrogram `[1, n_mels, frames]` for a sentence
    pub fn synthesize(&self, text: &str) -> Result<Tensor> {
        let ids = self.tokenizer.encode(text)?;
        self.generate(&ids)
    }

    /// Generate a mel spectrogram from symbol ids
    pub fn generate(&self, ids: &[u32]) -> Result<Tensor> {
        let ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let out = self.encoder.forward(&ids)?;

        let (y_m, y_logs) = self.expand_to_frames(&out)?;
        let noise = y_m.randn_like(0.0, 1.0)?;
        let z = (&y_m + (y_logs.exp()? * noise)?.affine(self.noise_scale, 0.0)?)?;

        self.decoder.reverse(&z)
    }

    /// Repeat each token's prior for its predicted number of frames
    fn expand_to_frames(&self, out: &EncoderOutput) -> Result<(Tensor, Tensor)> {
        let logw: Vec<f32> = out.logw.flatten_all()?.to_vec1()?;
        let durations: Vec<usize> = logw
            .iter()
            .map(|&l| ((l as f64).exp() * self.length_scale).ceil().max(0.0) as usize)
            .collect();

        let indices = frame_indices(&durations, self.config.model.n_sqz);
        tracing::debug!("Expanded {} tokens to {} frames", durations.len(), indices.len());

        let indices = Tensor::new(indices.as_slice(), &self.device)?;
        let y_m = out.x_m.index_select(&indices, 2)?;
        let y_logs = out.x_logs.index_select(&indices, 2)?;
        Ok((y_m, y_logs))
    }
}

/// Token index of every output frame
///
/// The frame count is the total duration (at least one) rounded down to a
/// multiple of `n_sqz`, and never below `n_sqz` so the decoder gets a frame.
fn frame_indices(durations: &[usize], n_sqz: usize) -> Vec<u32> {
    let total = durations.iter().sum::<usize>().max(1);
    let frames = ((total / n_sqz) * n_sqz).max(n_sqz);

    let mut indices: Vec<u32> = durations
        .iter()
        .enumerate()
        .flat_map(|(token, &d)| std::iter::repeat(token as u32).take(d))
        .take(frames)
        .collect();

    let last = indices.last().copied().unwrap_or(0);
    indices.resize(frames, last);
    indices
}

fn flow_params(config: &GlowTtsConfig) -> FlowParams {
    let m = &config.model;
    FlowParams {
        in_channels: config.data.n_mel_channels,
        hidden_channels: config.decoder_channels(),
        kernel_size: m.kernel_size_dec,
        dilation_rate: m.dilation_rate,
        n_blocks: m.n_blocks_dec,
        n_layers: m.n_block_layers,
        n_split: m.n_split,
        n_sqz: m.n_sqz,
        sigmoid_scale: m.sigmoid_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GlowTtsConfig {
        GlowTtsConfig::from_json(
            r#"{
            "data": {"text_cleaners": ["basic_cleaners"], "add_blank": true,
                     "punc": " .,", "chars": "abcdefghijklmnopqrstuvwxyz", "n_mel_channels": 8},
            "model": {"hidden_channels": 16, "filter_channels": 32, "filter_channels_dp": 16,
                      "n_blocks_dec": 2, "n_layers_enc": 2, "n_block_layers": 2, "n_split": 4, "n_sqz": 2}
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_frame_indices() {
        assert_eq!(frame_indices(&[2, 1, 3], 2), vec![0, 0, 1, 2, 2, 2]);
        // odd total is trimmed to a multiple of n_sqz
        assert_eq!(frame_indices(&[1, 2], 2), vec![0, 1]);
        // zero durations still produce n_sqz frames
        assert_eq!(frame_indices(&[0, 0], 2), vec![0, 0]);
        assert_eq!(frame_indices(&[1], 2), vec![0, 0]);
    }

    #[test]
    fn test_random_model_generates_mel() {
        let device = Device::Cpu;
        let model = GlowTts::new_random(small_config(), &device).unwrap();
        let mel = model.synthesize(" hello world.").unwrap();
        let (batch, channels, frames) = mel.dims3().unwrap();
        assert_eq!(batch, 1);
        assert_eq!(channels, 8);
        assert!(frames >= 2);
        assert_eq!(frames % 2, 0);
    }

    #[test]
    fn test_length_scale_stretches_output() {
        let device = Device::Cpu;
        let model = GlowTts::new_random(small_config(), &device).unwrap();
        let ids = model.tokenizer().encode(" abc").unwrap();
        let normal = model.generate(&ids).unwrap().dim(2).unwrap();
        let model = model.with_scales(0.0, 4.0);
        let slow = model.generate(&ids).unwrap().dim(2).unwrap();
        assert!(slow >= normal);
    }

    #[test]
    fn test_unknown_text_fails() {
        let device = Device::Cpu;
        let model = GlowTts::new_random(small_config(), &device).unwrap();
        assert!(model.synthesize("१२३").is_err());
    }
}
