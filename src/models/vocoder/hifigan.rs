//! HiFi-GAN Vocoder
//!
//! Generator network converting mel spectrograms to waveforms.
//!
//! Architecture:
//! - Input mel spectrogram: (batch, mel_channels, time)
//! - Transposed-convolution upsampling, each followed by a multi-receptive
//!   field fusion of residual blocks
//! - Output waveform: (batch, 1, samples) in [-1, 1]

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use serde::Deserialize;
use std::path::Path;

use crate::models::layers::{leaky_relu, Conv1d, ConvTranspose1d};
use crate::models::weights::{latest_checkpoint, load_checkpoint, Weights};

/// Slope of the leaky ReLUs inside the network
const LRELU_SLOPE: f64 = 0.1;

/// Slope of the final activation before conv_post
const POST_LRELU_SLOPE: f64 = 0.01;

/// HiFi-GAN configuration as found in the training `config.json`
#[derive(Debug, Clone, Deserialize)]
pub struct HiFiGanConfig {
    /// Residual block flavour, "1" or "2"
    #[serde(default = "default_resblock")]
    pub resblock: String,
    pub upsample_rates: Vec<usize>,
    pub upsample_kernel_sizes: Vec<usize>,
    pub upsample_initial_channel: usize,
    pub resblock_kernel_sizes: Vec<usize>,
    pub resblock_dilation_sizes: Vec<Vec<usize>>,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,
    #[serde(default = "default_num_mels")]
    pub num_mels: usize,
}

fn default_resblock() -> String {
    "1".to_string()
}

fn default_sampling_rate() -> u32 {
    crate::DEFAULT_SAMPLE_RATE
}

fn default_num_mels() -> usize {
    80
}

impl Default for HiFiGanConfig {
    fn default() -> Self {
        // V1 configuration
        Self {
            resblock: "1".to_string(),
            upsample_rates: vec![8, 8, 2, 2],
            upsample_kernel_sizes: vec![16, 16, 4, 4],
            upsample_initial_channel: 512,
            resblock_kernel_sizes: vec![3, 7, 11],
            resblock_dilation_sizes: vec![vec![1, 3, 5], vec![1, 3, 5], vec![1, 3, 5]],
            sampling_rate: default_sampling_rate(),
            num_mels: 80,
        }
    }
}

impl HiFiGanConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HiFi-GAN config {:?}", path))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("Invalid HiFi-GAN config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resblock != "1" && self.resblock != "2" {
            anyhow::bail!("Unknown resblock type '{}'", self.resblock);
        }
        if self.upsample_rates.len() != self.upsample_kernel_sizes.len() {
            anyhow::bail!("upsample_rates and upsample_kernel_sizes differ in length");
        }
        if self.resblock_kernel_sizes.len() != self.resblock_dilation_sizes.len() {
            anyhow::bail!("resblock_kernel_sizes and resblock_dilation_sizes differ in length");
        }
        Ok(())
    }

    /// Samples produced per mel frame
    pub fn hop_length(&self) -> usize {
        self.upsample_rates.iter().product()
    }
}

fn get_padding(kernel_size: usize, dilation: usize) -> usize {
    (kernel_size * dilation - dilation) / 2
}

/// Residual block; type 1 pairs each dilated conv with an undilated one
struct ResBlock {
    convs1: Vec<Conv1d>,
    convs2: Vec<Conv1d>,
}

impl ResBlock {
    fn from_weights(
        weights: &Weights,
        prefix: &str,
        kernel_size: usize,
        dilations: &[usize],
        kind: &str,
    ) -> Result<Self> {
        let mut convs1 = Vec::new();
        let mut convs2 = Vec::new();

        if kind == "1" {
            for (i, &dilation) in dilations.iter().enumerate() {
                convs1.push(Conv1d::from_weights(
                    weights,
                    &format!("{}.convs1.{}", prefix, i),
                    1,
                    get_padding(kernel_size, dilation),
                    dilation,
                )?);
                convs2.push(Conv1d::from_weights(
                    weights,
                    &format!("{}.convs2.{}", prefix, i),
                    1,
                    get_padding(kernel_size, 1),
                    1,
                )?);
            }
        } else {
            for (i, &dilation) in dilations.iter().take(2).enumerate() {
                convs1.push(Conv1d::from_weights(
                    weights,
                    &format!("{}.convs.{}", prefix, i),
                    1,
                    get_padding(kernel_size, dilation),
                    dilation,
                )?);
            }
        }

        Ok(Self { convs1, convs2 })
    }

    fn new_random(
        channels: usize,
        kernel_size: usize,
        dilations: &[usize],
        kind: &str,
        device: &Device,
    ) -> Result<Self> {
        let mut convs1 = Vec::new();
        let mut convs2 = Vec::new();
        let dilations = if kind == "1" { dilations } else { &dilations[..dilations.len().min(2)] };

        for &dilation in dilations {
            convs1.push(Conv1d::new_random(
                channels,
                channels,
                kernel_size,
                1,
                get_padding(kernel_size, dilation),
                dilation,
                device,
            )?);
            if kind == "1" {
                convs2.push(Conv1d::new_random(
                    channels,
                    channels,
                    kernel_size,
                    1,
                    get_padding(kernel_size, 1),
                    1,
                    device,
                )?);
            }
        }

        Ok(Self { convs1, convs2 })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for (i, c1) in self.convs1.iter().enumerate() {
            let mut xt = c1.forward(&leaky_relu(&x, LRELU_SLOPE)?)?;
            if let Some(c2) = self.convs2.get(i) {
                xt = c2.forward(&leaky_relu(&xt, LRELU_SLOPE)?)?;
            }
            x = (xt + x)?;
        }
        Ok(x)
    }
}

/// HiFi-GAN generator
pub struct HiFiGan {
    config: HiFiGanConfig,
    conv_pre: Conv1d,
    ups: Vec<ConvTranspose1d>,
    /// `resblock_kernel_sizes.len()` blocks per upsampling layer
    resblocks: Vec<ResBlock>,
    conv_post: Conv1d,
}

impl HiFiGan {
    /// Load a model directory with `config.json` and a generator checkpoint
    pub fn load<P: AsRef<Path>>(dir: P, device: &Device) -> Result<Self> {
        let dir = dir.as_ref();
        let config = HiFiGanConfig::load(dir.join("config.json"))?;
        let checkpoint = latest_checkpoint(dir, "g_")?;
        let weights = load_checkpoint(&checkpoint, Some("generator"), device)?;
        let vocoder = Self::from_weights(config, &weights)?;
        tracing::info!("HiFi-GAN weights loaded from {:?}", checkpoint);
        Ok(vocoder)
    }

    /// Build the generator from loaded weights
    pub fn from_weights(config: HiFiGanConfig, weights: &Weights) -> Result<Self> {
        let conv_pre = Conv1d::from_weights(weights, "conv_pre", 1, 3, 1)?;

        let mut ups = Vec::new();
        let mut resblocks = Vec::new();
        let num_kernels = config.resblock_kernel_sizes.len();

        for (i, (&rate, &kernel)) in config
            .upsample_rates
            .iter()
            .zip(config.upsample_kernel_sizes.iter())
            .enumerate()
        {
            ups.push(ConvTranspose1d::from_weights(
                weights,
                &format!("ups.{}", i),
                rate,
                (kernel - rate) / 2,
            )?);

            for (j, (&k, d)) in config
                .resblock_kernel_sizes
                .iter()
                .zip(config.resblock_dilation_sizes.iter())
                .enumerate()
            {
                resblocks.push(ResBlock::from_weights(
                    weights,
                    &format!("resblocks.{}", i * num_kernels + j),
                    k,
                    d,
                    &config.resblock,
                )?);
            }
        }

        let conv_post = Conv1d::from_weights(weights, "conv_post", 1, 3, 1)?;

        Ok(Self {
            config,
            conv_pre,
            ups,
            resblocks,
            conv_post,
        })
    }

    /// Initialize with random weights
    pub fn new_random(config: HiFiGanConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let h = config.upsample_initial_channel;
        let conv_pre = Conv1d::new_random(config.num_mels, h, 7, 1, 3, 1, device)?;

        let mut ups = Vec::new();
        let mut resblocks = Vec::new();
        let mut ch = h;
        for (&rate, &kernel) in config.upsample_rates.iter().zip(config.upsample_kernel_sizes.iter()) {
            let out_ch = ch / 2;
            ups.push(ConvTranspose1d::new_random(ch, out_ch, kernel, rate, (kernel - rate) / 2, device)?);
            for (&k, d) in config.resblock_kernel_sizes.iter().zip(config.resblock_dilation_sizes.iter()) {
                resblocks.push(ResBlock::new_random(out_ch, k, d, &config.resblock, device)?);
            }
            ch = out_ch;
        }

        let conv_post = Conv1d::new_random(ch, 1, 7, 1, 3, 1, device)?;

        Ok(Self {
            config,
            conv_pre,
            ups,
            resblocks,
            conv_post,
        })
    }

    /// Forward pass, mel `[batch, mels, frames]` to audio `[batch, 1, samples]`
    pub fn forward(&self, mel: &Tensor) -> Result<Tensor> {
        let num_kernels = self.config.resblock_kernel_sizes.len();
        let mut x = self.conv_pre.forward(mel)?;

        for (i, up) in self.ups.iter().enumerate() {
            x = up.forward(&leaky_relu(&x, LRELU_SLOPE)?)?;

            let blocks = &self.resblocks[i * num_kernels..(i + 1) * num_kernels];
            let mut xs = blocks[0].forward(&x)?;
            for block in &blocks[1..] {
                xs = (xs + block.forward(&x)?)?;
            }
            x = (xs / num_kernels as f64)?;
        }

        let x = leaky_relu(&x, POST_LRELU_SLOPE)?;
        let x = self.conv_post.forward(&x)?;
        x.tanh().map_err(Into::into)
    }

    /// Synthesize 16-bit PCM samples from a mel spectrogram
    pub fn synthesize(&self, mel: &Tensor) -> Result<Vec<i16>> {
        let audio = self.forward(mel)?.flatten_all()?;
        let samples: Vec<f32> = audio.to_vec1()?;
        Ok(samples.into_iter().map(to_pcm16).collect())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sampling_rate
    }

    pub fn upsample_factor(&self) -> usize {
        self.config.hop_length()
    }

    pub fn config(&self) -> &HiFiGanConfig {
        &self.config
    }
}

/// Scale a sample in [-1, 1] to 16-bit PCM
pub fn to_pcm16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config(resblock: &str) -> HiFiGanConfig {
        HiFiGanConfig {
            resblock: resblock.to_string(),
            upsample_rates: vec![4, 2],
            upsample_kernel_sizes: vec![8, 4],
            upsample_initial_channel: 16,
            resblock_kernel_sizes: vec![3, 5],
            resblock_dilation_sizes: vec![vec![1, 3], vec![1, 3]],
            sampling_rate: 16000,
            num_mels: 8,
        }
    }

    #[test]
    fn test_default_config() {
        let config = HiFiGanConfig::default();
        assert_eq!(config.hop_length(), 256);
        assert_eq!(config.sampling_rate, 22050);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_training_json() {
        let json = r#"{"resblock": "2", "num_gpus": 0, "batch_size": 16,
            "upsample_rates": [8,8,4], "upsample_kernel_sizes": [16,16,8],
            "upsample_initial_channel": 256, "resblock_kernel_sizes": [3,5,7],
            "resblock_dilation_sizes": [[1,2],[2,6],[3,12]], "sampling_rate": 22050}"#;
        let config: HiFiGanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resblock, "2");
        assert_eq!(config.hop_length(), 256);
        assert_eq!(config.num_mels, 80);
    }

    #[test]
    fn test_generator_output_length() {
        let device = Device::Cpu;
        for kind in ["1", "2"] {
            let vocoder = HiFiGan::new_random(tiny_config(kind), &device).unwrap();
            let mel = Tensor::randn(0.0f32, 1.0, (1, 8, 12), &device).unwrap();
            let audio = vocoder.forward(&mel).unwrap();
            assert_eq!(audio.dims(), &[1, 1, 12 * 8]);
        }
    }

    #[test]
    fn test_synthesize_pcm_range() {
        let device = Device::Cpu;
        let vocoder = HiFiGan::new_random(tiny_config("1"), &device).unwrap();
        let mel = Tensor::randn(0.0f32, 1.0, (1, 8, 5), &device).unwrap();
        let samples = vocoder.synthesize(&mel).unwrap();
        assert_eq!(samples.len(), 5 * vocoder.upsample_factor());
    }

    #[test]
    fn test_to_pcm16_clamps() {
        assert_eq!(to_pcm16(1.0), i16::MAX);
        assert_eq!(to_pcm16(-1.0), i16::MIN);
        assert_eq!(to_pcm16(0.0), 0);
    }

    #[test]
    fn test_unknown_resblock_rejected() {
        assert!(tiny_config("3").validate().is_err());
    }
}
