//! Glow-TTS text encoder
//!
//! Maps symbol ids to the per-token prior mean (and optionally log-scale)
//! of the mel frames, plus log durations from the duration predictor.

use anyhow::Result;
use candle_core::{Device, Tensor};

use super::attention::{Encoder, EncoderParams};
use super::config::GlowTtsConfig;
use crate::models::layers::{ChannelLayerNorm, Conv1d};
use crate::models::weights::{get_tensor, Weights};

/// Output of the text encoder for one utterance
pub struct EncoderOutput {
    /// Prior means `[1, n_mels, tokens]`
    pub x_m: Tensor,
    /// Prior log standard deviations `[1, n_mels, tokens]`
    pub x_logs: Tensor,
    /// Log durations `[1, 1, tokens]`
    pub logw: Tensor,
}

/// Conv -> LayerNorm -> ReLU stack with a residual projection
struct ConvReluNorm {
    conv_layers: Vec<Conv1d>,
    norm_layers: Vec<ChannelLayerNorm>,
    proj: Conv1d,
}

impl ConvReluNorm {
    const KERNEL_SIZE: usize = 5;
    const N_LAYERS: usize = 3;

    fn from_weights(weights: &Weights, prefix: &str) -> Result<Self> {
        let mut conv_layers = Vec::new();
        let mut norm_layers = Vec::new();
        for i in 0..Self::N_LAYERS {
            conv_layers.push(Conv1d::from_weights(
                weights,
                &format!("{}.conv_layers.{}", prefix, i),
                1,
                Self::KERNEL_SIZE / 2,
                1,
            )?);
            norm_layers.push(ChannelLayerNorm::from_weights(
                weights,
                &format!("{}.norm_layers.{}", prefix, i),
            )?);
        }
        let proj = Conv1d::from_weights(weights, &format!("{}.proj", prefix), 1, 0, 1)?;
        Ok(Self {
            conv_layers,
            norm_layers,
            proj,
        })
    }

    fn new_random(channels: usize, device: &Device) -> Result<Self> {
        let mut conv_layers = Vec::new();
        let mut norm_layers = Vec::new();
        for _ in 0..Self::N_LAYERS {
            conv_layers.push(Conv1d::new_random(
                channels,
                channels,
                Self::KERNEL_SIZE,
                1,
                Self::KERNEL_SIZE / 2,
                1,
                device,
            )?);
            norm_layers.push(ChannelLayerNorm::new_random(channels, device)?);
        }
        let proj = Conv1d::new_random(channels, channels, 1, 1, 0, 1, device)?;
        Ok(Self {
            conv_layers,
            norm_layers,
            proj,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x_org = x.clone();
        let mut x = x.clone();
        for (conv, norm) in self.conv_layers.iter().zip(self.norm_layers.iter()) {
            x = conv.forward(&x)?;
            x = norm.forward(&x)?;
            x = x.relu()?;
        }
        Ok((x_org + self.proj.forward(&x)?)?)
    }
}

/// Predicts the log duration of every token
struct DurationPredictor {
    conv_1: Conv1d,
    norm_1: ChannelLayerNorm,
    conv_2: Conv1d,
    norm_2: ChannelLayerNorm,
    proj: Conv1d,
}

impl DurationPredictor {
    fn from_weights(weights: &Weights, prefix: &str, kernel_size: usize) -> Result<Self> {
        let padding = kernel_size / 2;
        Ok(Self {
            conv_1: Conv1d::from_weights(weights, &format!("{}.conv_1", prefix), 1, padding, 1)?,
            norm_1: ChannelLayerNorm::from_weights(weights, &format!("{}.norm_1", prefix))?,
            conv_2: Conv1d::from_weights(weights, &format!("{}.conv_2", prefix), 1, padding, 1)?,
            norm_2: ChannelLayerNorm::from_weights(weights, &format!("{}.norm_2", prefix))?,
            proj: Conv1d::from_weights(weights, &format!("{}.proj", prefix), 1, 0, 1)?,
        })
    }

    fn new_random(in_channels: usize, filter_channels: usize, kernel_size: usize, device: &Device) -> Result<Self> {
        let padding = kernel_size / 2;
        Ok(Self {
            conv_1: Conv1d::new_random(in_channels, filter_channels, kernel_size, 1, padding, 1, device)?,
            norm_1: ChannelLayerNorm::new_random(filter_channels, device)?,
            conv_2: Conv1d::new_random(filter_channels, filter_channels, kernel_size, 1, padding, 1, device)?,
            norm_2: ChannelLayerNorm::new_random(filter_channels, device)?,
            proj: Conv1d::new_random(filter_channels, 1, 1, 1, 0, 1, device)?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.norm_1.forward(&self.conv_1.forward(x)?.relu()?)?;
        let x = self.norm_2.forward(&self.conv_2.forward(&x)?.relu()?)?;
        self.proj.forward(&x)
    }
}

/// Embedding, optional prenet, attention encoder and output projections
pub struct TextEncoder {
    embedding: Tensor,
    hidden_channels: usize,
    prenet: Option<ConvReluNorm>,
    encoder: Encoder,
    proj_m: Conv1d,
    proj_s: Option<Conv1d>,
    proj_w: DurationPredictor,
}

impl TextEncoder {
    pub fn from_weights(weights: &Weights, prefix: &str, config: &GlowTtsConfig) -> Result<Self> {
        let m = &config.model;
        let prenet = if m.prenet {
            Some(ConvReluNorm::from_weights(weights, &format!("{}.pre", prefix))?)
        } else {
            None
        };
        let proj_s = if m.mean_only {
            None
        } else {
            Some(Conv1d::from_weights(weights, &format!("{}.proj_s", prefix), 1, 0, 1)?)
        };

        Ok(Self {
            embedding: get_tensor(weights, &format!("{}.emb.weight", prefix))?,
            hidden_channels: config.encoder_channels(),
            prenet,
            encoder: Encoder::from_weights(weights, &format!("{}.encoder", prefix), encoder_params(config))?,
            proj_m: Conv1d::from_weights(weights, &format!("{}.proj_m", prefix), 1, 0, 1)?,
            proj_s,
            proj_w: DurationPredictor::from_weights(weights, &format!("{}.proj_w", prefix), m.kernel_size)?,
        })
    }

    pub fn new_random(config: &GlowTtsConfig, n_vocab: usize, device: &Device) -> Result<Self> {
        let m = &config.model;
        let hidden = config.encoder_channels();
        let n_mels = config.data.n_mel_channels;
        let prenet = if m.prenet {
            Some(ConvReluNorm::new_random(hidden, device)?)
        } else {
            None
        };
        let proj_s = if m.mean_only {
            None
        } else {
            Some(Conv1d::new_random(hidden, n_mels, 1, 1, 0, 1, device)?)
        };

        Ok(Self {
            embedding: Tensor::randn(0.0f32, (hidden as f32).powf(-0.5), (n_vocab, hidden), device)?,
            hidden_channels: hidden,
            prenet,
            encoder: Encoder::new_random(encoder_params(config), device)?,
            proj_m: Conv1d::new_random(hidden, n_mels, 1, 1, 0, 1, device)?,
            proj_s,
            proj_w: DurationPredictor::new_random(hidden, m.filter_channels_dp, m.kernel_size, device)?,
        })
    }

    /// Number of symbols the embedding table accepts
    pub fn vocab_size(&self) -> usize {
        self.embedding.dims()[0]
    }

    /// Encode symbol ids of shape `[1, tokens]`
    pub fn forward(&self, ids: &Tensor) -> Result<EncoderOutput> {
        let flat = ids.flatten_all()?;
        // [tokens, hidden] -> [1, hidden, tokens]
        let x = self.embedding.index_select(&flat, 0)?;
        let x = (x * (self.hidden_channels as f64).sqrt())?;
        let mut x = x.t()?.unsqueeze(0)?.contiguous()?;

        if let Some(ref prenet) = self.prenet {
            x = prenet.forward(&x)?;
        }
        let x = self.encoder.forward(&x)?;

        let x_m = self.proj_m.forward(&x)?;
        let x_logs = match self.proj_s {
            Some(ref proj_s) => proj_s.forward(&x)?,
            None => x_m.zeros_like()?,
        };
        let logw = self.proj_w.forward(&x)?;

        Ok(EncoderOutput { x_m, x_logs, logw })
    }
}

fn encoder_params(config: &GlowTtsConfig) -> EncoderParams {
    EncoderParams {
        channels: config.encoder_channels(),
        filter_channels: config.model.filter_channels,
        n_heads: config.model.n_heads,
        n_layers: config.model.n_layers_enc,
        kernel_size: config.model.kernel_size,
        window_size: config.model.window_size,
    }
}
