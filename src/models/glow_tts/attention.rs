//! Relative-position self-attention encoder
//!
//! Transformer encoder used by the Glow-TTS text encoder. Attention scores
//! get an extra term from learned relative position embeddings limited to a
//! window of `window_size` positions on each side; the embeddings are shared
//! across heads.

use anyhow::Result;
use candle_core::{Device, Tensor};

use crate::models::layers::{softmax_last_dim, ChannelLayerNorm, Conv1d};
use crate::models::weights::{get_tensor, Weights};

/// Multi-head self-attention with windowed relative positions
pub struct MultiHeadAttention {
    conv_q: Conv1d,
    conv_k: Conv1d,
    conv_v: Conv1d,
    conv_o: Conv1d,
    emb_rel_k: Option<Tensor>,
    emb_rel_v: Option<Tensor>,
    n_heads: usize,
    window_size: Option<usize>,
}

impl MultiHeadAttention {
    pub fn from_weights(weights: &Weights, prefix: &str, n_heads: usize, window_size: Option<usize>) -> Result<Self> {
        let conv = |name: &str| Conv1d::from_weights(weights, &format!("{}.{}", prefix, name), 1, 0, 1);
        let (emb_rel_k, emb_rel_v) = match window_size {
            Some(_) => (
                Some(get_tensor(weights, &format!("{}.emb_rel_k", prefix))?),
                Some(get_tensor(weights, &format!("{}.emb_rel_v", prefix))?),
            ),
            None => (None, None),
        };

        Ok(Self {
            conv_q: conv("conv_q")?,
            conv_k: conv("conv_k")?,
            conv_v: conv("conv_v")?,
            conv_o: conv("conv_o")?,
            emb_rel_k,
            emb_rel_v,
            n_heads,
            window_size,
        })
    }

    pub fn new_random(channels: usize, n_heads: usize, window_size: Option<usize>, device: &Device) -> Result<Self> {
        let conv = || Conv1d::new_random(channels, channels, 1, 1, 0, 1, device);
        let k_channels = channels / n_heads;
        let rel = |w: usize| Tensor::randn(0.0f32, (k_channels as f32).powf(-0.5), (1, 2 * w + 1, k_channels), device);
        let (emb_rel_k, emb_rel_v) = match window_size {
            Some(w) => (Some(rel(w)?), Some(rel(w)?)),
            None => (None, None),
        };

        Ok(Self {
            conv_q: conv()?,
            conv_k: conv()?,
            conv_v: conv()?,
            conv_o: conv()?,
            emb_rel_k,
            emb_rel_v,
            n_heads,
            window_size,
        })
    }

    /// Self-attention over `x` of shape `[batch, channels, time]`
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let q = self.conv_q.forward(x)?;
        let k = self.conv_k.forward(x)?;
        let v = self.conv_v.forward(x)?;

        let (b, d, t) = q.dims3()?;
        let k_channels = d / self.n_heads;
        let scale = (k_channels as f64).sqrt();

        // [b, h, t, k_channels]
        let split = |x: &Tensor| -> Result<Tensor> {
            Ok(x.reshape((b, self.n_heads, k_channels, t))?.transpose(2, 3)?.contiguous()?)
        };
        let query = split(&q)?;
        let key = split(&k)?;
        let value = split(&v)?;

        let mut scores = (query.matmul(&key.transpose(2, 3)?.contiguous()?)? / scale)?;

        if let (Some(window), Some(emb_rel_k)) = (self.window_size, &self.emb_rel_k) {
            let key_rel = relative_embeddings(emb_rel_k, t, window)?; // [1, 2t-1, kc]
            let key_rel = key_rel.unsqueeze(0)?.transpose(2, 3)?.contiguous()?;
            let rel_logits = query.broadcast_matmul(&key_rel)?; // [b, h, t, 2t-1]
            let scores_local = (relative_to_absolute(&rel_logits)? / scale)?;
            scores = (scores + scores_local)?;
        }

        let p_attn = softmax_last_dim(&scores)?;
        let mut output = p_attn.matmul(&value)?;

        if let (Some(window), Some(emb_rel_v)) = (self.window_size, &self.emb_rel_v) {
            let relative_weights = absolute_to_relative(&p_attn)?; // [b, h, t, 2t-1]
            let value_rel = relative_embeddings(emb_rel_v, t, window)?.unsqueeze(0)?;
            output = (output + relative_weights.broadcast_matmul(&value_rel)?)?;
        }

        let output = output.transpose(2, 3)?.contiguous()?.reshape((b, d, t))?;
        self.conv_o.forward(&output)
    }
}

/// Relative embeddings for every offset in `-(length-1)..=(length-1)`
///
/// Offsets outside the learned window get zero embeddings.
fn relative_embeddings(embeddings: &Tensor, length: usize, window_size: usize) -> Result<Tensor> {
    let pad_length = length.saturating_sub(window_size + 1);
    let slice_start = (window_size + 1).saturating_sub(length);

    let padded = if pad_length > 0 {
        embeddings.pad_with_zeros(1, pad_length, pad_length)?
    } else {
        embeddings.clone()
    };

    Ok(padded.narrow(1, slice_start, 2 * length - 1)?)
}

/// `[b, h, l, 2l-1]` relative logits to `[b, h, l, l]` absolute positions
fn relative_to_absolute(x: &Tensor) -> Result<Tensor> {
    let (b, h, l, _) = x.dims4()?;
    let x = x.pad_with_zeros(3, 0, 1)?; // [b, h, l, 2l]
    let x_flat = x.reshape((b, h, l * 2 * l))?;
    let x_flat = x_flat.pad_with_zeros(2, 0, l - 1)?;
    let x_final = x_flat.reshape((b, h, l + 1, 2 * l - 1))?;
    Ok(x_final.narrow(2, 0, l)?.narrow(3, l - 1, l)?.contiguous()?)
}

/// `[b, h, l, l]` absolute weights to `[b, h, l, 2l-1]` relative positions
fn absolute_to_relative(x: &Tensor) -> Result<Tensor> {
    let (b, h, l, _) = x.dims4()?;
    let x = x.pad_with_zeros(3, 0, l - 1)?; // [b, h, l, 2l-1]
    let x_flat = x.reshape((b, h, l * l + l * (l - 1)))?;
    let x_flat = x_flat.pad_with_zeros(2, l, 0)?;
    let x_final = x_flat.reshape((b, h, l, 2 * l))?;
    Ok(x_final.narrow(3, 1, 2 * l - 1)?.contiguous()?)
}

/// Position-wise feed-forward network of two convolutions
pub struct FeedForward {
    conv_1: Conv1d,
    conv_2: Conv1d,
}

impl FeedForward {
    pub fn from_weights(weights: &Weights, prefix: &str, kernel_size: usize) -> Result<Self> {
        let padding = kernel_size / 2;
        Ok(Self {
            conv_1: Conv1d::from_weights(weights, &format!("{}.conv_1", prefix), 1, padding, 1)?,
            conv_2: Conv1d::from_weights(weights, &format!("{}.conv_2", prefix), 1, padding, 1)?,
        })
    }

    pub fn new_random(channels: usize, filter_channels: usize, kernel_size: usize, device: &Device) -> Result<Self> {
        let padding = kernel_size / 2;
        Ok(Self {
            conv_1: Conv1d::new_random(channels, filter_channels, kernel_size, 1, padding, 1, device)?,
            conv_2: Conv1d::new_random(filter_channels, channels, kernel_size, 1, padding, 1, device)?,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.conv_1.forward(x)?.relu()?;
        self.conv_2.forward(&x)
    }
}

/// Stack of attention and feed-forward layers with post-norm residuals
pub struct Encoder {
    attn_layers: Vec<MultiHeadAttention>,
    norm_layers_1: Vec<ChannelLayerNorm>,
    ffn_layers: Vec<FeedForward>,
    norm_layers_2: Vec<ChannelLayerNorm>,
}

/// Encoder shape parameters
#[derive(Debug, Clone, Copy)]
pub struct EncoderParams {
    pub channels: usize,
    pub filter_channels: usize,
    pub n_heads: usize,
    pub n_layers: usize,
    pub kernel_size: usize,
    pub window_size: Option<usize>,
}

impl Encoder {
    pub fn from_weights(weights: &Weights, prefix: &str, params: EncoderParams) -> Result<Self> {
        let mut encoder = Self::empty(params.n_layers);
        for i in 0..params.n_layers {
            encoder.attn_layers.push(MultiHeadAttention::from_weights(
                weights,
                &format!("{}.attn_layers.{}", prefix, i),
                params.n_heads,
                params.window_size,
            )?);
            encoder
                .norm_layers_1
                .push(ChannelLayerNorm::from_weights(weights, &format!("{}.norm_layers_1.{}", prefix, i))?);
            encoder.ffn_layers.push(FeedForward::from_weights(
                weights,
                &format!("{}.ffn_layers.{}", prefix, i),
                params.kernel_size,
            )?);
            encoder
                .norm_layers_2
                .push(ChannelLayerNorm::from_weights(weights, &format!("{}.norm_layers_2.{}", prefix, i))?);
        }
        Ok(encoder)
    }

    pub fn new_random(params: EncoderParams, device: &Device) -> Result<Self> {
        let mut encoder = Self::empty(params.n_layers);
        for _ in 0..params.n_layers {
            encoder.attn_layers.push(MultiHeadAttention::new_random(
                params.channels,
                params.n_heads,
                params.window_size,
                device,
            )?);
            encoder.norm_layers_1.push(ChannelLayerNorm::new_random(params.channels, device)?);
            encoder.ffn_layers.push(FeedForward::new_random(
                params.channels,
                params.filter_channels,
                params.kernel_size,
                device,
            )?);
            encoder.norm_layers_2.push(ChannelLayerNorm::new_random(params.channels, device)?);
        }
        Ok(encoder)
    }

    fn empty(n_layers: usize) -> Self {
        Self {
            attn_layers: Vec::with_capacity(n_layers),
            norm_layers_1: Vec::with_capacity(n_layers),
            ffn_layers: Vec::with_capacity(n_layers),
            norm_layers_2: Vec::with_capacity(n_layers),
        }
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for i in 0..self.attn_layers.len() {
            let y = self.attn_layers[i].forward(&x)?;
            x = self.norm_layers_1[i].forward(&(x + y)?)?;
            let y = self.ffn_layers[i].forward(&x)?;
            x = self.norm_layers_2[i].forward(&(x + y)?)?;
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_embeddings_padding() {
        let device = Device::Cpu;
        let emb = Tensor::ones((1, 9, 2), candle_core::DType::F32, &device).unwrap();
        // long sequence: window padded with zeros
        let long = relative_embeddings(&emb, 8, 4).unwrap();
        assert_eq!(long.dims(), &[1, 15, 2]);
        let sum: f32 = long.sum_all().unwrap().to_scalar().unwrap();
        assert_eq!(sum, 18.0);
        // short sequence: window sliced
        let short = relative_embeddings(&emb, 2, 4).unwrap();
        assert_eq!(short.dims(), &[1, 3, 2]);
    }

    #[test]
    fn test_relative_to_absolute_positions() {
        let device = Device::Cpu;
        // relative offsets -1, 0, +1 for a length-2 sequence
        let rel = Tensor::new(&[[[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]]], &device).unwrap();
        let abs: Vec<Vec<f32>> = relative_to_absolute(&rel).unwrap().squeeze(0).unwrap().squeeze(0).unwrap().to_vec2().unwrap();
        // row i, column j takes offset j - i
        assert_eq!(abs, vec![vec![2.0, 3.0], vec![4.0, 5.0]]);
    }

    #[test]
    fn test_absolute_to_relative_positions() {
        let device = Device::Cpu;
        let abs = Tensor::new(&[[[[1.0f32, 2.0], [3.0, 4.0]]]], &device).unwrap();
        let rel: Vec<Vec<f32>> = absolute_to_relative(&abs).unwrap().squeeze(0).unwrap().squeeze(0).unwrap().to_vec2().unwrap();
        assert_eq!(rel, vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 0.0]]);
    }

    #[test]
    fn test_encoder_shape() {
        let device = Device::Cpu;
        let params = EncoderParams {
            channels: 16,
            filter_channels: 32,
            n_heads: 2,
            n_layers: 2,
            kernel_size: 3,
            window_size: Some(4),
        };
        let encoder = Encoder::new_random(params, &device).unwrap();
        let x = Tensor::randn(0.0f32, 1.0, (1, 16, 7), &device).unwrap();
        assert_eq!(encoder.forward(&x).unwrap().dims(), &[1, 16, 7]);
    }
}
