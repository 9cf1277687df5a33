//! Shared neural network layers
//!
//! Thin wrappers over candle tensor ops that load their parameters from a
//! [`Weights`] map by prefix, or initialize randomly for tests.

use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};

use super::weights::{get_tensor, Weights};

/// 1D Convolution with loaded weights
#[derive(Debug, Clone)]
pub struct Conv1d {
    weight: Tensor,
    bias: Option<Tensor>,
    stride: usize,
    padding: usize,
    dilation: usize,
}

impl Conv1d {
    pub fn from_weights(
        weights: &Weights,
        prefix: &str,
        stride: usize,
        padding: usize,
        dilation: usize,
    ) -> Result<Self> {
        let weight = get_tensor(weights, &format!("{}.weight", prefix))?;
        let bias = weights.get(&format!("{}.bias", prefix)).cloned();

        Ok(Self {
            weight,
            bias,
            stride,
            padding,
            dilation,
        })
    }

    pub fn new_random(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        dilation: usize,
        device: &Device,
    ) -> Result<Self> {
        let weight = Tensor::randn(0.0f32, 0.02, (out_channels, in_channels, kernel_size), device)?;
        let bias = Some(Tensor::zeros((out_channels,), DType::F32, device)?);

        Ok(Self {
            weight,
            bias,
            stride,
            padding,
            dilation,
        })
    }

    /// Output channels
    pub fn out_channels(&self) -> usize {
        self.weight.dims()[0]
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = x.conv1d(&self.weight, self.padding, self.stride, self.dilation, 1)?;
        if let Some(ref bias) = self.bias {
            let bias = bias.unsqueeze(0)?.unsqueeze(2)?;
            x.broadcast_add(&bias).map_err(Into::into)
        } else {
            Ok(x)
        }
    }
}

/// Transposed 1D Convolution for upsampling
#[derive(Debug, Clone)]
pub struct ConvTranspose1d {
    weight: Tensor,
    bias: Option<Tensor>,
    stride: usize,
    padding: usize,
}

impl ConvTranspose1d {
    pub fn from_weights(weights: &Weights, prefix: &str, stride: usize, padding: usize) -> Result<Self> {
        let weight = get_tensor(weights, &format!("{}.weight", prefix))?;
        let bias = weights.get(&format!("{}.bias", prefix)).cloned();

        Ok(Self {
            weight,
            bias,
            stride,
            padding,
        })
    }

    pub fn new_random(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        device: &Device,
    ) -> Result<Self> {
        let weight = Tensor::randn(0.0f32, 0.02, (in_channels, out_channels, kernel_size), device)?;
        let bias = Some(Tensor::zeros((out_channels,), DType::F32, device)?);

        Ok(Self {
            weight,
            bias,
            stride,
            padding,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        // conv_transpose1d(kernel, padding, output_padding, stride, dilation, groups)
        let x = x.conv_transpose1d(&self.weight, self.padding, 0, self.stride, 1, 1)?;

        if let Some(ref bias) = self.bias {
            let bias = bias.unsqueeze(0)?.unsqueeze(2)?;
            x.broadcast_add(&bias).map_err(Into::into)
        } else {
            Ok(x)
        }
    }
}

/// Layer normalization over the channel axis of a `[batch, channels, time]` tensor
#[derive(Debug, Clone)]
pub struct ChannelLayerNorm {
    gamma: Tensor,
    beta: Tensor,
    eps: f64,
}

impl ChannelLayerNorm {
    pub const DEFAULT_EPS: f64 = 1e-4;

    pub fn from_weights(weights: &Weights, prefix: &str) -> Result<Self> {
        Ok(Self {
            gamma: get_tensor(weights, &format!("{}.gamma", prefix))?,
            beta: get_tensor(weights, &format!("{}.beta", prefix))?,
            eps: Self::DEFAULT_EPS,
        })
    }

    pub fn new_random(channels: usize, device: &Device) -> Result<Self> {
        Ok(Self {
            gamma: Tensor::ones((channels,), DType::F32, device)?,
            beta: Tensor::zeros((channels,), DType::F32, device)?,
            eps: Self::DEFAULT_EPS,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mean = x.mean_keepdim(1)?;
        let centered = x.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(1)?;
        let normalized = centered.broadcast_div(&(variance + self.eps)?.sqrt()?)?;

        let gamma = self.gamma.unsqueeze(0)?.unsqueeze(2)?;
        let beta = self.beta.unsqueeze(0)?.unsqueeze(2)?;
        normalized
            .broadcast_mul(&gamma)?
            .broadcast_add(&beta)
            .map_err(Into::into)
    }
}

/// Leaky ReLU: max(x, slope * x) for slopes below one
pub fn leaky_relu(x: &Tensor, slope: f64) -> Result<Tensor> {
    x.maximum(&(x * slope)?).map_err(Into::into)
}

/// Split a `[batch, channels, time]` tensor into two channel halves
pub fn split_channels(x: &Tensor, first: usize) -> Result<(Tensor, Tensor)> {
    let channels = x.dim(1)?;
    let a = x.narrow(1, 0, first)?;
    let b = x.narrow(1, first, channels - first)?;
    Ok((a, b))
}

/// Softmax over the last dimension
pub fn softmax_last_dim(x: &Tensor) -> Result<Tensor> {
    let max = x.max_keepdim(D::Minus1)?;
    let exp = x.broadcast_sub(&max)?.exp()?;
    let sum = exp.sum_keepdim(D::Minus1)?;
    exp.broadcast_div(&sum).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv1d_shape() {
        let device = Device::Cpu;
        let conv = Conv1d::new_random(4, 8, 5, 1, 2, 1, &device).unwrap();
        let x = Tensor::randn(0.0f32, 1.0, (1, 4, 20), &device).unwrap();
        assert_eq!(conv.forward(&x).unwrap().dims(), &[1, 8, 20]);
        assert_eq!(conv.out_channels(), 8);
    }

    #[test]
    fn test_conv_transpose_upsamples() {
        let device = Device::Cpu;
        // kernel 16, stride 8, padding (16 - 8) / 2
        let up = ConvTranspose1d::new_random(8, 4, 16, 8, 4, &device).unwrap();
        let x = Tensor::randn(0.0f32, 1.0, (1, 8, 10), &device).unwrap();
        assert_eq!(up.forward(&x).unwrap().dims(), &[1, 4, 80]);
    }

    #[test]
    fn test_channel_layer_norm() {
        let device = Device::Cpu;
        let norm = ChannelLayerNorm::new_random(3, &device).unwrap();
        let x = Tensor::new(&[[[1.0f32], [2.0], [3.0]]], &device).unwrap();
        let y: Vec<f32> = norm.forward(&x).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        assert!(y[1].abs() < 1e-4);
        assert!((y[0] + y[2]).abs() < 1e-4);
        assert!((y[2] - 1.2247).abs() < 1e-2);
    }

    #[test]
    fn test_leaky_relu() {
        let device = Device::Cpu;
        let x = Tensor::new(&[-2.0f32, 0.0, 3.0], &device).unwrap();
        let y: Vec<f32> = leaky_relu(&x, 0.1).unwrap().to_vec1().unwrap();
        assert!((y[0] + 0.2).abs() < 1e-6);
        assert_eq!(y[2], 3.0);
    }

    #[test]
    fn test_softmax() {
        let device = Device::Cpu;
        let x = Tensor::new(&[[1.0f32, 1.0, 1.0, 1.0]], &device).unwrap();
        let y: Vec<Vec<f32>> = softmax_last_dim(&x).unwrap().to_vec2().unwrap();
        assert!(y[0].iter().all(|v| (v - 0.25).abs() < 1e-6));
    }
}
