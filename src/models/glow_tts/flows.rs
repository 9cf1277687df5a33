//! Glow-TTS flow decoder, inverse direction only
//!
//! Each block is ActNorm -> invertible 1x1 convolution -> affine coupling.
//! Synthesis runs the blocks in reverse order on squeezed latents.

use anyhow::Result;
use candle_core::{DType, Device, Tensor};

use crate::models::layers::{split_channels, Conv1d};
use crate::models::weights::{get_tensor, Weights};

/// Per-channel affine normalization
struct ActNorm {
    logs: Tensor,
    bias: Tensor,
}

impl ActNorm {
    fn from_weights(weights: &Weights, prefix: &str) -> Result<Self> {
        Ok(Self {
            logs: get_tensor(weights, &format!("{}.logs", prefix))?,
            bias: get_tensor(weights, &format!("{}.bias", prefix))?,
        })
    }

    fn new_random(channels: usize, device: &Device) -> Result<Self> {
        Ok(Self {
            logs: Tensor::randn(0.0f32, 0.01, (1, channels, 1), device)?,
            bias: Tensor::randn(0.0f32, 0.01, (1, channels, 1), device)?,
        })
    }

    fn reverse(&self, x: &Tensor) -> Result<Tensor> {
        let scale = self.logs.neg()?.exp()?;
        Ok(x.broadcast_sub(&self.bias)?.broadcast_mul(&scale)?)
    }
}

/// Invertible 1x1 convolution mixing `n_split` channel groups
struct InvConvNear {
    weight_inv: Tensor,
    n_split: usize,
}

impl InvConvNear {
    fn from_weights(weights: &Weights, prefix: &str, n_split: usize) -> Result<Self> {
        let weight = get_tensor(weights, &format!("{}.weight", prefix))?;
        Ok(Self {
            weight_inv: invert_matrix(&weight)?,
            n_split,
        })
    }

    fn new_random(n_split: usize, device: &Device) -> Result<Self> {
        // identity plus a small perturbation stays invertible
        let identity: Vec<f32> = (0..n_split * n_split)
            .map(|i| if i / n_split == i % n_split { 1.0 } else { 0.0 })
            .collect();
        let eye = Tensor::from_vec(identity, (n_split, n_split), device)?;
        let noise = Tensor::randn(0.0f32, 0.05, (n_split, n_split), device)?;
        let weight = (eye + noise)?;
        Ok(Self {
            weight_inv: invert_matrix(&weight)?,
            n_split,
        })
    }

    fn reverse(&self, x: &Tensor) -> Result<Tensor> {
        let (b, c, t) = x.dims3()?;
        let n = self.n_split;
        let group = c / n;

        // [b, 2, c/n, n/2, t] -> [b, 2, n/2, c/n, t] -> [b, n, c/n * t]
        let x = x
            .reshape((b, 2, group, n / 2, t))?
            .permute(vec![0, 1, 3, 2, 4])?
            .contiguous()?
            .reshape((b, n, group * t))?;

        let z = self.weight_inv.unsqueeze(0)?.broadcast_matmul(&x)?;

        let z = z
            .reshape((b, 2, n / 2, group, t))?
            .permute(vec![0, 1, 3, 2, 4])?
            .contiguous()?
            .reshape((b, c, t))?;
        Ok(z)
    }
}

/// Invert a small square matrix with Gauss-Jordan elimination
fn invert_matrix(weight: &Tensor) -> Result<Tensor> {
    let rows: Vec<Vec<f32>> = weight.to_dtype(DType::F32)?.to_vec2()?;
    let n = rows.len();
    let mut a: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| row.iter().map(|&v| v as f64).collect())
        .collect();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            anyhow::bail!("InvConvNear weight is singular");
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..n {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for i in 0..n {
            if i != col {
                let factor = a[i][col];
                for j in 0..n {
                    a[i][j] -= factor * a[col][j];
                    inv[i][j] -= factor * inv[col][j];
                }
            }
        }
    }

    let flat: Vec<f32> = inv.into_iter().flatten().map(|v| v as f32).collect();
    Ok(Tensor::from_vec(flat, (n, n), weight.device())?)
}

/// Non-causal WaveNet with gated activations
struct WaveNet {
    in_layers: Vec<Conv1d>,
    res_skip_layers: Vec<Conv1d>,
    hidden_channels: usize,
}

impl WaveNet {
    fn from_weights(
        weights: &Weights,
        prefix: &str,
        hidden_channels: usize,
        kernel_size: usize,
        dilation_rate: usize,
        n_layers: usize,
    ) -> Result<Self> {
        let mut in_layers = Vec::new();
        let mut res_skip_layers = Vec::new();
        for i in 0..n_layers {
            let dilation = dilation_rate.pow(i as u32);
            let padding = (kernel_size * dilation - dilation) / 2;
            in_layers.push(Conv1d::from_weights(
                weights,
                &format!("{}.in_layers.{}", prefix, i),
                1,
                padding,
                dilation,
            )?);
            res_skip_layers.push(Conv1d::from_weights(
                weights,
                &format!("{}.res_skip_layers.{}", prefix, i),
                1,
                0,
                1,
            )?);
        }
        Ok(Self {
            in_layers,
            res_skip_layers,
            hidden_channels,
        })
    }

    fn new_random(
        hidden_channels: usize,
        kernel_size: usize,
        dilation_rate: usize,
        n_layers: usize,
        device: &Device,
    ) -> Result<Self> {
        let mut in_layers = Vec::new();
        let mut res_skip_layers = Vec::new();
        for i in 0..n_layers {
            let dilation = dilation_rate.pow(i as u32);
            let padding = (kernel_size * dilation - dilation) / 2;
            in_layers.push(Conv1d::new_random(
                hidden_channels,
                2 * hidden_channels,
                kernel_size,
                1,
                padding,
                dilation,
                device,
            )?);
            let res_skip_channels = if i < n_layers - 1 {
                2 * hidden_channels
            } else {
                hidden_channels
            };
            res_skip_layers.push(Conv1d::new_random(hidden_channels, res_skip_channels, 1, 1, 0, 1, device)?);
        }
        Ok(Self {
            in_layers,
            res_skip_layers,
            hidden_channels,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.hidden_channels;
        let mut x = x.clone();
        let mut output = x.zeros_like()?;
        let last = self.in_layers.len().saturating_sub(1);

        for (i, (in_layer, res_skip)) in self.in_layers.iter().zip(self.res_skip_layers.iter()).enumerate() {
            let x_in = in_layer.forward(&x)?;
            let (t_act, s_act) = split_channels(&x_in, h)?;
            let acts = (t_act.tanh()? * candle_nn::ops::sigmoid(&s_act)?)?;
            let res_skip_acts = res_skip.forward(&acts)?;

            if i < last {
                let (res, skip) = split_channels(&res_skip_acts, h)?;
                x = (x + res)?;
                output = (output + skip)?;
            } else {
                output = (output + res_skip_acts)?;
            }
        }

        Ok(output)
    }
}

/// Affine coupling layer conditioned on the first channel half
struct CouplingBlock {
    start: Conv1d,
    wn: WaveNet,
    end: Conv1d,
    half: usize,
    sigmoid_scale: bool,
}

impl CouplingBlock {
    fn reverse(&self, x: &Tensor) -> Result<Tensor> {
        let (x_0, x_1) = split_channels(x, self.half)?;
        let h = self.start.forward(&x_0)?;
        let h = self.wn.forward(&h)?;
        let out = self.end.forward(&h)?;

        let (m, logs) = split_channels(&out, self.half)?;
        let logs = if self.sigmoid_scale {
            (candle_nn::ops::sigmoid(&(logs + 2.0)?)? + 1e-6)?.log()?
        } else {
            logs
        };

        let z_1 = ((x_1 - m)? * logs.neg()?.exp()?)?;
        Ok(Tensor::cat(&[&x_0, &z_1], 1)?)
    }
}

/// Decoder hyperparameters
#[derive(Debug, Clone, Copy)]
pub struct FlowParams {
    pub in_channels: usize,
    pub hidden_channels: usize,
    pub kernel_size: usize,
    pub dilation_rate: usize,
    pub n_blocks: usize,
    pub n_layers: usize,
    pub n_split: usize,
    pub n_sqz: usize,
    pub sigmoid_scale: bool,
}

struct FlowBlock {
    actnorm: ActNorm,
    invconv: InvConvNear,
    coupling: CouplingBlock,
}

/// Stack of flow blocks run in reverse for synthesis
pub struct FlowDecoder {
    blocks: Vec<FlowBlock>,
    n_sqz: usize,
}

impl FlowDecoder {
    pub fn from_weights(weights: &Weights, prefix: &str, params: FlowParams) -> Result<Self> {
        let channels = params.in_channels * params.n_sqz;
        let mut blocks = Vec::with_capacity(params.n_blocks);
        for b in 0..params.n_blocks {
            let flow = |i: usize| format!("{}.flows.{}", prefix, 3 * b + i);
            let coupling = flow(2);
            blocks.push(FlowBlock {
                actnorm: ActNorm::from_weights(weights, &flow(0))?,
                invconv: InvConvNear::from_weights(weights, &flow(1), params.n_split)?,
                coupling: CouplingBlock {
                    start: Conv1d::from_weights(weights, &format!("{}.start", coupling), 1, 0, 1)?,
                    wn: WaveNet::from_weights(
                        weights,
                        &format!("{}.wn", coupling),
                        params.hidden_channels,
                        params.kernel_size,
                        params.dilation_rate,
                        params.n_layers,
                    )?,
                    end: Conv1d::from_weights(weights, &format!("{}.end", coupling), 1, 0, 1)?,
                    half: channels / 2,
                    sigmoid_scale: params.sigmoid_scale,
                },
            });
        }
        Ok(Self {
            blocks,
            n_sqz: params.n_sqz,
        })
    }

    pub fn new_random(params: FlowParams, device: &Device) -> Result<Self> {
        let channels = params.in_channels * params.n_sqz;
        let mut blocks = Vec::with_capacity(params.n_blocks);
        for _ in 0..params.n_blocks {
            blocks.push(FlowBlock {
                actnorm: ActNorm::new_random(channels, device)?,
                invconv: InvConvNear::new_random(params.n_split, device)?,
                coupling: CouplingBlock {
                    start: Conv1d::new_random(channels / 2, params.hidden_channels, 1, 1, 0, 1, device)?,
                    wn: WaveNet::new_random(
                        params.hidden_channels,
                        params.kernel_size,
                        params.dilation_rate,
                        params.n_layers,
                        device,
                    )?,
                    end: Conv1d::new_random(params.hidden_channels, channels, 1, 1, 0, 1, device)?,
                    half: channels / 2,
                    sigmoid_scale: params.sigmoid_scale,
                },
            });
        }
        Ok(Self {
            blocks,
            n_sqz: params.n_sqz,
        })
    }

    /// Map latents `[1, n_mels, frames]` to a mel spectrogram
    pub fn reverse(&self, z: &Tensor) -> Result<Tensor> {
        let mut x = squeeze(z, self.n_sqz)?;
        for block in self.blocks.iter().rev() {
            x = block.coupling.reverse(&x)?;
            x = block.invconv.reverse(&x)?;
            x = block.actnorm.reverse(&x)?;
        }
        unsqueeze(&x, self.n_sqz)
    }
}

/// `[b, c, t]` -> `[b, c * n, t / n]`, dropping trailing frames
pub fn squeeze(x: &Tensor, n_sqz: usize) -> Result<Tensor> {
    if n_sqz == 1 {
        return Ok(x.clone());
    }
    let (b, c, t) = x.dims3()?;
    let t = (t / n_sqz) * n_sqz;
    let x = x
        .narrow(2, 0, t)?
        .reshape((b, c, t / n_sqz, n_sqz))?
        .permute((0, 3, 1, 2))?
        .contiguous()?
        .reshape((b, c * n_sqz, t / n_sqz))?;
    Ok(x)
}

/// `[b, c, t]` -> `[b, c / n, t * n]`
pub fn unsqueeze(x: &Tensor, n_sqz: usize) -> Result<Tensor> {
    if n_sqz == 1 {
        return Ok(x.clone());
    }
    let (b, c, t) = x.dims3()?;
    let x = x
        .reshape((b, n_sqz, c / n_sqz, t))?
        .permute((0, 2, 3, 1))?
        .contiguous()?
        .reshape((b, c / n_sqz, t * n_sqz))?;
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squeeze_roundtrip() {
        let device = Device::Cpu;
        let x = Tensor::arange(0f32, 24.0, &device).unwrap().reshape((1, 2, 12)).unwrap();
        let sq = squeeze(&x, 2).unwrap();
        assert_eq!(sq.dims(), &[1, 4, 6]);
        let back = unsqueeze(&sq, 2).unwrap();
        let diff: f32 = (back - &x).unwrap().abs().unwrap().sum_all().unwrap().to_scalar().unwrap();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_squeeze_drops_odd_frame() {
        let device = Device::Cpu;
        let x = Tensor::zeros((1, 2, 7), DType::F32, &device).unwrap();
        assert_eq!(squeeze(&x, 2).unwrap().dims(), &[1, 4, 3]);
    }

    #[test]
    fn test_invert_matrix() {
        let device = Device::Cpu;
        let w = Tensor::new(&[[2.0f32, 1.0], [1.0, 1.0]], &device).unwrap();
        let inv: Vec<Vec<f32>> = invert_matrix(&w).unwrap().to_vec2().unwrap();
        assert!((inv[0][0] - 1.0).abs() < 1e-6);
        assert!((inv[0][1] + 1.0).abs() < 1e-6);
        assert!((inv[1][0] + 1.0).abs() < 1e-6);
        assert!((inv[1][1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let device = Device::Cpu;
        let w = Tensor::new(&[[1.0f32, 2.0], [2.0, 4.0]], &device).unwrap();
        assert!(invert_matrix(&w).is_err());
    }

    #[test]
    fn test_decoder_shape() {
        let device = Device::Cpu;
        let params = FlowParams {
            in_channels: 8,
            hidden_channels: 16,
            kernel_size: 5,
            dilation_rate: 1,
            n_blocks: 2,
            n_layers: 2,
            n_split: 4,
            n_sqz: 2,
            sigmoid_scale: false,
        };
        let decoder = FlowDecoder::new_random(params, &device).unwrap();
        let z = Tensor::randn(0.0f32, 1.0, (1, 8, 10), &device).unwrap();
        assert_eq!(decoder.reverse(&z).unwrap().dims(), &[1, 8, 10]);
    }
}
