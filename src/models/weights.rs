//! Checkpoint loading utilities
//!
//! Loads model weights from `.safetensors` files or PyTorch `.pth`
//! checkpoints, converts them to f32 on the target device, and folds weight
//! normalization (weight_g, weight_v -> weight).

use anyhow::{Context, Result};
use candle_core::{pickle, safetensors, DType, Device, Tensor};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Named tensors of a loaded checkpoint
pub type Weights = HashMap<String, Tensor>;

/// Load a checkpoint and fold its weight normalization
///
/// `key` selects the state dict inside a PyTorch checkpoint (`"model"` for
/// Glow-TTS, `"generator"` for HiFi-GAN); it is ignored for safetensors.
pub fn load_checkpoint<P: AsRef<Path>>(path: P, key: Option<&str>, device: &Device) -> Result<Weights> {
    let path = path.as_ref();
    tracing::info!("Loading weights from {:?}", path);

    let is_safetensors = path.extension().is_some_and(|ext| ext == "safetensors");
    let raw: Weights = if is_safetensors {
        safetensors::load(path, &Device::Cpu)
            .with_context(|| format!("Failed to load safetensors from {:?}", path))?
    } else {
        pickle::read_all_with_key(path, key)
            .with_context(|| format!("Failed to load PyTorch checkpoint from {:?}", path))?
            .into_iter()
            .collect()
    };

    let mut tensors = HashMap::with_capacity(raw.len());
    for (name, tensor) in raw {
        let tensor = tensor.to_dtype(DType::F32)?.to_device(device)?;
        tensors.insert(name, tensor);
    }

    tracing::info!("Loaded {} tensors", tensors.len());

    let converted = fold_weight_norm(tensors)?;
    tracing::debug!("Converted to {} tensors", converted.len());
    Ok(converted)
}

/// Replace every `weight_g`/`weight_v` pair with the effective `weight`
pub fn fold_weight_norm(tensors: Weights) -> Result<Weights> {
    let mut converted = HashMap::new();
    let mut processed = HashSet::new();

    for (name, tensor) in tensors.iter() {
        if processed.contains(name) {
            continue;
        }

        if let Some(base_name) = name.strip_suffix(".weight_v") {
            let g_name = format!("{}.weight_g", base_name);

            if let Some(weight_g) = tensors.get(&g_name) {
                let weight = apply_weight_norm(weight_g, tensor)?;
                converted.insert(format!("{}.weight", base_name), weight);
                processed.insert(g_name);
            } else {
                converted.insert(format!("{}.weight", base_name), tensor.clone());
            }
            processed.insert(name.clone());
        } else if name.ends_with(".weight_g") {
            // handled with weight_v
            continue;
        } else {
            converted.insert(name.clone(), tensor.clone());
            processed.insert(name.clone());
        }
    }

    Ok(converted)
}

/// Apply weight normalization: weight = g * (v / ||v||)
///
/// The norm is taken over every dimension except the first, which is how
/// PyTorch's `weight_norm` (dim 0) parametrizes both convolutions and
/// transposed convolutions.
fn apply_weight_norm(weight_g: &Tensor, weight_v: &Tensor) -> Result<Tensor> {
    let v_flat = weight_v.flatten_from(1)?;
    let norm = v_flat.sqr()?.sum_keepdim(1)?.sqrt()?;

    // weight_g is [out, 1, 1] for convolutions
    let norm = norm.reshape(weight_g.shape())?;
    let norm = norm.clamp(1e-12, f64::MAX)?;

    let v_normalized = weight_v.broadcast_div(&norm)?;
    weight_g.broadcast_mul(&v_normalized).map_err(Into::into)
}

/// Get a required tensor by name
pub fn get_tensor(weights: &Weights, name: &str) -> Result<Tensor> {
    weights
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Tensor not found: {}", name))
}

/// Newest checkpoint in a directory, picked by the step number in its name
///
/// Matches `{prefix}*.pth` files such as `G_120000.pth` or `g_00400000`;
/// a `model.safetensors` file takes precedence when present.
pub fn latest_checkpoint<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<std::path::PathBuf> {
    let dir = dir.as_ref();
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(safetensors);
    }

    let mut best: Option<(u64, std::path::PathBuf)> = None;
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
        let Ok(step) = digits.parse::<u64>() else {
            continue;
        };
        if best.as_ref().map_or(true, |(best_step, _)| step > *best_step) {
            best = Some((step, path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or_else(|| anyhow::anyhow!("No '{}' checkpoint found in {:?}", prefix, dir))
}
