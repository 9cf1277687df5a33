//! Model registry keyed by language and gender
//!
//! Every entry pairs a mel generator with a vocoder. Entries are either
//! listed explicitly in the server configuration or discovered from a
//! models directory laid out as:
//!
//! ```text
//! <root>/<language>/<gender>/glow/   config.json + checkpoint
//! <root>/<language>/<gender>/hifi/   config.json + checkpoint
//! ```

use candle_core::Device;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::traits::ModelPair;
use crate::core::error::{Result, TtsError};
use crate::models::glow_tts::{DEFAULT_LENGTH_SCALE, DEFAULT_NOISE_SCALE};
use crate::models::{GlowTts, HiFiGan};

/// Location of one model pair on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub language: String,
    pub gender: String,
    /// Glow-TTS model directory
    pub glow: PathBuf,
    /// HiFi-GAN model directory
    pub hifi: PathBuf,
}

/// Sampling settings applied to every loaded mel generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub noise_scale: f64,
    pub length_scale: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            noise_scale: DEFAULT_NOISE_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
        }
    }
}

/// Registry key for a language and gender
pub fn model_key(language: &str, gender: &str) -> String {
    format!("{}_{}", language.trim(), gender.trim()).to_lowercase()
}

/// Registry of loaded model pairs
pub struct ModelRegistry {
    models: RwLock<HashMap<String, ModelPair>>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Register a model pair, replacing any previous entry
    pub fn insert(&self, language: &str, gender: &str, pair: ModelPair) -> Result<()> {
        let key = model_key(language, gender);
        tracing::info!("Registered model {} ({} + {})", key, pair.mel.name(), pair.vocoder.name());

        self.models.write().map_err(|_| TtsError::Internal {
            message: "Failed to acquire write lock on models".to_string(),
            location: Some("ModelRegistry::insert".to_string()),
        })?.insert(key, pair);

        Ok(())
    }

    /// Look up the model pair for a language and gender
    pub fn get(&self, language: &str, gender: &str) -> Result<ModelPair> {
        let models = self.models.read().map_err(|_| TtsError::Internal {
            message: "Failed to acquire read lock on models".to_string(),
            location: Some("ModelRegistry::get".to_string()),
        })?;

        models
            .get(&model_key(language, gender))
            .cloned()
            .ok_or_else(|| TtsError::ModelNotFound {
                language: language.to_string(),
                gender: gender.to_string(),
            })
    }

    /// Check if a model pair is registered
    pub fn contains(&self, language: &str, gender: &str) -> bool {
        self.models
            .read()
            .map(|models| models.contains_key(&model_key(language, gender)))
            .unwrap_or(false)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .models
            .read()
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.models.read().map(|models| models.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load explicit entries and everything discovered under `models_dir`
    ///
    /// Explicit entries must load. Discovered entries that fail to load are
    /// skipped with a warning, and never override an explicit entry. A
    /// missing models directory is not an error.
    pub fn load(
        explicit: &[ModelSpec],
        models_dir: Option<&Path>,
        device: &Device,
        options: LoadOptions,
    ) -> Result<Self> {
        let registry = Self::new();

        for spec in explicit {
            let pair = load_pair(spec, device, options)?;
            registry.insert(&spec.language, &spec.gender, pair)?;
        }

        if let Some(root) = models_dir.filter(|root| {
            let exists = root.is_dir();
            if !exists {
                tracing::warn!("Models directory {:?} not found", root);
            }
            exists
        }) {
            for spec in discover(root)? {
                if registry.contains(&spec.language, &spec.gender) {
                    continue;
                }
                match load_pair(&spec, device, options) {
                    Ok(pair) => registry.insert(&spec.language, &spec.gender, pair)?,
                    Err(e) => tracing::warn!(
                        "Skipping model {}: {}",
                        model_key(&spec.language, &spec.gender),
                        e
                    ),
                }
            }
        }

        tracing::info!("Model registry ready with {} model(s)", registry.len());
        Ok(registry)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the Glow-TTS and HiFi-GAN models of one entry
pub fn load_pair(spec: &ModelSpec, device: &Device, options: LoadOptions) -> Result<ModelPair> {
    tracing::info!(
        "Loading {} from {:?} and {:?}",
        model_key(&spec.language, &spec.gender),
        spec.glow,
        spec.hifi
    );

    let glow = GlowTts::load(&spec.glow, device)
        .map_err(|e| TtsError::ModelLoad {
            message: format!("{:#}", e),
            component: "glow-tts".to_string(),
            path: Some(spec.glow.clone()),
        })?
        .with_scales(options.noise_scale, options.length_scale);

    let hifi = HiFiGan::load(&spec.hifi, device).map_err(|e| TtsError::ModelLoad {
        message: format!("{:#}", e),
        component: "hifi-gan".to_string(),
        path: Some(spec.hifi.clone()),
    })?;

    Ok(ModelPair::new(Arc::new(glow), Arc::new(hifi)))
}

/// Find `<language>/<gender>/{glow,hifi}` directories under `root`
///
/// Entries missing either model directory are ignored. The result is sorted
/// by key so loading order is stable.
pub fn discover(root: &Path) -> Result<Vec<ModelSpec>> {
    let mut specs = Vec::new();

    for language in sorted_subdirs(root)? {
        for gender in sorted_subdirs(&language)? {
            let glow = gender.join("glow");
            let hifi = gender.join("hifi");
            if !glow.is_dir() || !hifi.is_dir() {
                tracing::debug!("Ignoring {:?}: missing glow or hifi directory", gender);
                continue;
            }
            specs.push(ModelSpec {
                language: dir_name(&language),
                gender: dir_name(&gender),
                glow,
                hifi,
            });
        }
    }

    Ok(specs)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TtsError::Io {
        message: e.to_string(),
        path: Some(dir.to_path_buf()),
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Pick the compute device by name
pub fn select_device(name: &str) -> Result<Device> {
    match name.trim().to_lowercase().as_str() {
        "" | "cpu" => Ok(Device::Cpu),
        "cuda" | "gpu" => Device::cuda_if_available(0).map_err(TtsError::from),
        "metal" => Device::new_metal(0).map_err(TtsError::from),
        other => Err(TtsError::Config {
            message: format!("Unknown device '{}', expected cpu, cuda or metal", other),
            path: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::{MelGenerator, Vocoder};
    use candle_core::Tensor;

    struct StubMel;

    impl MelGenerator for StubMel {
        fn name(&self) -> &str {
            "stub-mel"
        }

        fn generate_mel(&self, _text: &str) -> Result<Tensor> {
            Ok(Tensor::zeros((1, 4, 2), candle_core::DType::F32, &Device::Cpu)?)
        }
    }

    struct StubVocoder;

    impl Vocoder for StubVocoder {
        fn name(&self) -> &str {
            "stub-vocoder"
        }

        fn generate_wav(&self, _mel: &Tensor) -> Result<(Vec<i16>, u32)> {
            Ok((vec![0; 4], 16000))
        }

        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    fn stub_pair() -> ModelPair {
        ModelPair::new(Arc::new(StubMel), Arc::new(StubVocoder))
    }

    #[test]
    fn test_model_key() {
        assert_eq!(model_key("hi", "female"), "hi_female");
        assert_eq!(model_key(" HI ", "Male"), "hi_male");
    }

    #[test]
    fn test_registry_insert_and_get() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());
        registry.insert("hi", "female", stub_pair()).unwrap();

        assert!(registry.contains("HI", "Female"));
        assert_eq!(registry.keys(), vec!["hi_female".to_string()]);
        let pair = registry.get("hi", "female").unwrap();
        assert_eq!(pair.synthesize("x").unwrap(), (vec![0; 4], 16000));
    }

    #[test]
    fn test_missing_model() {
        let registry = ModelRegistry::new();
        let err = registry.get("ta", "male").unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound { .. }));
        assert_eq!(err.to_string(), "Requested model not found");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_discover_layout() {
        let root = tempfile::tempdir().unwrap();
        for (lang, gender) in [("hi", "female"), ("hi", "male"), ("ta", "female")] {
            std::fs::create_dir_all(root.path().join(lang).join(gender).join("glow")).unwrap();
            std::fs::create_dir_all(root.path().join(lang).join(gender).join("hifi")).unwrap();
        }
        // no vocoder directory
        std::fs::create_dir_all(root.path().join("bn").join("male").join("glow")).unwrap();
        std::fs::write(root.path().join("README.txt"), "models").unwrap();

        let specs = discover(root.path()).unwrap();
        let keys: Vec<String> = specs.iter().map(|s| model_key(&s.language, &s.gender)).collect();
        assert_eq!(keys, vec!["hi_female", "hi_male", "ta_female"]);
        assert_eq!(specs[0].glow, root.path().join("hi").join("female").join("glow"));
    }

    #[test]
    fn test_discovered_broken_models_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("hi").join("female").join("glow")).unwrap();
        std::fs::create_dir_all(root.path().join("hi").join("female").join("hifi")).unwrap();

        let registry =
            ModelRegistry::load(&[], Some(root.path()), &Device::Cpu, LoadOptions::default()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_explicit_broken_model_fails() {
        let root = tempfile::tempdir().unwrap();
        let spec = ModelSpec {
            language: "hi".to_string(),
            gender: "female".to_string(),
            glow: root.path().join("glow"),
            hifi: root.path().join("hifi"),
        };
        let err = ModelRegistry::load(&[spec], None, &Device::Cpu, LoadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, TtsError::ModelLoad { .. }));
    }

    #[test]
    fn test_select_device() {
        assert!(matches!(select_device("cpu").unwrap(), Device::Cpu));
        assert!(matches!(select_device("").unwrap(), Device::Cpu));
        assert!(select_device("tpu").is_err());
    }
}
