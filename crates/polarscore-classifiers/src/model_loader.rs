//! Model loading for Candle-based sequence classifiers
//!
//! A model path resolves either to a local directory or, when hub access is
//! enabled, to a Hugging Face repository id (`org/name` or `org/name@rev`).
//! Every call to [`HfModelLoader::load`] reads the artifact afresh.

use crate::architectures::{build_model, error_summary, SequenceClassificationModel};
use crate::config::{DeviceType, LoaderConfig};
use crate::encoder::{configure_tokenizer, EncoderSettings};
use crate::model_config::ArchitectureInfo;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use polarscore_core::{Error, Result, DEFAULT_FIELD_VALUE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::Tokenizer;

/// Source of model artifacts
///
/// Implementations decide how a path string becomes a tokenizer and model.
pub trait ModelLoader: Send + Sync {
    /// Load the tokenizer and classifier that `path` names
    fn load(&self, path: &str) -> Result<Arc<LoadedModel>>;

    /// Drop any retained models, returning how many were released
    fn clear(&self) -> usize {
        0
    }
}

/// Tokenizer and classifier bound to one model path
pub struct LoadedModel {
    path: String,
    tokenizer: Tokenizer,
    model: Box<dyn SequenceClassificationModel>,
}

impl LoadedModel {
    pub fn new(
        path: impl Into<String>,
        tokenizer: Tokenizer,
        model: Box<dyn SequenceClassificationModel>,
    ) -> Self {
        Self {
            path: path.into(),
            tokenizer,
            model,
        }
    }

    /// The path this model was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn model(&self) -> &dyn SequenceClassificationModel {
        self.model.as_ref()
    }
}

/// Weight file formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    /// SafeTensors format (memory-mapped)
    SafeTensors(PathBuf),
    /// PyTorch pickle format
    PyTorch(PathBuf),
}

/// Tokenizer definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFile {
    /// Serialized `tokenizers` pipeline
    Json(PathBuf),
    /// WordPiece vocabulary for a BERT-style tokenizer
    Vocab(PathBuf),
}

/// Files making up one model artifact
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub config: PathBuf,
    pub weights: WeightsFile,
    pub tokenizer: TokenizerFile,
}

/// Loads Hugging Face style artifacts from disk or the hub
pub struct HfModelLoader {
    config: LoaderConfig,
    device: Device,
    expected_labels: usize,
}

impl HfModelLoader {
    /// Create a loader that accepts models with `expected_labels` classes
    pub fn new(config: LoaderConfig, expected_labels: usize) -> Result<Self> {
        config.validate()?;
        let device = config.device.parse::<DeviceType>()?.create()?;

        Ok(Self {
            config,
            device,
            expected_labels,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Map a path string to the files of a model artifact
    pub fn resolve(&self, path: &str) -> Result<ResolvedArtifact> {
        if path == DEFAULT_FIELD_VALUE {
            return Err(Error::model_not_found(
                "no model path given and no default model_path configured",
            ));
        }

        let local = Path::new(path);
        if local.is_dir() {
            tracing::debug!("Resolving model from local directory {}", local.display());
            return resolve_local(local);
        }

        if self.config.hub.enabled && is_hub_repo_id(path) {
            return self.resolve_hub(path);
        }

        Err(Error::model_not_found(format!(
            "'{}' is not a model directory{}",
            path,
            if self.config.hub.enabled {
                " or a hub repository id"
            } else {
                " (hub resolution disabled)"
            }
        )))
    }

    fn resolve_hub(&self, path: &str) -> Result<ResolvedArtifact> {
        let (repo_id, revision) = match path.split_once('@') {
            Some((repo_id, revision)) => (repo_id, revision.to_string()),
            None => (path, self.config.hub.revision.clone()),
        };

        tracing::info!("Resolving model from HuggingFace: {} @ {}", repo_id, revision);

        let api = ApiBuilder::new()
            .with_progress(false)
            .with_cache_dir(self.config.hub.resolved_cache_dir())
            .build()
            .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))?;
        let repo = api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            revision,
        ));

        let config = repo.get("config.json").map_err(|e| {
            Error::model_not_found(format!("Failed to fetch config.json for '{}': {}", path, e))
        })?;

        let weights = if let Ok(file) = repo.get("model.safetensors") {
            WeightsFile::SafeTensors(file)
        } else if let Ok(file) = repo.get("pytorch_model.bin") {
            WeightsFile::PyTorch(file)
        } else {
            return Err(Error::model_not_found(format!(
                "No model weights for '{}' (tried model.safetensors, pytorch_model.bin)",
                path
            )));
        };

        let tokenizer = if let Ok(file) = repo.get("tokenizer.json") {
            TokenizerFile::Json(file)
        } else if let Ok(file) = repo.get("vocab.txt") {
            TokenizerFile::Vocab(file)
        } else {
            return Err(Error::model_not_found(format!(
                "No tokenizer for '{}' (tried tokenizer.json, vocab.txt)",
                path
            )));
        };

        Ok(ResolvedArtifact {
            config,
            weights,
            tokenizer,
        })
    }

    fn load_fresh(&self, path: &str) -> Result<LoadedModel> {
        let start = Instant::now();
        tracing::info!("Loading model '{}'", path);

        let artifact = self.resolve(path)?;

        let info = ArchitectureInfo::from_file(&artifact.config)?;
        info.ensure_num_labels(self.expected_labels)?;

        let mut tokenizer = load_tokenizer(&artifact.tokenizer)?;
        let settings = self.encoder_settings(&info, &tokenizer);
        configure_tokenizer(&mut tokenizer, &settings)?;

        let vb = load_var_builder(&artifact.weights, &self.device)?;
        let model = build_model(&info, vb, self.device.clone())?;

        tracing::info!(
            "Loaded model '{}' ({}, max_length={}) in {:?}",
            path,
            info.model_type.as_str(),
            settings.max_length,
            start.elapsed()
        );
        metrics::counter!("polarscore_model_loads_total", "model_type" => info.model_type.as_str())
            .increment(1);

        Ok(LoadedModel::new(path, tokenizer, model))
    }

    fn encoder_settings(&self, info: &ArchitectureInfo, tokenizer: &Tokenizer) -> EncoderSettings {
        let mut max_length = match info.max_positions {
            Some(limit) if limit > 0 => self.config.max_length.min(limit),
            _ => self.config.max_length,
        };

        // Padding rounds up, so the truncation bound must already be a multiple
        let pad_to_multiple_of = match self.config.pad_to_multiple_of {
            Some(multiple) if multiple > max_length => {
                tracing::warn!(
                    "pad_to_multiple_of={} exceeds the {} token limit, padding to sequence length",
                    multiple,
                    max_length
                );
                None
            }
            Some(multiple) => {
                max_length -= max_length % multiple;
                Some(multiple)
            }
            None => None,
        };

        let pad_id = info
            .pad_token_id
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);
        let pad_token = tokenizer
            .id_to_token(pad_id)
            .unwrap_or_else(|| "[PAD]".to_string());

        EncoderSettings {
            max_length,
            pad_to_multiple_of,
            pad_id,
            pad_token,
        }
    }
}

impl ModelLoader for HfModelLoader {
    fn load(&self, path: &str) -> Result<Arc<LoadedModel>> {
        self.load_fresh(path).map(Arc::new)
    }
}

fn resolve_local(dir: &Path) -> Result<ResolvedArtifact> {
    let config = dir.join("config.json");
    if !config.is_file() {
        return Err(Error::model_not_found(format!(
            "config.json not found in {}",
            dir.display()
        )));
    }

    let safetensors = dir.join("model.safetensors");
    let pytorch = dir.join("pytorch_model.bin");
    let weights = if safetensors.is_file() {
        WeightsFile::SafeTensors(safetensors)
    } else if pytorch.is_file() {
        WeightsFile::PyTorch(pytorch)
    } else {
        return Err(Error::model_not_found(format!(
            "No model weights in {} (tried model.safetensors, pytorch_model.bin)",
            dir.display()
        )));
    };

    let tokenizer_json = dir.join("tokenizer.json");
    let vocab = dir.join("vocab.txt");
    let tokenizer = if tokenizer_json.is_file() {
        TokenizerFile::Json(tokenizer_json)
    } else if vocab.is_file() {
        TokenizerFile::Vocab(vocab)
    } else {
        return Err(Error::model_not_found(format!(
            "No tokenizer in {} (tried tokenizer.json, vocab.txt)",
            dir.display()
        )));
    };

    Ok(ResolvedArtifact {
        config,
        weights,
        tokenizer,
    })
}

/// Whether `path` looks like `name`, `org/name` or either with `@revision`
pub fn is_hub_repo_id(path: &str) -> bool {
    let repo_id = path.split_once('@').map_or(path, |(id, _)| id);
    if repo_id.is_empty() || repo_id.len() > 96 || repo_id.contains("..") {
        return false;
    }

    let parts: Vec<&str> = repo_id.split('/').collect();
    if parts.len() > 2 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && !part.starts_with(['.', '-'])
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

fn load_var_builder(weights: &WeightsFile, device: &Device) -> Result<VarBuilder<'static>> {
    match weights {
        WeightsFile::SafeTensors(path) => {
            // SAFETY: the file is not modified while the model is alive
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
                .map_err(|e| weights_error("Failed to load SafeTensors weights", e))
        }
        WeightsFile::PyTorch(path) => VarBuilder::from_pth(path, DType::F32, device)
            .map_err(|e| weights_error("Failed to load PyTorch weights", e)),
    }
}

fn weights_error(context: &str, err: candle_core::Error) -> Error {
    tracing::warn!("{}: {}", context, err);
    Error::model_format(format!("{}: {}", context, error_summary(&err)))
}

/// Load a tokenizer from `tokenizer.json` or a WordPiece `vocab.txt`
pub fn load_tokenizer(file: &TokenizerFile) -> Result<Tokenizer> {
    match file {
        TokenizerFile::Json(path) => {
            tracing::debug!("Loading tokenizer from {}", path.display());
            Tokenizer::from_file(path).map_err(|e| {
                Error::model_format(format!("Failed to load tokenizer.json: {}", e))
            })
        }
        TokenizerFile::Vocab(path) => tokenizer_from_vocab(path),
    }
}

/// Build a BERT WordPiece tokenizer from a vocabulary file
pub fn tokenizer_from_vocab(vocab_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    tracing::debug!("Building tokenizer from {}", vocab_path.display());

    let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| Error::model_format(format!("Failed to build WordPiece model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::default()));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

    let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
    let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);
    tokenizer.with_post_processor(Some(BertProcessing::new(
        ("[SEP]".to_string(), sep_id),
        ("[CLS]".to_string(), cls_id),
    )));

    Ok(tokenizer)
}
