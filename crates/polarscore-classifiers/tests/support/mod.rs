//! Shared fixtures for classifier integration tests
//!
//! Provides tiny on-disk BERT, DistilBERT and RoBERTa checkpoints plus mock loaders
//! for exercising the scoring pipeline without network access.

#![allow(dead_code)]

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use polarscore_classifiers::config::HubConfig;
use polarscore_classifiers::model_loader::tokenizer_from_vocab;
use polarscore_classifiers::{
    configure_tokenizer, EncoderSettings, LoadedModel, LoaderConfig, ModelInputs, ModelLoader,
    SequenceClassificationModel,
};
use polarscore_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokenizers::Tokenizer;

pub const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "the", "movie", "was", "great", "terrible",
    "okay", "very", "good", "bad", "plot", "acting", "i", "loved", "hated", "it", "not", ".",
];

const HIDDEN_SIZE: usize = 16;

/// Write `vocab.txt` into `dir`
pub fn write_vocab(dir: &Path) -> PathBuf {
    let path = dir.join("vocab.txt");
    std::fs::write(&path, VOCAB.join("\n")).unwrap();
    path
}

/// Loader configuration that never touches the network
pub fn offline_config() -> LoaderConfig {
    LoaderConfig {
        hub: HubConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A randomly initialised BERT sequence classifier small enough for tests
pub struct TinyBert {
    pub num_labels: usize,
    pub with_head: bool,
    pub max_positions: usize,
}

impl Default for TinyBert {
    fn default() -> Self {
        Self {
            num_labels: 3,
            with_head: true,
            max_positions: 64,
        }
    }
}

fn id2label(num_labels: usize) -> serde_json::Map<String, serde_json::Value> {
    (0..num_labels)
        .map(|idx| (idx.to_string(), serde_json::json!(format!("label_{}", idx))))
        .collect()
}

/// Write config.json and vocab.txt, then randomise and save every variable
/// `build` registers as model.safetensors
fn write_checkpoint(dir: &Path, config: &serde_json::Value, build: impl FnOnce(VarBuilder)) {
    std::fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(config).unwrap(),
    )
    .unwrap();
    write_vocab(dir);

    let varmap = VarMap::new();
    build(VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu));

    for var in varmap.all_vars() {
        let noise = Tensor::randn(0f32, 0.5, var.dims(), &Device::Cpu).unwrap();
        var.set(&noise).unwrap();
    }

    varmap.save(dir.join("model.safetensors")).unwrap();
}

impl TinyBert {
    pub fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "model_type": "bert",
            "vocab_size": VOCAB.len(),
            "hidden_size": HIDDEN_SIZE,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 32,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0,
            "attention_probs_dropout_prob": 0.0,
            "max_position_embeddings": self.max_positions,
            "type_vocab_size": 2,
            "initializer_range": 0.02,
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0,
            "position_embedding_type": "absolute",
            "use_cache": false,
            "classifier_dropout": null,
            "id2label": id2label(self.num_labels),
        })
    }

    /// Write config.json, vocab.txt and model.safetensors into `dir`
    pub fn write(&self, dir: &Path) {
        let config = self.config_json();
        let bert_config: BertConfig = serde_json::from_value(config.clone()).unwrap();

        write_checkpoint(dir, &config, |vb| {
            BertModel::load(vb.pp("bert"), &bert_config).unwrap();
            candle_nn::linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("bert").pp("pooler.dense")).unwrap();
            if self.with_head {
                candle_nn::linear(HIDDEN_SIZE, self.num_labels, vb.pp("classifier")).unwrap();
            }
        });
    }
}

/// A randomly initialised DistilBERT classifier with a pre-classifier layer
pub struct TinyDistilBert {
    pub num_labels: usize,
    pub max_positions: usize,
}

impl Default for TinyDistilBert {
    fn default() -> Self {
        Self {
            num_labels: 3,
            max_positions: 64,
        }
    }
}

impl TinyDistilBert {
    pub fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "model_type": "distilbert",
            "vocab_size": VOCAB.len(),
            "dim": HIDDEN_SIZE,
            "n_layers": 1,
            "n_heads": 2,
            "hidden_dim": 32,
            "activation": "gelu",
            "dropout": 0.0,
            "attention_dropout": 0.0,
            "max_position_embeddings": self.max_positions,
            "initializer_range": 0.02,
            "pad_token_id": 0,
            "position_embedding_type": "absolute",
            "use_cache": false,
            "id2label": id2label(self.num_labels),
        })
    }

    pub fn write(&self, dir: &Path) {
        let config = self.config_json();
        let distilbert_config: DistilBertConfig = serde_json::from_value(config.clone()).unwrap();

        write_checkpoint(dir, &config, |vb| {
            DistilBertModel::load(vb.pp("distilbert"), &distilbert_config).unwrap();
            candle_nn::linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("pre_classifier")).unwrap();
            candle_nn::linear(HIDDEN_SIZE, self.num_labels, vb.pp("classifier")).unwrap();
        });
    }
}

/// A randomly initialised RoBERTa classifier with its dense + out_proj head
pub struct TinyRoberta {
    pub num_labels: usize,
    pub max_positions: usize,
}

impl Default for TinyRoberta {
    fn default() -> Self {
        Self {
            num_labels: 3,
            max_positions: 64,
        }
    }
}

impl TinyRoberta {
    pub fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "model_type": "roberta",
            "vocab_size": VOCAB.len(),
            "hidden_size": HIDDEN_SIZE,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 32,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0,
            "attention_probs_dropout_prob": 0.0,
            "max_position_embeddings": self.max_positions,
            "type_vocab_size": 1,
            "layer_norm_eps": 1e-5,
            "pad_token_id": 0,
            "position_embedding_type": "absolute",
            "id2label": id2label(self.num_labels),
        })
    }

    /// Variables land under `roberta.` and `classifier.{dense,out_proj}`
    pub fn write(&self, dir: &Path) {
        let config = self.config_json();
        let roberta_config: XlmRobertaConfig = serde_json::from_value(config.clone()).unwrap();

        write_checkpoint(dir, &config, |vb| {
            XLMRobertaForSequenceClassification::new(self.num_labels, &roberta_config, vb)
                .unwrap();
        });
    }
}

/// Create a temporary directory holding a tiny BERT checkpoint
pub fn tiny_bert_dir(fixture: TinyBert) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fixture.write(dir.path());
    dir
}

pub fn tiny_distilbert_dir(fixture: TinyDistilBert) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fixture.write(dir.path());
    dir
}

pub fn tiny_roberta_dir(fixture: TinyRoberta) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fixture.write(dir.path());
    dir
}

/// A model that returns the same logits for every input
pub struct FixedLogitsModel {
    logits: Vec<f32>,
    device: Device,
}

impl FixedLogitsModel {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            logits,
            device: Device::Cpu,
        }
    }
}

impl SequenceClassificationModel for FixedLogitsModel {
    fn num_labels(&self) -> usize {
        self.logits.len()
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn logits(&self, _inputs: &ModelInputs) -> candle_core::Result<Tensor> {
        Tensor::new(self.logits.as_slice(), &self.device)?.unsqueeze(0)
    }
}

/// Build a configured WordPiece tokenizer over [`VOCAB`]
pub fn test_tokenizer(max_length: usize, pad_to_multiple_of: Option<usize>) -> Tokenizer {
    let dir = tempfile::tempdir().unwrap();
    let mut tokenizer = tokenizer_from_vocab(&write_vocab(dir.path())).unwrap();
    configure_tokenizer(
        &mut tokenizer,
        &EncoderSettings {
            max_length,
            pad_to_multiple_of,
            pad_id: 0,
            pad_token: "[PAD]".to_string(),
        },
    )
    .unwrap();
    tokenizer
}

/// A loader that counts calls and serves fixed-logit models
pub struct CountingLoader {
    logits: Vec<f32>,
    known_path: String,
    calls: AtomicU32,
}

impl CountingLoader {
    pub fn new(known_path: &str, logits: Vec<f32>) -> Self {
        Self {
            logits,
            known_path: known_path.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    /// Get the number of times load was called
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelLoader for CountingLoader {
    fn load(&self, path: &str) -> Result<Arc<LoadedModel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for concurrent loads
        std::thread::sleep(std::time::Duration::from_millis(20));

        if path != self.known_path {
            return Err(Error::model_not_found(format!("unknown model '{}'", path)));
        }

        Ok(Arc::new(LoadedModel::new(
            path,
            test_tokenizer(32, None),
            Box::new(FixedLogitsModel::new(self.logits.clone())),
        )))
    }
}
