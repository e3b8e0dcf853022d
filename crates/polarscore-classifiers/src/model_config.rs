//! Summary of a Hugging Face `config.json`
//!
//! Only the fields needed to pick an architecture and validate the
//! classification head are read here; the architecture-specific config is
//! parsed again by the Candle model that consumes it.

use polarscore_core::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Supported sequence-classification architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Bert,
    DistilBert,
    Roberta,
    XlmRoberta,
}

impl ModelType {
    fn from_model_type(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace('_', "-").as_str() {
            "bert" => Some(Self::Bert),
            "distilbert" => Some(Self::DistilBert),
            "roberta" => Some(Self::Roberta),
            "xlm-roberta" => Some(Self::XlmRoberta),
            _ => None,
        }
    }

    /// Positions reserved by the embedding layer before the first token
    fn position_offset(self) -> usize {
        match self {
            // RoBERTa-family position ids start after the padding index
            Self::Roberta | Self::XlmRoberta => 2,
            Self::Bert | Self::DistilBert => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::DistilBert => "distilbert",
            Self::Roberta => "roberta",
            Self::XlmRoberta => "xlm-roberta",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    num_labels: Option<usize>,
    #[serde(default)]
    id2label: Option<BTreeMap<String, String>>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
    #[serde(default)]
    pad_token_id: Option<u32>,
    #[serde(default)]
    hidden_size: Option<usize>,
    // DistilBERT names its hidden width `dim`
    #[serde(default)]
    dim: Option<usize>,
}

/// Architecture facts read from `config.json`
#[derive(Debug, Clone)]
pub struct ArchitectureInfo {
    pub model_type: ModelType,
    /// Width of the classification head
    pub num_labels: usize,
    /// Class names in head order
    pub labels: Vec<String>,
    pub hidden_size: usize,
    /// Longest token sequence the position embeddings accept
    pub max_positions: Option<usize>,
    pub pad_token_id: Option<u32>,
    /// Raw file contents, reparsed by the architecture-specific loader
    pub raw: String,
}

impl ArchitectureInfo {
    /// Read and summarise `config.json`
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::model_not_found(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::parse(raw)
    }

    /// Summarise `config.json` contents
    pub fn parse(raw: String) -> Result<Self> {
        let config: RawConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::model_format(format!("Failed to parse config.json: {}", e)))?;

        let declared = config
            .model_type
            .as_deref()
            .ok_or_else(|| Error::model_format("config.json has no model_type"))?;
        let model_type = ModelType::from_model_type(declared).ok_or_else(|| {
            Error::model_format(format!(
                "Unsupported model_type '{}' (expected bert, distilbert, roberta or xlm-roberta)",
                declared
            ))
        })?;

        let labels = match &config.id2label {
            Some(id2label) => ordered_labels(id2label)?,
            None => Vec::new(),
        };

        // Transformers defaults to two labels when the config names none
        let num_labels = if labels.is_empty() {
            config.num_labels.unwrap_or(2)
        } else {
            labels.len()
        };

        let hidden_size = config
            .hidden_size
            .or(config.dim)
            .ok_or_else(|| Error::model_format("config.json has no hidden_size"))?;

        let max_positions = config
            .max_position_embeddings
            .map(|n| n.saturating_sub(model_type.position_offset()));

        Ok(Self {
            model_type,
            num_labels,
            labels,
            hidden_size,
            max_positions,
            pad_token_id: config.pad_token_id,
            raw,
        })
    }

    /// Fail unless the head produces exactly `expected` classes
    pub fn ensure_num_labels(&self, expected: usize) -> Result<()> {
        if self.num_labels != expected {
            return Err(Error::model_format(format!(
                "Model has {} output classes but {} score weights are configured",
                self.num_labels, expected
            )));
        }
        Ok(())
    }
}

fn ordered_labels(id2label: &BTreeMap<String, String>) -> Result<Vec<String>> {
    let mut indexed = id2label
        .iter()
        .map(|(idx, label)| {
            idx.parse::<usize>()
                .map(|idx| (idx, label.clone()))
                .map_err(|_| Error::model_format(format!("Invalid id2label key '{}'", idx)))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(idx, _)| *idx);

    for (expected, (idx, _)) in indexed.iter().enumerate() {
        if *idx != expected {
            return Err(Error::model_format(format!(
                "id2label is not contiguous: missing index {}",
                expected
            )));
        }
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}
