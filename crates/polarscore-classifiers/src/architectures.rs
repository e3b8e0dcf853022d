//! Sequence-classification heads over Candle transformer backbones

use crate::model_config::{ArchitectureInfo, ModelType};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use polarscore_core::{Error, Result};
use serde::de::DeserializeOwned;

/// Batched model inputs, each of shape `(1, seq_len)`
pub struct ModelInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// A model that maps one encoded sequence to per-class logits
///
/// Implementations hold no mutable state; a forward pass never updates
/// parameters.
pub trait SequenceClassificationModel: Send + Sync {
    /// Width of the classification head
    fn num_labels(&self) -> usize;

    /// Device the weights live on
    fn device(&self) -> &Device;

    /// Logits of shape `(1, num_labels)`
    fn logits(&self, inputs: &ModelInputs) -> candle_core::Result<Tensor>;
}

/// Build the classifier matching `info.model_type` from loaded weights
pub fn build_model(
    info: &ArchitectureInfo,
    vb: VarBuilder<'static>,
    device: Device,
) -> Result<Box<dyn SequenceClassificationModel>> {
    let model: Box<dyn SequenceClassificationModel> = match info.model_type {
        ModelType::Bert => Box::new(BertClassifier::load(info, vb, device)?),
        ModelType::DistilBert => Box::new(DistilBertClassifier::load(info, vb, device)?),
        ModelType::Roberta | ModelType::XlmRoberta => {
            Box::new(RobertaClassifier::load(info, vb, device)?)
        }
    };

    tracing::info!(
        "Built {} classifier with {} labels: {:?}",
        info.model_type.as_str(),
        info.num_labels,
        info.labels
    );

    Ok(model)
}

fn parse_config<T: DeserializeOwned>(info: &ArchitectureInfo) -> Result<T> {
    serde_json::from_str(&info.raw).map_err(|e| {
        Error::model_format(format!(
            "Failed to parse {} config: {}",
            info.model_type.as_str(),
            e
        ))
    })
}

fn prefixed(vb: &VarBuilder<'static>, prefix: &str) -> VarBuilder<'static> {
    if prefix.is_empty() {
        vb.clone()
    } else {
        vb.pp(prefix)
    }
}

fn display_prefix(prefix: &str) -> &str {
    if prefix.is_empty() {
        "<root>"
    } else {
        prefix
    }
}

/// Load the `classifier` linear layer, refusing to invent weights
fn load_head(
    vb: &VarBuilder<'static>,
    in_dim: usize,
    num_labels: usize,
) -> Result<Linear> {
    candle_nn::linear(in_dim, num_labels, vb.pp("classifier")).map_err(|e| {
        tracing::debug!("Classification head lookup failed: {}", e);
        Error::model_format(format!(
            "No compatible classification head (expected {}x{}): {}",
            num_labels,
            in_dim,
            error_summary(&e)
        ))
    })
}

/// First line of a candle error
///
/// Candle appends a captured backtrace to its message when `RUST_BACKTRACE`
/// is set; that text belongs in logs, not in error responses.
pub(crate) fn error_summary(err: &candle_core::Error) -> String {
    err.to_string()
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end()
        .to_string()
}

/// BERT encoder, tanh pooler and linear head
pub struct BertClassifier {
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
    num_labels: usize,
}

impl BertClassifier {
    fn load(info: &ArchitectureInfo, vb: VarBuilder<'static>, device: Device) -> Result<Self> {
        let config: BertConfig = parse_config(info)?;
        let mut errors = Vec::new();

        for prefix in ["bert", ""] {
            let vb_prefix = prefixed(&vb, prefix);
            match BertModel::load(vb_prefix.clone(), &config) {
                Ok(model) => {
                    tracing::debug!("Loaded BERT backbone from '{}'", display_prefix(prefix));

                    let pooler =
                        candle_nn::linear(info.hidden_size, info.hidden_size, vb_prefix.pp("pooler.dense"))
                            .ok();
                    if pooler.is_none() {
                        tracing::warn!("Checkpoint has no BERT pooler, classifying the raw [CLS] state");
                    }

                    let classifier = load_head(&vb, info.hidden_size, info.num_labels)?;

                    return Ok(Self {
                        model,
                        pooler,
                        classifier,
                        device,
                        num_labels: info.num_labels,
                    });
                }
                Err(e) => {
                    tracing::debug!("Prefix '{}' did not load: {}", display_prefix(prefix), e);
                    errors.push(format!("{}: {}", display_prefix(prefix), error_summary(&e)));
                }
            }
        }

        Err(Error::model_format(format!(
            "Failed to load BERT backbone with tried prefixes [{}]",
            errors.join(" | ")
        )))
    }
}

impl SequenceClassificationModel for BertClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn logits(&self, inputs: &ModelInputs) -> candle_core::Result<Tensor> {
        let hidden_states = self.model.forward(
            &inputs.input_ids,
            &inputs.token_type_ids,
            Some(&inputs.attention_mask),
        )?;

        let cls = hidden_states.i((.., 0, ..))?;
        let pooled = match &self.pooler {
            Some(pooler) => pooler.forward(&cls)?.tanh()?,
            None => cls,
        };

        self.classifier.forward(&pooled)
    }
}

/// DistilBERT encoder, optional ReLU pre-classifier and linear head
pub struct DistilBertClassifier {
    model: DistilBertModel,
    pre_classifier: Option<Linear>,
    classifier: Linear,
    device: Device,
    num_labels: usize,
}

impl DistilBertClassifier {
    fn load(info: &ArchitectureInfo, vb: VarBuilder<'static>, device: Device) -> Result<Self> {
        let config: DistilBertConfig = parse_config(info)?;
        let mut errors = Vec::new();

        for prefix in ["distilbert", ""] {
            match DistilBertModel::load(prefixed(&vb, prefix), &config) {
                Ok(model) => {
                    tracing::debug!("Loaded DistilBERT backbone from '{}'", display_prefix(prefix));

                    let pre_classifier =
                        candle_nn::linear(info.hidden_size, info.hidden_size, vb.pp("pre_classifier"))
                            .ok();
                    let classifier = load_head(&vb, info.hidden_size, info.num_labels)?;

                    return Ok(Self {
                        model,
                        pre_classifier,
                        classifier,
                        device,
                        num_labels: info.num_labels,
                    });
                }
                Err(e) => {
                    tracing::debug!("Prefix '{}' did not load: {}", display_prefix(prefix), e);
                    errors.push(format!("{}: {}", display_prefix(prefix), error_summary(&e)));
                }
            }
        }

        Err(Error::model_format(format!(
            "Failed to load DistilBERT backbone with tried prefixes [{}]",
            errors.join(" | ")
        )))
    }
}

impl SequenceClassificationModel for DistilBertClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn logits(&self, inputs: &ModelInputs) -> candle_core::Result<Tensor> {
        // DistilBERT masks positions where the mask is non-zero
        let padding_mask = inputs.attention_mask.eq(0u32)?;
        let hidden_states = self.model.forward(&inputs.input_ids, &padding_mask)?;

        let cls = hidden_states.i((.., 0, ..))?;
        let pooled = match &self.pre_classifier {
            Some(pre_classifier) => pre_classifier.forward(&cls)?.relu()?,
            None => cls,
        };

        self.classifier.forward(&pooled)
    }
}

/// RoBERTa / XLM-RoBERTa sequence classifier with its dense + out_proj head
pub struct RobertaClassifier {
    model: XLMRobertaForSequenceClassification,
    device: Device,
    num_labels: usize,
}

impl RobertaClassifier {
    fn load(info: &ArchitectureInfo, vb: VarBuilder<'static>, device: Device) -> Result<Self> {
        let config: XlmRobertaConfig = parse_config(info)?;
        let mut errors = Vec::new();

        for prefix in ["", "model"] {
            match XLMRobertaForSequenceClassification::new(
                info.num_labels,
                &config,
                prefixed(&vb, prefix),
            ) {
                Ok(model) => {
                    tracing::debug!("Loaded RoBERTa classifier from '{}'", display_prefix(prefix));
                    return Ok(Self {
                        model,
                        device,
                        num_labels: info.num_labels,
                    });
                }
                Err(e) => {
                    tracing::debug!("Prefix '{}' did not load: {}", display_prefix(prefix), e);
                    errors.push(format!("{}: {}", display_prefix(prefix), error_summary(&e)));
                }
            }
        }

        Err(Error::model_format(format!(
            "Failed to load RoBERTa sequence classifier with tried prefixes [{}]",
            errors.join(" | ")
        )))
    }
}

impl SequenceClassificationModel for RobertaClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn logits(&self, inputs: &ModelInputs) -> candle_core::Result<Tensor> {
        self.model.forward(
            &inputs.input_ids,
            &inputs.attention_mask,
            &inputs.token_type_ids,
        )
    }
}
