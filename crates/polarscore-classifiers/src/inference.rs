//! Forward pass and per-class sigmoid

use crate::architectures::{error_summary, ModelInputs, SequenceClassificationModel};
use crate::encoder::EncodedInput;
use candle_core::{DType, Device, Tensor};
use polarscore_core::{ClassProbabilities, Error, Result};

impl ModelInputs {
    /// Lift one encoded sequence into `(1, seq_len)` tensors
    pub fn from_encoded(encoded: &EncodedInput, device: &Device) -> candle_core::Result<Self> {
        let row = |values: &[u32]| Tensor::new(values, device)?.unsqueeze(0);

        Ok(Self {
            input_ids: row(encoded.input_ids())?,
            token_type_ids: row(encoded.type_ids())?,
            attention_mask: row(encoded.attention_mask())?,
        })
    }
}

/// Run the model and squash each logit independently
///
/// This is a multi-label head: probabilities are not normalised against
/// each other. The encoded input is consumed by the call.
pub fn infer(
    model: &dyn SequenceClassificationModel,
    encoded: EncodedInput,
) -> Result<ClassProbabilities> {
    let inputs = ModelInputs::from_encoded(&encoded, model.device())
        .map_err(|e| inference_error("Failed to create input tensors", e))?;
    drop(encoded);

    let logits = model
        .logits(&inputs)
        .map_err(|e| inference_error("Model forward pass failed", e))?;

    let probs = sigmoid_row(&logits)?;

    if probs.len() != model.num_labels() {
        return Err(Error::inference(format!(
            "Model produced {} logits but declares {} labels",
            probs.len(),
            model.num_labels()
        )));
    }

    ClassProbabilities::new(probs)
}

/// Element-wise logistic function over the single batch row of `logits`
pub fn sigmoid_row(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::sigmoid(logits)
        .and_then(|probs| probs.to_dtype(DType::F32))
        .and_then(|probs| probs.squeeze(0))
        .and_then(|probs| probs.to_vec1::<f32>())
        .map_err(|e| inference_error("Failed to apply sigmoid to logits", e))
}

/// Log the full candle error and keep only its first line for the caller
fn inference_error(context: &str, err: candle_core::Error) -> Error {
    tracing::error!("{}: {}", context, err);
    Error::inference(format!("{}: {}", context, error_summary(&err)))
}
