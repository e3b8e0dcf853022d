//! End-to-end scoring: load, encode, infer, aggregate

use crate::aggregator::aggregate;
use crate::encoder::encode;
use crate::inference::infer;
use crate::model_loader::ModelLoader;
use polarscore_core::{ClassProbabilities, Result, ScoreRequest, ScoreResponse, ScoreWeights};
use std::sync::Arc;
use std::time::Instant;

/// Result of scoring one request
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Aggregated signed score
    pub score: f64,

    /// Per-class probabilities the score was computed from
    pub probabilities: ClassProbabilities,

    /// Padded length of the encoded input
    pub sequence_length: usize,

    /// Time spent resolving and loading the model, in microseconds
    pub load_us: u64,

    /// Time spent encoding, running and aggregating, in microseconds
    pub inference_us: u64,
}

impl ScoreOutcome {
    pub fn response(&self) -> ScoreResponse {
        ScoreResponse::from_score(self.score)
    }
}

/// Runs the scoring pipeline sequentially for one request at a time
#[derive(Clone)]
pub struct Scorer {
    loader: Arc<dyn ModelLoader>,
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(loader: Arc<dyn ModelLoader>, weights: ScoreWeights) -> Self {
        Self { loader, weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn loader(&self) -> &Arc<dyn ModelLoader> {
        &self.loader
    }

    /// Score `request.text()` with the model at `request.model_path()`
    ///
    /// Blocks for the whole load and forward pass.
    pub fn score(&self, request: &ScoreRequest) -> Result<ScoreOutcome> {
        let start = Instant::now();
        let loaded = self.loader.load(request.model_path())?;
        let load_us = start.elapsed().as_micros() as u64;

        let start = Instant::now();
        let encoded = encode(request.text(), loaded.tokenizer())?;
        let sequence_length = encoded.len();
        let probabilities = infer(loaded.model(), encoded)?;
        let score = aggregate(&probabilities, &self.weights)?;
        let inference_us = start.elapsed().as_micros() as u64;

        tracing::debug!(
            "Scored {} tokens with '{}': probabilities={:?} score={:.6}",
            sequence_length,
            loaded.path(),
            probabilities.as_slice(),
            score
        );

        Ok(ScoreOutcome {
            score,
            probabilities,
            sequence_length,
            load_us,
            inference_us,
        })
    }
}
