//! Core types for polarscore

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sentinel substituted for absent request fields
pub const DEFAULT_FIELD_VALUE: &str = "default_value";

/// Request body exactly as it arrives on the wire
///
/// Both fields are optional; `null` is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequestBody {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, alias = "modelPath")]
    pub path: Option<String>,
}

/// A scoring request with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRequest {
    text: String,
    model_path: String,
}

impl ScoreRequest {
    /// Create a request from fully resolved fields
    pub fn new(text: impl Into<String>, model_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_path: model_path.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

/// Defaulting policy applied to incoming request bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    /// Text used when the body carries none
    #[serde(default = "default_field_value")]
    pub text: String,

    /// Model path used when the body carries none
    #[serde(default = "default_field_value")]
    pub model_path: String,

    /// Reject bodies with missing fields instead of defaulting them
    #[serde(default)]
    pub require_fields: bool,
}

fn default_field_value() -> String {
    DEFAULT_FIELD_VALUE.to_string()
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            text: default_field_value(),
            model_path: default_field_value(),
            require_fields: false,
        }
    }
}

impl RequestDefaults {
    /// Turn a wire body into a request, filling or rejecting missing fields
    pub fn resolve(&self, body: ScoreRequestBody) -> Result<ScoreRequest> {
        let text = self.field(body.text, "text", &self.text)?;
        let model_path = self.field(body.path, "path", &self.model_path)?;
        Ok(ScoreRequest { text, model_path })
    }

    fn field(&self, value: Option<String>, name: &str, fallback: &str) -> Result<String> {
        match value {
            Some(value) => Ok(value),
            None if self.require_fields => Err(Error::validation(format!(
                "missing required field '{}'",
                name
            ))),
            None => Ok(fallback.to_string()),
        }
    }
}

/// Independent per-class probabilities produced by a sigmoid head
///
/// Values do not sum to one; each lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassProbabilities(Vec<f32>);

impl ClassProbabilities {
    /// Wrap a probability vector, rejecting values outside `[0, 1]`
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if let Some((idx, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(Error::inference(format!(
                "class {} has probability {} outside [0, 1]",
                idx, value
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Fixed projection turning class probabilities into one signed score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ScoreWeights(Vec<f64>);

impl ScoreWeights {
    /// Negative / neutral / positive projection
    pub const POLARITY: [f64; 3] = [-1.0, 0.0, 1.0];

    /// Validate and wrap a weight vector
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::config("score weights must not be empty"));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::config("score weights must be finite"));
        }
        Ok(Self(weights))
    }

    /// The `[-1, 0, 1]` polarity weights
    pub fn polarity() -> Self {
        Self(Self::POLARITY.to_vec())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of classes these weights expect
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::polarity()
    }
}

impl TryFrom<Vec<f64>> for ScoreWeights {
    type Error = Error;

    fn try_from(weights: Vec<f64>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<ScoreWeights> for Vec<f64> {
    fn from(weights: ScoreWeights) -> Self {
        weights.0
    }
}

/// Response body returned to the caller
///
/// `output` and `outputEmotions` carry the same aggregated score; both are
/// part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub output: f64,

    #[serde(rename = "outputEmotions")]
    pub output_emotions: f64,
}

impl ScoreResponse {
    pub fn from_score(score: f64) -> Self {
        Self {
            output: score,
            output_emotions: score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_accepts_model_path_alias() {
        let body: ScoreRequestBody =
            serde_json::from_str(r#"{"text": "hi", "modelPath": "./m"}"#).unwrap();
        assert_eq!(body.path.as_deref(), Some("./m"));
    }

    #[test]
    fn test_null_fields_are_missing() {
        let body: ScoreRequestBody =
            serde_json::from_str(r#"{"text": null, "path": null}"#).unwrap();
        let request = RequestDefaults::default().resolve(body).unwrap();
        assert_eq!(request.text(), DEFAULT_FIELD_VALUE);
        assert_eq!(request.model_path(), DEFAULT_FIELD_VALUE);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let defaults = RequestDefaults {
            text: "".to_string(),
            model_path: "./models/polarity".to_string(),
            require_fields: false,
        };
        let body = ScoreRequestBody {
            text: Some("great".to_string()),
            path: None,
        };

        let request = defaults.resolve(body).unwrap();
        assert_eq!(request.text(), "great");
        assert_eq!(request.model_path(), "./models/polarity");
    }

    #[test]
    fn test_required_fields_reject_missing() {
        let defaults = RequestDefaults {
            require_fields: true,
            ..Default::default()
        };
        let body = ScoreRequestBody {
            text: Some("great".to_string()),
            path: None,
        };

        let err = defaults.resolve(body).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("'path'"));
    }

    #[test]
    fn test_probabilities_reject_out_of_range() {
        assert!(ClassProbabilities::new(vec![0.0, 0.5, 1.0]).is_ok());
        assert!(ClassProbabilities::new(vec![1.5]).is_err());
        assert!(ClassProbabilities::new(vec![f32::NAN]).is_err());
    }

    #[test]
    fn test_weights_validation() {
        assert!(ScoreWeights::new(vec![]).is_err());
        assert!(ScoreWeights::new(vec![1.0, f64::INFINITY]).is_err());
        assert_eq!(ScoreWeights::default().as_slice(), &[-1.0, 0.0, 1.0]);

        let parsed: ScoreWeights = serde_json::from_str("[-2.0, 0.5]").unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(serde_json::from_str::<ScoreWeights>("[]").is_err());
    }

    #[test]
    fn test_response_duplicates_score() {
        let json = serde_json::to_value(ScoreResponse::from_score(0.25)).unwrap();
        assert_eq!(json["output"], 0.25);
        assert_eq!(json["outputEmotions"], 0.25);
    }
}
