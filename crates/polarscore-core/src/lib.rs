//! polarscore Core
//!
//! Types and error handling shared by the polarscore crates.
//!
//! This crate provides:
//! - The error taxonomy used from model loading up to the HTTP boundary
//! - Wire types for score requests and responses
//! - Class probability and score weight vectors

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ClassProbabilities, RequestDefaults, ScoreRequest, ScoreRequestBody, ScoreResponse,
    ScoreWeights, DEFAULT_FIELD_VALUE,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassProbabilities, ScoreRequest, ScoreResponse, ScoreWeights};
}
