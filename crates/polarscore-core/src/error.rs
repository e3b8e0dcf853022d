//! Error types for polarscore

/// Result type alias using polarscore's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for polarscore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model path did not resolve to a usable artifact
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The artifact exists but does not expose a compatible classification head
    #[error("model format error: {0}")]
    ModelFormat(String),

    /// Forward pass or post-processing failure
    #[error("inference error: {0}")]
    Inference(String),

    /// Tokenizer failure while encoding text
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Malformed or incomplete request
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model-not-found error
    pub fn model_not_found(msg: impl Into<String>) -> Self {
        Self::ModelNotFound(msg.into())
    }

    /// Create a new model format error
    pub fn model_format(msg: impl Into<String>) -> Self {
        Self::ModelFormat(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelNotFound(_) => "model_not_found",
            Self::ModelFormat(_) => "model_format_error",
            Self::Inference(_) | Self::Encoding(_) => "inference_error",
            Self::Validation(_) => "validation_error",
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => {
                "internal_error"
            }
        }
    }
}
