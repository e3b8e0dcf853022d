//! polarscore Classifiers
//!
//! Turns raw text and a model location into one signed score.
//!
//! The pipeline runs in four sequential steps:
//! - Load: resolve the path to a local or hub artifact and build the tokenizer and model
//! - Encode: tokenize with truncation, padding and an attention mask
//! - Infer: forward pass, then an independent sigmoid per class logit
//! - Aggregate: inner product of the probabilities with the score weights
//!
//! Models are reloaded on every request unless a [`CachingLoader`] wraps the loader.

pub mod aggregator;
pub mod architectures;
pub mod cache;
pub mod config;
pub mod encoder;
pub mod inference;
pub mod model_config;
pub mod model_loader;
pub mod scorer;

pub use aggregator::aggregate;
pub use architectures::{ModelInputs, SequenceClassificationModel};
pub use cache::CachingLoader;
pub use config::{CacheConfig, DeviceType, HubConfig, LoaderConfig};
pub use encoder::{configure_tokenizer, encode, EncodedInput, EncoderSettings};
pub use inference::infer;
pub use model_config::{ArchitectureInfo, ModelType};
pub use model_loader::{HfModelLoader, LoadedModel, ModelLoader};
pub use scorer::{ScoreOutcome, Scorer};

/// Build the loader described by `config`, cached or not
pub fn build_loader(
    config: LoaderConfig,
    expected_labels: usize,
) -> polarscore_core::Result<std::sync::Arc<dyn ModelLoader>> {
    let cache_enabled = config.cache.enabled;
    let loader = HfModelLoader::new(config, expected_labels)?;

    if cache_enabled {
        tracing::info!("Model cache enabled");
        Ok(std::sync::Arc::new(CachingLoader::new(loader)))
    } else {
        Ok(std::sync::Arc::new(loader))
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::encoder::{encode, EncodedInput};
    pub use crate::model_loader::{HfModelLoader, LoadedModel, ModelLoader};
    pub use crate::scorer::{ScoreOutcome, Scorer};
    pub use crate::{aggregate, infer};
}
