//! Shared application state

use crate::config::ServerConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use polarscore_classifiers::{build_loader, Scorer};
use polarscore_core::{RequestDefaults, Result};
use std::sync::Arc;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Runs load, encode, infer and aggregate for one request
    pub scorer: Scorer,

    /// Fills fields missing from request bodies
    pub defaults: Arc<RequestDefaults>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(scorer: Scorer, defaults: RequestDefaults, metrics_handle: PrometheusHandle) -> Self {
        Self {
            scorer,
            defaults: Arc::new(defaults),
            metrics_handle,
        }
    }

    /// Build the loader and scorer described by `config`
    pub fn from_config(config: &ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        let weights = config.scoring.weights.clone();
        let loader = build_loader(config.model.clone(), weights.len())?;

        tracing::info!(
            "Scoring with {} weights {:?} on device '{}'",
            weights.len(),
            weights.as_slice(),
            config.model.device
        );

        Ok(Self::new(
            Scorer::new(loader, weights),
            config.defaults.clone(),
            metrics_handle,
        ))
    }
}
