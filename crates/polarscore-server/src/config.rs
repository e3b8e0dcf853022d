//! Server configuration

use crate::cli::Cli;
use polarscore_classifiers::LoaderConfig;
use polarscore_core::{Error, RequestDefaults, Result, ScoreWeights};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,

    /// Values substituted for fields missing from request bodies
    #[serde(default)]
    pub defaults: RequestDefaults,

    #[serde(default)]
    pub model: LoaderConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    ///
    /// A missing file yields the defaults.
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            tracing::warn!("Config file '{}' not found, using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(device) = &cli.device {
            self.model.device = device.clone();
        }
        if cli.cache {
            self.model.cache.enabled = true;
        }
        if cli.no_hub {
            self.model.hub.enabled = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_body_bytes == 0 {
            return Err(Error::config("server.max_body_bytes must be greater than zero"));
        }
        self.model.validate()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.listen, self.server.port)
    }
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Larger request bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// One weight per model output class
    #[serde(default)]
    pub weights: ScoreWeights,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}
