//! Loader and inference configuration

use polarscore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Settings for resolving, loading and encoding models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Device to run on (cpu, cuda, cuda:N, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Upper bound on encoded sequence length
    ///
    /// The effective bound is the smaller of this and the model's own
    /// position limit.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Round padded length up to a multiple of this value
    #[serde(default)]
    pub pad_to_multiple_of: Option<usize>,

    /// Hugging Face Hub resolution for paths that are not local directories
    #[serde(default)]
    pub hub: HubConfig,

    /// Keyed cache of loaded models
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            max_length: default_max_length(),
            pad_to_multiple_of: None,
            hub: HubConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(Error::config("model.max_length must be greater than zero"));
        }
        if self.pad_to_multiple_of == Some(0) {
            return Err(Error::config("model.pad_to_multiple_of must be greater than zero"));
        }
        self.device.parse::<DeviceType>()?;
        Ok(())
    }
}

/// Hugging Face Hub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Download cache; see [`HubConfig::resolved_cache_dir`]
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Revision used when the path carries no `@revision` suffix
    #[serde(default = "default_revision")]
    pub revision: String,
}

fn default_true() -> bool {
    true
}

fn default_revision() -> String {
    "main".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            revision: default_revision(),
        }
    }
}

impl HubConfig {
    /// Configured cache directory, or `~/.cache/polarscore/hub`
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cache/polarscore/hub")
        })
    }
}

/// Model cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Off means every request reloads its model
    #[serde(default)]
    pub enabled: bool,
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim().to_ascii_lowercase();
        let (kind, index) = match value.split_once(':') {
            Some((kind, index)) => {
                let index = index.parse::<usize>().map_err(|_| {
                    Error::config(format!("invalid device index in '{}'", value))
                })?;
                (kind.to_string(), index)
            }
            None => (value.clone(), 0),
        };

        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            other => Err(Error::config(format!("unknown device '{}'", other))),
        }
    }
}

impl DeviceType {
    /// Create the Candle device
    pub fn create(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(idx) => candle_core::Device::new_cuda(idx).map_err(|e| {
                Error::config(format!("Failed to create CUDA device {}: {}", idx, e))
            }),
            Self::Metal(idx) => candle_core::Device::new_metal(idx).map_err(|e| {
                Error::config(format!("Failed to create Metal device {}: {}", idx, e))
            }),
        }
    }
}
