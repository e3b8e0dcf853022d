//! Command-line interface

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "polarscore-server")]
#[command(about = "Score text polarity with a sequence classification model", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "polarscore.yaml", env = "POLARSCORE_CONFIG")]
    pub config: String,

    /// Listen address
    #[arg(short = 'l', long, env = "POLARSCORE_LISTEN")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "POLARSCORE_PORT")]
    pub port: Option<u16>,

    /// Inference device (cpu, cuda[:N], metal)
    #[arg(short, long, env = "POLARSCORE_DEVICE")]
    pub device: Option<String>,

    /// Keep loaded models in memory between requests
    #[arg(long)]
    pub cache: bool,

    /// Only load models from local directories
    #[arg(long)]
    pub no_hub: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
