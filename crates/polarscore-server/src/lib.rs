//! polarscore Server
//!
//! HTTP boundary for polarity scoring. `POST /` takes
//! `{"text": ..., "path": ...}` and answers `{"output": s, "outputEmotions": s}`
//! where `s` is the weighted sum of the model's per-class sigmoid probabilities.

pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::ServerConfig;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
