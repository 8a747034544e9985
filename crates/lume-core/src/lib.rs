//! Lume Core Library
//!
//! Intent classification for productivity requests: keyword-based service
//! detection over conjunction-split clauses, plus structured intent extraction
//! backed by a pluggable text generator.

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod generate;
pub mod mcp;
pub mod models;

pub use config::Config;
pub use detect::ServiceDetector;
pub use error::{Error, Result};
pub use extract::IntentExtractor;
pub use models::*;

/// Application name for config paths
pub const APP_NAME: &str = "lume";
