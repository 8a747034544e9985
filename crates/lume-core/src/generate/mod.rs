//! Pluggable text generation backends
//!
//! Structured extraction delegates raw classification to a text generator
//! behind the [`TextGenerator`] trait, so the extractor never depends on a
//! particular vendor API and can be tested with a fake.
//!
//! # Configuration
//!
//! In `config.toml`:
//!
//! ```toml
//! # Gemini (default)
//! [generator]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//! api_key_env = "GEMINI_API_KEY"
//!
//! # OpenRouter
//! [generator]
//! provider = "openrouter"
//! model = "google/gemini-2.0-flash-001"
//! api_key_env = "OPENROUTER_API_KEY"
//! ```

mod rate_limiter;
mod remote;

pub use rate_limiter::GenerationRateLimiter;
pub use remote::RemoteGenerator;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};

/// Trait for text generation backends
///
/// Implementations must be thread-safe (`Send + Sync`) so one generator can
/// serve concurrent extraction calls.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the prompt
    ///
    /// Fails with [`Error::GeneratorUnavailable`], [`Error::Timeout`] or
    /// [`Error::InvalidResponse`] when no usable text comes back.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "generator"
    }
}

/// Create a text generator based on configuration
///
/// Fails fast when the API key variable is unset, so misconfiguration surfaces
/// at startup rather than on the first request.
pub fn create_text_generator(config: &GeneratorConfig) -> Result<Arc<dyn TextGenerator>> {
    let api_key = resolve_api_key(&config.api_key_env)?;
    let generator = RemoteGenerator::from_config(config, api_key)?;
    info!(
        "Text generator configured: {:?} model {}",
        config.provider, config.model
    );
    Ok(Arc::new(generator))
}

fn resolve_api_key(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::Config(format!(
            "{} environment variable is required for the text generator",
            env_name
        ))),
    }
}
