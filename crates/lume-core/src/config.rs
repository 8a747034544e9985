//! Configuration management for Lume

use crate::error::{Error, Result};
use crate::models::Service;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Service detector settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Text generator settings for structured extraction
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (logs live under it)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

/// Clause segmentation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    /// Split on every conjunction token (default)
    #[default]
    Conjunction,
    /// Split only where a conjunction coordinates two verb phrases
    Dependency,
}

impl SegmenterKind {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "conjunction" | "simple" => Some(SegmenterKind::Conjunction),
            "dependency" | "dependency_parse" => Some(SegmenterKind::Dependency),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmenterKind::Conjunction => "conjunction",
            SegmenterKind::Dependency => "dependency",
        }
    }
}

/// Service detector settings
///
/// ```toml
/// [detector]
/// segmenter = "dependency"
/// lexicon_path = "/usr/share/lume/verbs.txt"
///
/// [detector.extra_keywords]
/// calendar = ["standup", "offsite"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Default segmentation strategy
    #[serde(default)]
    pub segmenter: SegmenterKind,

    /// Verb lexicon for the dependency segmenter (built-in list when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon_path: Option<PathBuf>,

    /// Inputs longer than this are rejected by the dependency segmenter
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Additional keywords per service, merged into the built-in table
    #[serde(default)]
    pub extra_keywords: BTreeMap<String, Vec<String>>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterKind::default(),
            lexicon_path: None,
            max_tokens: default_max_tokens(),
            extra_keywords: BTreeMap::new(),
        }
    }
}

/// Remote text generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorProvider {
    /// Google Gemini generateContent API
    #[default]
    Gemini,
    /// OpenRouter chat completions API
    #[serde(rename = "openrouter", alias = "open_router")]
    OpenRouter,
}

impl GeneratorProvider {
    /// Default API base URL for the provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            GeneratorProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            GeneratorProvider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

/// Text generator settings
///
/// ```toml
/// [generator]
/// provider = "openrouter"
/// model = "google/gemini-2.0-flash-001"
/// api_key_env = "OPENROUTER_API_KEY"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Which remote API to call
    #[serde(default)]
    pub provider: GeneratorProvider,

    /// Model name passed to the provider
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Override for the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Timeout for a single generation request in milliseconds
    #[serde(default = "default_generator_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a failed or timed-out generation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Global rate limit for generation requests (per second)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,

    /// Sampling temperature (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::default(),
            model: default_generator_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            timeout_ms: default_generator_timeout_ms(),
            max_retries: default_max_retries(),
            rate_limit_per_second: default_rate_limit(),
            temperature: None,
        }
    }
}

impl GeneratorConfig {
    /// Base URL to use, falling back to the provider default
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    get_data_dir()
}

fn default_max_tokens() -> usize {
    10_000
}

fn default_generator_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_generator_timeout_ms() -> u64 {
    30000
}

fn default_max_retries() -> u32 {
    1
}

fn default_rate_limit() -> u32 {
    5
}

/// Get the data directory (XDG: ~/.local/share/lume)
fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join(crate::APP_NAME)
}

/// Get the config directory (XDG: ~/.config/lume)
fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(crate::APP_NAME)
}

impl Config {
    /// Path of the default config file
    pub fn default_path() -> PathBuf {
        get_config_dir().join("config.toml")
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&contents)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            info!("No config file found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values that cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.detector.max_tokens == 0 {
            return Err(Error::InvalidConfig {
                field: "detector.max_tokens".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.generator.timeout_ms == 0 {
            return Err(Error::InvalidConfig {
                field: "generator.timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.generator.api_key_env.trim().is_empty() {
            return Err(Error::InvalidConfig {
                field: "generator.api_key_env".to_string(),
                reason: "must name an environment variable".to_string(),
            });
        }
        for (service, keywords) in &self.detector.extra_keywords {
            if Service::from_str(service).is_none() {
                return Err(Error::InvalidConfig {
                    field: format!("detector.extra_keywords.{}", service),
                    reason: "unknown service".to_string(),
                });
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(Error::InvalidConfig {
                    field: format!("detector.extra_keywords.{}", service),
                    reason: "keywords must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> PathBuf {
        self.general.data_dir.join("logs")
    }
}
