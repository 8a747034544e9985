//! Error types for Lume

use thiserror::Error;

/// Result type alias using Lume's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Lume
#[derive(Error, Debug)]
pub enum Error {
    // Generation errors
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Text generator unavailable: {0}")]
    GeneratorUnavailable(String),

    #[error("Invalid generator response: {0}")]
    InvalidResponse(String),

    #[error("Generator timed out after {ms}ms")]
    Timeout { ms: u64 },

    // Segmentation errors
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    #[error("Failed to load verb lexicon from {path}: {reason}")]
    LexiconLoad { path: String, reason: String },

    // MCP errors
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Returns true if re-issuing the same generator call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::GeneratorUnavailable(_) | Error::Timeout { .. } | Error::Http(_)
        )
    }

    /// Returns an error code suitable for MCP error responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Generation(_) | Error::GeneratorUnavailable(_) => "GENERATOR_ERROR",
            Error::InvalidResponse(_) => "INVALID_RESPONSE",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Segmentation(_) | Error::LexiconLoad { .. } => "SEGMENTATION_ERROR",
            Error::InvalidRequest(_) => "INVALID_REQUEST",
            Error::ToolNotFound(_) => "TOOL_NOT_FOUND",
            Error::McpProtocol(_) => "PROTOCOL_ERROR",
            Error::Config(_) | Error::InvalidConfig { .. } => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-friendly action message for recoverable errors
    pub fn action_hint(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => {
                Some("Check ~/.config/lume/config.toml and the generator API key variable")
            }
            Error::GeneratorUnavailable(_) | Error::Timeout { .. } | Error::Http(_) => {
                Some("Please wait and try again")
            }
            _ => None,
        }
    }
}
