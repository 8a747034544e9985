//! Remote text generation client (Gemini or OpenRouter)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::TextGenerator;
use crate::config::{GeneratorConfig, GeneratorProvider};
use crate::error::{Error, Result};

/// Request body for Gemini generateContent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

/// Response body from Gemini generateContent
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Request body for OpenRouter /chat/completions
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// Response body from OpenRouter /chat/completions
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug)]
enum RemoteKind {
    Gemini,
    OpenRouter,
}

/// Client for a remote text generation API
pub struct RemoteGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
    kind: RemoteKind,
}

impl RemoteGenerator {
    /// Create a client from generator settings and a resolved API key
    pub fn from_config(config: &GeneratorConfig, api_key: String) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let kind = match config.provider {
            GeneratorProvider::Gemini => RemoteKind::Gemini,
            GeneratorProvider::OpenRouter => RemoteKind::OpenRouter,
        };
        let url = config.effective_base_url().trim_end_matches('/').to_string();

        info!("Created {:?} generation client for {}", kind, url);
        Ok(Self {
            client,
            url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            kind,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        let message = format!("service returned {}: {}", status, body);
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(Error::GeneratorUnavailable(message))
        } else {
            Err(Error::Generation(message))
        }
    }

    async fn generate_gemini(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: self
                .temperature
                .map(|temperature| GeminiGenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let result: GeminiResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("Failed to parse Gemini response: {}", e)))?;

        gemini_text(result)
    }

    async fn generate_openrouter(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let result: ChatResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                Error::InvalidResponse(format!("Failed to parse OpenRouter response: {}", e))
            })?;

        chat_text(result)
    }
}

#[async_trait]
impl TextGenerator for RemoteGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting generation from {:?} ({} prompt chars)",
            self.kind,
            prompt.len()
        );

        let text = match self.kind {
            RemoteKind::Gemini => self.generate_gemini(prompt).await?,
            RemoteKind::OpenRouter => self.generate_openrouter(prompt).await?,
        };

        debug!("Received {} chars from {}", text.len(), self.model);
        Ok(text)
    }

    fn name(&self) -> &str {
        match self.kind {
            RemoteKind::Gemini => "gemini",
            RemoteKind::OpenRouter => "openrouter",
        }
    }
}

/// Concatenate the text parts of the first candidate
fn gemini_text(response: GeminiResponse) -> Result<String> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| Error::InvalidResponse("Gemini returned no candidates".to_string()))?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    Ok(text)
}

/// Content of the first chat choice
fn chat_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::InvalidResponse("OpenRouter returned no choices".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some("hi".to_string()),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig { temperature: 0.5 }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "{\"service\": "}, {"text": "\"mail\"}"}]
                }
            }]
        }))
        .unwrap();

        assert_eq!(gemini_text(response).unwrap(), "{\"service\": \"mail\"}");
    }

    #[test]
    fn test_gemini_without_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(gemini_text(response), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_chat_text() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        }))
        .unwrap();
        assert_eq!(chat_text(response).unwrap(), "ok");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(chat_text(empty).is_err());
    }

    #[tokio::test]
    async fn test_connection_failure_is_retryable_http_error() {
        let config = GeneratorConfig {
            base_url: Some("http://127.0.0.1:1/v1beta".to_string()),
            timeout_ms: 2000,
            ..GeneratorConfig::default()
        };
        let generator = RemoteGenerator::from_config(&config, "key".to_string()).unwrap();

        let err = generator.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "unexpected error: {:?}", err);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_config_uses_provider_url() {
        let config = GeneratorConfig {
            provider: GeneratorProvider::OpenRouter,
            base_url: Some("http://localhost:9999/v1/".to_string()),
            ..GeneratorConfig::default()
        };

        let generator = RemoteGenerator::from_config(&config, "key".to_string()).unwrap();
        assert_eq!(generator.url, "http://localhost:9999/v1");
        assert_eq!(generator.name(), "openrouter");
    }
}
