//! Structured intent extraction
//!
//! Turns a free-form request into a single [`StructuredIntent`] by asking a
//! [`TextGenerator`] for JSON and repairing whatever comes back. Extraction
//! never fails: every problem ends in a fallback record.

pub mod prompt;
pub mod repair;

pub use prompt::{build_prompt, system_prompt};
pub use repair::{parse_response, strip_code_fences, validate_response};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::generate::{create_text_generator, GenerationRateLimiter, TextGenerator};
use crate::models::{Parameters, StructuredIntent};

/// Extracts structured intents through an injected text generator
pub struct IntentExtractor {
    generator: Arc<dyn TextGenerator>,
    limiter: GenerationRateLimiter,
    timeout: Duration,
    max_retries: u32,
}

impl IntentExtractor {
    /// Create with default timeout, retry and rate limit settings
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::from_config(generator, &GeneratorConfig::default())
    }

    /// Create using the timeout, retry and rate limit settings in `config`
    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &GeneratorConfig) -> Self {
        Self {
            generator,
            limiter: GenerationRateLimiter::new(config.rate_limit_per_second),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the number of extra attempts after a transient failure
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Extract a structured intent from a request
    pub async fn extract(&self, text: &str, context: Option<&Parameters>) -> StructuredIntent {
        let text = text.trim();
        if text.is_empty() {
            warn!("Empty request, skipping generation");
            return StructuredIntent::fallback(text, "Empty request");
        }

        let prompt = build_prompt(text, context);
        debug!("Built prompt of {} chars for request", prompt.len());

        let response = match self.generate_with_retry(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error processing request with {}: {}", self.generator.name(), e);
                return StructuredIntent::fallback(text, format!("Processing error: {}", e));
            }
        };

        if response.trim().is_empty() {
            warn!("Empty response from {}", self.generator.name());
            return StructuredIntent::fallback(text, "Empty API response");
        }

        let intent = parse_response(&response, text);
        info!(
            "Extracted intent: {}.{} (confidence {:.2})",
            intent.service(),
            intent.action(),
            intent.confidence()
        );
        intent
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            self.limiter.wait().await;

            let result = match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    ms: self.timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Generation attempt {} failed: {}, retrying ({}/{})",
                        attempt, e, attempt, self.max_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build a generator from configuration and extract a single intent
///
/// Fails only when the generator cannot be created.
pub async fn extract_intent(
    config: &GeneratorConfig,
    text: &str,
    context: Option<&Parameters>,
) -> Result<StructuredIntent> {
    let generator = create_text_generator(config)?;
    let extractor = IntentExtractor::from_config(generator, config);
    Ok(extractor.extract(text, context).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntentService;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FixedGenerator {
        output: String,
        calls: AtomicU32,
    }

    impl FixedGenerator {
        fn new(output: &str) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    /// Fails with a transient error for the first `failures` calls
    struct FlakyGenerator {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::GeneratorUnavailable("503".to_string()))
            } else {
                Ok(r#"{"service": "mail", "action": "send_email", "parameters": {}, "confidence": 0.9}"#.to_string())
            }
        }
    }

    struct BrokenGenerator {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TextGenerator for BrokenGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Generation("400 bad request".to_string()))
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok("{}".to_string())
        }
    }

    struct CapturingGenerator {
        prompt: Mutex<Option<String>>,
    }

    #[async_trait]
    impl TextGenerator for CapturingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            *self.prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(r#"{"service": "notes", "action": "create_note", "parameters": {}, "confidence": 0.8}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_extract_valid_output() {
        let generator = FixedGenerator::new(
            r#"{"service": "calendar", "action": "create_event", "parameters": {"title": "Team Standup"}, "confidence": 0.95}"#,
        );
        let extractor = IntentExtractor::new(generator.clone());

        let intent = extractor
            .extract("Schedule a team standup for Monday at 9 AM", None)
            .await;
        assert_eq!(intent.service(), IntentService::Calendar);
        assert_eq!(intent.action(), "create_event");
        assert_eq!(intent.parameters()["title"], "Team Standup");
        assert_eq!(intent.confidence(), 0.95);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_becomes_fallback() {
        let extractor = IntentExtractor::new(FixedGenerator::new("Sure! Here's what I found."));

        let intent = extractor.extract("Email Bob", None).await;
        assert_eq!(intent.service(), IntentService::Unknown);
        assert_eq!(intent.action(), "error");
        assert_eq!(intent.confidence(), 0.0);
        assert_eq!(intent.parameters()["original_request"], "Email Bob");
        assert_eq!(intent.parameters()["error"], "Invalid JSON response");
    }

    #[tokio::test]
    async fn test_fenced_output_with_missing_confidence() {
        let extractor = IntentExtractor::new(FixedGenerator::new(
            "```json\n{\"service\": \"tasks\", \"action\": \"create_task\", \"parameters\": {\"title\": \"Buy groceries\"}}\n```",
        ));

        let intent = extractor.extract("Add buy groceries to my todo list", None).await;
        assert_eq!(intent.service(), IntentService::Tasks);
        assert_eq!(intent.action(), "create_task");
        assert_eq!(intent.parameters()["title"], "Buy groceries");
        assert_eq!(intent.confidence(), 0.1);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let extractor = IntentExtractor::new(FixedGenerator::new("   "));
        let intent = extractor.extract("Email Bob", None).await;
        assert!(intent.is_fallback());
        assert_eq!(intent.parameters()["error"], "Empty API response");
    }

    #[tokio::test]
    async fn test_empty_request_skips_generator() {
        let generator = FixedGenerator::new("{}");
        let extractor = IntentExtractor::new(generator.clone());

        let intent = extractor.extract("  \n ", None).await;
        assert!(intent.is_fallback());
        assert_eq!(intent.parameters()["error"], "Empty request");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let generator = Arc::new(FlakyGenerator {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let extractor = IntentExtractor::new(generator.clone()).with_max_retries(2);

        let intent = extractor.extract("Send the report to Alice", None).await;
        assert_eq!(intent.service(), IntentService::Mail);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let generator = Arc::new(FlakyGenerator {
            failures: 5,
            calls: AtomicU32::new(0),
        });
        let extractor = IntentExtractor::new(generator.clone()).with_max_retries(1);

        let intent = extractor.extract("Send the report to Alice", None).await;
        assert!(intent.is_fallback());
        let error = intent.parameters()["error"].as_str().unwrap();
        assert!(error.starts_with("Processing error: "));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let generator = Arc::new(BrokenGenerator {
            calls: AtomicU32::new(0),
        });
        let extractor = IntentExtractor::new(generator.clone()).with_max_retries(3);

        let intent = extractor.extract("Email Bob", None).await;
        assert!(intent.is_fallback());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_fallback() {
        let extractor = IntentExtractor::new(Arc::new(SlowGenerator))
            .with_timeout(Duration::from_millis(20))
            .with_max_retries(0);

        let intent = extractor.extract("Email Bob", None).await;
        assert!(intent.is_fallback());
        assert_eq!(
            intent.parameters()["error"],
            "Processing error: Generator timed out after 20ms"
        );
    }

    #[tokio::test]
    async fn test_context_reaches_prompt() {
        let generator = Arc::new(CapturingGenerator {
            prompt: Mutex::new(None),
        });
        let extractor = IntentExtractor::new(generator.clone());

        let mut context = Parameters::new();
        context.insert("user".to_string(), Value::String("alice".to_string()));
        extractor.extract("Note the wifi password", Some(&context)).await;

        let prompt = generator.prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("User Context:"));
        assert!(prompt.contains("\"alice\""));
        assert!(prompt.contains("User Request: \"Note the wifi password\""));
    }

    #[tokio::test]
    async fn test_extract_intent_requires_api_key() {
        let config = GeneratorConfig {
            api_key_env: "LUME_TEST_EXTRACT_KEY_NEVER_SET".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            extract_intent(&config, "Email Bob", None).await,
            Err(Error::Config(_))
        ));
    }
}
