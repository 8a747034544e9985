//! MCP tool implementations

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::protocol::ToolDefinition;
use crate::config::{Config, SegmenterKind};
use crate::detect::ServiceDetector;
use crate::error::{Error, Result};
use crate::extract::{prompt::action_parameters, IntentExtractor};
use crate::models::Service;

/// Get all tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "detect_services".to_string(),
            description: "Detect which productivity services (mail, calendar, tasks, notes) a request mentions. Multi-service requests set several flags.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Natural language request"
                    },
                    "segmenter": {
                        "type": "string",
                        "enum": ["conjunction", "dependency"],
                        "description": "Clause splitting strategy. Omit to use the configured default."
                    },
                    "user": {
                        "type": "string",
                        "description": "Caller identity, used only for logging"
                    }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: "extract_intent".to_string(),
            description: "Convert a request into one structured intent {service, action, parameters, confidence} using the configured text generator. Failures return service 'unknown' with action 'error'.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Natural language request"
                    },
                    "context": {
                        "type": "object",
                        "description": "Optional user context (timezone, contacts, preferences) passed to the generator"
                    }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: "list_services".to_string(),
            description: "List supported services with their actions, action parameters and detection keywords.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Tool handler
pub struct ToolHandler {
    config: Arc<Config>,
    detector: Arc<ServiceDetector>,
    extractor: Option<Arc<IntentExtractor>>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(
        config: Arc<Config>,
        detector: Arc<ServiceDetector>,
        extractor: Option<Arc<IntentExtractor>>,
    ) -> Self {
        Self {
            config,
            detector,
            extractor,
        }
    }

    /// Execute a tool
    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value> {
        debug!("Executing tool: {} with args: {:?}", name, arguments);

        let result = match name {
            "detect_services" => self.detect_services(arguments),
            "extract_intent" => self.extract_intent(arguments).await,
            "list_services" => Ok(self.list_services()),
            _ => Err(Error::ToolNotFound(name.to_string())),
        }?;

        Ok(serde_json::json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&result)?
            }]
        }))
    }

    fn detect_services(&self, arguments: &Value) -> Result<Value> {
        let text = required_text(arguments)?;

        let kind = match arguments.get("segmenter").and_then(Value::as_str) {
            Some(name) => SegmenterKind::from_str(name)
                .ok_or_else(|| Error::InvalidRequest(format!("Unknown segmenter: {}", name)))?,
            None => self.detector.default_segmenter(),
        };
        let caller = arguments.get("user").and_then(Value::as_str);

        let services = self.detector.detect_logged(text, kind, caller);

        Ok(serde_json::json!({
            "text": text,
            "services": services,
            "detected": services.detected(),
            "segmenter": kind.as_str()
        }))
    }

    async fn extract_intent(&self, arguments: &Value) -> Result<Value> {
        let text = required_text(arguments)?;

        let context = match arguments.get("context") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(Error::InvalidRequest(
                    "context must be an object".to_string(),
                ))
            }
        };

        let extractor = self.extractor.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "No text generator configured; set {} and restart",
                self.config.generator.api_key_env
            ))
        })?;

        let intent = extractor.extract(text, context).await;
        Ok(intent.to_value())
    }

    fn list_services(&self) -> Value {
        let table = self.detector.table();
        let services: Vec<Value> = Service::ALL
            .iter()
            .map(|service| {
                let actions: Vec<Value> = service
                    .actions()
                    .iter()
                    .map(|action| {
                        serde_json::json!({
                            "name": action,
                            "parameters": action_parameters(action)
                        })
                    })
                    .collect();

                serde_json::json!({
                    "name": service.as_str(),
                    "display_name": service.display_name(),
                    "actions": actions,
                    "keywords": table.keywords(*service)
                })
            })
            .collect();

        serde_json::json!({
            "services": services,
            "generator_configured": self.extractor.is_some()
        })
    }
}

fn required_text(arguments: &Value) -> Result<&str> {
    arguments
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::InvalidRequest("Text parameter is required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::TextGenerator;
    use async_trait::async_trait;

    struct StaticGenerator;

    #[async_trait]
    impl TextGenerator for StaticGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(r#"{"service": "mail", "action": "send_email", "parameters": {"to": "bob@example.com"}, "confidence": 0.9}"#.to_string())
        }
    }

    fn handler(with_generator: bool) -> ToolHandler {
        let extractor = with_generator
            .then(|| Arc::new(IntentExtractor::new(Arc::new(StaticGenerator))));
        ToolHandler::new(
            Arc::new(Config::default()),
            Arc::new(ServiceDetector::default()),
            extractor,
        )
    }

    fn payload(result: &Value) -> Value {
        let text = result["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_detect_services_tool() {
        let result = handler(false)
            .execute(
                "detect_services",
                &serde_json::json!({"text": "Create a task and schedule a meeting"}),
            )
            .await
            .unwrap();

        let payload = payload(&result);
        assert_eq!(
            payload["services"],
            serde_json::json!({"mail": false, "calendar": true, "tasks": true, "notes": false})
        );
        assert_eq!(payload["detected"], serde_json::json!(["calendar", "tasks"]));
        assert_eq!(payload["segmenter"], "conjunction");
    }

    #[tokio::test]
    async fn test_detect_services_with_explicit_segmenter() {
        let result = handler(false)
            .execute(
                "detect_services",
                &serde_json::json!({
                    "text": "Check my calendar and reply to emails",
                    "segmenter": "dependency",
                    "user": "alice"
                }),
            )
            .await
            .unwrap();

        let payload = payload(&result);
        assert_eq!(payload["detected"], serde_json::json!(["mail", "calendar"]));
        assert_eq!(payload["segmenter"], "dependency");
    }

    #[tokio::test]
    async fn test_detect_services_requires_text() {
        let handler = handler(false);
        for args in [serde_json::json!({}), serde_json::json!({"text": "  "})] {
            let err = handler.execute("detect_services", &args).await.unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(ref m) if m == "Text parameter is required"));
        }
    }

    #[tokio::test]
    async fn test_detect_services_rejects_unknown_segmenter() {
        let err = handler(false)
            .execute(
                "detect_services",
                &serde_json::json!({"text": "email bob", "segmenter": "neural"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_extract_intent_tool() {
        let result = handler(true)
            .execute(
                "extract_intent",
                &serde_json::json!({"text": "Email bob", "context": {"timezone": "UTC"}}),
            )
            .await
            .unwrap();

        let payload = payload(&result);
        assert_eq!(payload["service"], "mail");
        assert_eq!(payload["action"], "send_email");
        assert_eq!(payload["parameters"]["to"], "bob@example.com");
    }

    #[tokio::test]
    async fn test_extract_intent_without_generator() {
        let err = handler(false)
            .execute("extract_intent", &serde_json::json!({"text": "Email bob"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_list_services_tool() {
        let result = handler(false)
            .execute("list_services", &serde_json::json!({}))
            .await
            .unwrap();

        let payload = payload(&result);
        let services = payload["services"].as_array().unwrap();
        assert_eq!(services.len(), 4);
        assert_eq!(services[0]["name"], "mail");
        assert_eq!(payload["generator_configured"], false);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = handler(false)
            .execute("send_email", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
