//! Structured intent records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Service;

/// Free-form parameter mapping carried by an intent
pub type Parameters = Map<String, Value>;

/// Service targeted by a structured intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentService {
    #[serde(alias = "gmail", alias = "email")]
    Mail,
    Calendar,
    Tasks,
    #[serde(alias = "keep")]
    Notes,
    Unknown,
}

impl IntentService {
    /// Parse from string; anything outside the enumeration is `None`
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("unknown") {
            return Some(IntentService::Unknown);
        }
        Service::from_str(s).map(IntentService::from)
    }

    /// The concrete service, if any
    pub fn service(&self) -> Option<Service> {
        match self {
            IntentService::Mail => Some(Service::Mail),
            IntentService::Calendar => Some(Service::Calendar),
            IntentService::Tasks => Some(Service::Tasks),
            IntentService::Notes => Some(Service::Notes),
            IntentService::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.service() {
            Some(service) => service.as_str(),
            None => "unknown",
        }
    }
}

impl From<Service> for IntentService {
    fn from(service: Service) -> Self {
        match service {
            Service::Mail => IntentService::Mail,
            Service::Calendar => IntentService::Calendar,
            Service::Tasks => IntentService::Tasks,
            Service::Notes => IntentService::Notes,
        }
    }
}

impl std::fmt::Display for IntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-service, single-action record ready for dispatch
///
/// Fields are private so the confidence range holds for every instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredIntent {
    service: IntentService,
    action: String,
    parameters: Parameters,
    confidence: f64,
}

impl StructuredIntent {
    /// Create a new intent, clamping confidence into [0.0, 1.0]
    pub fn new(
        service: IntentService,
        action: impl Into<String>,
        parameters: Parameters,
        confidence: f64,
    ) -> Self {
        Self {
            service,
            action: action.into(),
            parameters,
            confidence: clamp_confidence(confidence),
        }
    }

    /// The record returned whenever generation or parsing fails
    pub fn fallback(original_request: &str, error: impl Into<String>) -> Self {
        let mut parameters = Parameters::new();
        parameters.insert(
            "original_request".to_string(),
            Value::String(original_request.to_string()),
        );
        parameters.insert("error".to_string(), Value::String(error.into()));

        Self::new(IntentService::Unknown, "error", parameters, 0.0)
    }

    pub fn service(&self) -> IntentService {
        self.service
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether this is a fallback record produced by a failure
    pub fn is_fallback(&self) -> bool {
        self.service == IntentService::Unknown && self.action == "error"
    }

    /// Whether the action belongs to the targeted service's vocabulary
    pub fn is_known_action(&self) -> bool {
        self.service
            .service()
            .map(|s| s.supports_action(&self.action))
            .unwrap_or(false)
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "service": self.service.as_str(),
            "action": self.action,
            "parameters": Value::Object(self.parameters.clone()),
            "confidence": self.confidence,
        })
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let high = StructuredIntent::new(IntentService::Mail, "send_email", Parameters::new(), 1.7);
        assert_eq!(high.confidence(), 1.0);

        let low = StructuredIntent::new(IntentService::Mail, "send_email", Parameters::new(), -0.2);
        assert_eq!(low.confidence(), 0.0);

        let nan = StructuredIntent::new(IntentService::Mail, "send_email", Parameters::new(), f64::NAN);
        assert_eq!(nan.confidence(), 0.0);
    }

    #[test]
    fn test_fallback_shape() {
        let intent = StructuredIntent::fallback("Send it", "Invalid JSON response");
        assert_eq!(intent.service(), IntentService::Unknown);
        assert_eq!(intent.action(), "error");
        assert_eq!(intent.confidence(), 0.0);
        assert_eq!(intent.parameters()["original_request"], "Send it");
        assert_eq!(intent.parameters()["error"], "Invalid JSON response");
        assert!(intent.is_fallback());
    }

    #[test]
    fn test_intent_service_parsing() {
        assert_eq!(IntentService::from_str("UNKNOWN"), Some(IntentService::Unknown));
        assert_eq!(IntentService::from_str("gmail"), Some(IntentService::Mail));
        assert_eq!(IntentService::from_str("maps"), None);
    }

    #[test]
    fn test_serializes_service_name() {
        let intent = StructuredIntent::new(IntentService::Notes, "create_note", Parameters::new(), 0.85);
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["service"], "notes");
        assert_eq!(value["parameters"], serde_json::json!({}));
        assert_eq!(value, intent.to_value());
        assert!(intent.is_known_action());
    }
}
