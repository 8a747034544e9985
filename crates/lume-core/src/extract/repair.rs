//! Validation and field-by-field repair of generator output

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{IntentService, Parameters, StructuredIntent};

/// Confidence assumed when the generator omits it
pub const MISSING_CONFIDENCE: f64 = 0.1;

/// Confidence substituted for a malformed or out-of-range value
pub const INVALID_CONFIDENCE: f64 = 0.5;

/// Action used when the generator omits or garbles it
pub const PARSE_ERROR_ACTION: &str = "parse_error";

/// Remove a surrounding markdown code fence
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse raw generator output into an intent, repairing what can be repaired
///
/// Output that is not a JSON object becomes a fallback record carrying
/// `original_request`.
pub fn parse_response(raw: &str, original_request: &str) -> StructuredIntent {
    let cleaned = strip_code_fences(raw);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(record)) => repair_record(record),
        Ok(other) => {
            warn!("Generator returned JSON that is not an object: {}", other);
            StructuredIntent::fallback(original_request, "Invalid JSON response")
        }
        Err(e) => {
            warn!("JSON parsing error: {} | Response: {}", e, preview(cleaned));
            StructuredIntent::fallback(original_request, "Invalid JSON response")
        }
    }
}

/// Repair each field of a parsed record independently
pub fn repair_record(mut record: Map<String, Value>) -> StructuredIntent {
    let service = match record.remove("service") {
        None => {
            warn!("Missing field 'service', using unknown");
            IntentService::Unknown
        }
        Some(Value::String(name)) => IntentService::from_str(&name).unwrap_or_else(|| {
            warn!("Invalid service '{}', using unknown", name);
            IntentService::Unknown
        }),
        Some(other) => {
            warn!("Invalid service {}, using unknown", other);
            IntentService::Unknown
        }
    };

    let action = match record.remove("action") {
        Some(Value::String(action)) => action,
        None => {
            warn!("Missing field 'action', using {}", PARSE_ERROR_ACTION);
            PARSE_ERROR_ACTION.to_string()
        }
        Some(other) => {
            warn!("Invalid action {}, using {}", other, PARSE_ERROR_ACTION);
            PARSE_ERROR_ACTION.to_string()
        }
    };

    let parameters = match record.remove("parameters") {
        Some(Value::Object(parameters)) => parameters,
        None => {
            warn!("Missing field 'parameters', using empty mapping");
            Parameters::new()
        }
        Some(other) => {
            warn!("Invalid parameters {}, using empty mapping", other);
            Parameters::new()
        }
    };

    let confidence = match record.remove("confidence") {
        None => {
            warn!("Missing field 'confidence', using {}", MISSING_CONFIDENCE);
            MISSING_CONFIDENCE
        }
        Some(value) => match value.as_f64() {
            Some(c) if (0.0..=1.0).contains(&c) => c,
            _ => {
                warn!("Invalid confidence {}, using {}", value, INVALID_CONFIDENCE);
                INVALID_CONFIDENCE
            }
        },
    };

    if !record.is_empty() {
        debug!(
            "Ignoring extra fields: {:?}",
            record.keys().collect::<Vec<_>>()
        );
    }

    StructuredIntent::new(service, action, parameters, confidence)
}

/// Check a raw record against the output schema without repairing it
pub fn validate_response(value: &Value) -> bool {
    let Some(record) = value.as_object() else {
        return false;
    };

    let service_ok = record
        .get("service")
        .and_then(Value::as_str)
        .and_then(IntentService::from_str)
        .is_some();
    let action_ok = record.get("action").map(Value::is_string).unwrap_or(false);
    let parameters_ok = record.get("parameters").map(Value::is_object).unwrap_or(false);
    let confidence_ok = record
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| (0.0..=1.0).contains(&c))
        .unwrap_or(false);

    service_ok && action_ok && parameters_ok && confidence_ok
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
