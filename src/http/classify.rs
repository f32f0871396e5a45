//! Map failed responses and transport errors onto [`DwsError`].
//!
//! | Outcome | Error |
//! |---------|-------|
//! | 401, 403 | [`DwsError::Authentication`] |
//! | 422 | [`DwsError::Validation`] with the body's field errors |
//! | any other ≥ 400 | [`DwsError::Api`] with status, body and request id |
//! | attempt timed out | [`DwsError::Timeout`] |
//! | other network failure | [`DwsError::Api`] wrapping the cause |

use super::transport::{RawResponse, TransportError};
use crate::error::DwsError;
use serde_json::{Map, Value};

/// Classify a non-2xx response.
pub fn classify_response(response: RawResponse) -> DwsError {
    let json: Option<Value> = serde_json::from_slice(&response.body).ok();
    let text = String::from_utf8_lossy(&response.body).trim().to_string();
    let message = json.as_ref().and_then(extract_message);

    match response.status {
        401 | 403 => DwsError::Authentication {
            message: message
                .or_else(|| (!text.is_empty()).then(|| text.clone()))
                .unwrap_or_else(|| "Authentication failed".to_string()),
        },
        422 => DwsError::Validation {
            message: message.unwrap_or_else(|| "Validation failed".to_string()),
            errors: json.as_ref().map(extract_field_errors).unwrap_or_default(),
        },
        status => DwsError::Api {
            message: message.unwrap_or_else(|| format!("API request failed with HTTP {status}")),
            status_code: Some(status),
            response_body: (!text.is_empty()).then_some(text),
            request_id: response.request_id,
        },
    }
}

/// Classify a failure that produced no response at all.
pub fn classify_transport_error(err: TransportError, timeout_secs: u64) -> DwsError {
    match err {
        TransportError::Timeout => DwsError::Timeout { secs: timeout_secs },
        TransportError::Connect(cause) => api_without_status(format!("Connection error: {cause}")),
        TransportError::Body(cause) => api_without_status(format!("Upload failed: {cause}")),
        TransportError::Other(cause) => api_without_status(format!("Request failed: {cause}")),
    }
}

fn api_without_status(message: String) -> DwsError {
    DwsError::Api {
        message,
        status_code: None,
        response_body: None,
        request_id: None,
    }
}

/// First string among `message`, `error`, `detail`.
fn extract_message(body: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn extract_field_errors(body: &Value) -> Map<String, Value> {
    ["errors", "details"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_object))
        .cloned()
        .unwrap_or_default()
}
