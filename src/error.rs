//! Error types for the nutrient-dws library.
//!
//! Every fallible operation returns [`DwsError`]. The variants fall into two
//! groups that fail at different times:
//!
//! * **Local** — bad input file, bad arguments, missing credential. These are
//!   detected before any network call, so nothing has been sent and no output
//!   file has been touched.
//!
//! * **Remote** — the service rejected the request (401/403, 422, other
//!   4xx/5xx) or the network gave out. Transient failures are retried inside
//!   the transport first; these variants only surface once retries are
//!   exhausted or the status is not retryable.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the nutrient-dws library.
#[derive(Debug, Error)]
pub enum DwsError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// Credential missing locally, or rejected by the service (401/403).
    #[error("{message}")]
    Authentication { message: String },

    // ── Server errors ─────────────────────────────────────────────────────
    /// The service accepted the request but rejected its content (422).
    #[error("{message}")]
    Validation {
        message: String,
        /// Field-level detail from the response body, empty when absent.
        errors: serde_json::Map<String, serde_json::Value>,
    },

    /// Any other failure status, or a network failure that is not a timeout.
    #[error("{}", format_api_error(.message, .status_code, .request_id, .response_body))]
    Api {
        message: String,
        status_code: Option<u16>,
        response_body: Option<String>,
        request_id: Option<String>,
    },

    /// A single attempt exceeded the configured request timeout.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The input exists but cannot be uploaded (directory, socket, ...).
    #[error("Unsupported file input: {detail}")]
    UnsupportedInput { detail: String },

    /// Reading an input or writing an output failed.
    #[error("File processing failed for '{path}': {source}")]
    FileProcessing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Arguments are empty, contradictory, or out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ── Client errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request was issued on a client after [`crate::DwsClient::close`].
    #[error("Client has been closed")]
    ClientClosed,

    /// The instruction document could not be serialised.
    #[error("Failed to serialise instructions: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DwsError {
    /// Shorthand for the common "missing or rejected credential" case.
    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        DwsError::Authentication {
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DwsError::Api { status_code, .. } => *status_code,
            DwsError::Validation { .. } => Some(422),
            _ => None,
        }
    }

    /// `true` for failures caused by caller-supplied input or arguments.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            DwsError::FileNotFound { .. }
                | DwsError::UnsupportedInput { .. }
                | DwsError::InvalidArgument(_)
                | DwsError::InvalidConfig(_)
                | DwsError::ClientClosed
                | DwsError::Serialization(_)
        )
    }
}

/// `"<message> | Status: <code> | Request ID: <id> | Response: <body>"`, absent parts omitted.
fn format_api_error(
    message: &str,
    status_code: &Option<u16>,
    request_id: &Option<String>,
    response_body: &Option<String>,
) -> String {
    let mut out = if message.is_empty() {
        "API Error".to_string()
    } else {
        message.to_string()
    };
    if let Some(code) = status_code {
        out.push_str(&format!(" | Status: {code}"));
    }
    if let Some(id) = request_id {
        out.push_str(&format!(" | Request ID: {id}"));
    }
    if let Some(body) = response_body {
        out.push_str(&format!(" | Response: {body}"));
    }
    out
}
