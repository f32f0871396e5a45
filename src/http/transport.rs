//! One HTTP attempt, behind a trait.
//!
//! [`Transport`] sends exactly one request and reports what came back. It
//! knows nothing about retries or error taxonomy; [`super::HttpClient`] layers
//! both on top. Tests swap in a scripted implementation to observe attempts
//! without a network.

use crate::config::ClientConfig;
use crate::error::DwsError;
use crate::input::{UploadContent, UploadPart};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Response header carrying the server-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A multipart POST, borrowed from the caller for the length of one attempt.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingRequest<'a> {
    pub url: &'a str,
    /// File parts; stream parts are rewound before each attempt.
    pub files: &'a [UploadPart],
    /// Plain text fields, including the JSON-encoded `instructions` field.
    pub fields: &'a [(String, String)],
}

impl OutgoingRequest<'_> {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.fields.is_empty()
    }
}

/// What a single attempt produced at the HTTP level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub request_id: Option<String>,
    /// Parsed `Retry-After` (delta-seconds form only).
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// A response with no headers of interest.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            request_id: None,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any HTTP status was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The attempt exceeded the per-request timeout.
    #[error("request timed out")]
    Timeout,

    /// DNS failure, refused connection, or a connection dropped mid-request.
    #[error("connection failed: {0}")]
    Connect(String),

    /// An upload stream could not be rewound or cloned.
    #[error("upload stream unavailable: {0}")]
    Body(#[source] std::io::Error),

    /// Anything else reported by the HTTP stack.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Network conditions worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connect(_))
    }
}

/// Sends one HTTP request.
///
/// Implementations must be shareable across threads: a client may be used
/// from several caller threads at once, and holds no per-request state.
pub trait Transport: Send + Sync {
    fn send(&self, request: &OutgoingRequest<'_>) -> Result<RawResponse, TransportError>;

    /// Release pooled connections. Must be idempotent.
    fn close(&mut self) {}
}

/// The production transport: a pooled blocking reqwest client.
pub struct ReqwestTransport {
    client: Option<reqwest::blocking::Client>,
}

impl ReqwestTransport {
    /// Build the connection pool with default headers injected once.
    ///
    /// The `Authorization` header is only set when a key is present; callers
    /// reject key-less requests before they reach the transport.
    pub fn new(config: &ClientConfig, api_key: Option<&str>) -> Result<Self, DwsError> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| DwsError::InvalidConfig(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, ua);
        if let Some(key) = api_key {
            let mut auth = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| DwsError::InvalidConfig("API key contains invalid characters".into()))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| DwsError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Some(client),
        })
    }

    fn build_form(request: &OutgoingRequest<'_>) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for upload in request.files {
            let part = match &upload.content {
                UploadContent::Bytes(bytes) => Part::bytes(bytes.clone()),
                UploadContent::Stream { file, len } => {
                    let handle =
                        UploadContent::rewound_stream(file).map_err(TransportError::Body)?;
                    Part::reader_with_length(handle, *len)
                }
            };
            let part = part
                .file_name(upload.filename.clone())
                .mime_str(&upload.content_type)
                .map_err(|e| TransportError::Other(e.to_string()))?;
            form = form.part(upload.field_name.clone(), part);
        }
        for (name, value) in request.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &OutgoingRequest<'_>) -> Result<RawResponse, TransportError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| TransportError::Other("transport closed".into()))?;

        let mut builder = client.post(request.url);
        if !request.is_empty() {
            builder = builder.multipart(Self::build_form(request)?);
        }

        let response = builder.send().map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.bytes().map_err(map_reqwest_error)?.to_vec();

        debug!("Response: {} ({} bytes)", status, body.len());
        Ok(RawResponse {
            status,
            request_id,
            retry_after,
            body,
        })
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Connection pool released");
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect()
        || (e.is_request() && e.status().is_none())
        || is_dropped_connection(&e)
    {
        // includes pooled connections the server closed before answering
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Whether any cause in the chain is a reset, aborted or truncated socket.
fn is_dropped_connection(err: &(dyn StdError + 'static)) -> bool {
    let mut cause = Some(err);
    while let Some(e) = cause {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        cause = e.source();
    }
    false
}
