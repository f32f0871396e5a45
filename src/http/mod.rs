//! Transport client: authenticated multipart POSTs with retry.
//!
//! ## Data Flow
//!
//! ```text
//! post() ──▶ credential check ──▶ Transport::send ──▶ 2xx? ──▶ body bytes
//!                 │                     ▲   │
//!                 ▼                     │   ▼ 429/5xx, timeout, connect
//!        AuthenticationError            └── backoff (1s, 2s, 4s)
//!                                           │ exhausted / other 4xx
//!                                           ▼
//!                                      classify ──▶ DwsError
//! ```
//!
//! 1. [`transport`] — one attempt over a pooled reqwest client
//! 2. [`retry`]     — which failures are retried and how long to wait
//! 3. [`classify`]  — status codes and network failures → [`DwsError`]

pub mod classify;
pub mod retry;
pub mod transport;

pub use retry::RetryPolicy;
pub use transport::{OutgoingRequest, RawResponse, ReqwestTransport, Transport, TransportError};

use crate::config::{ClientConfig, API_KEY_ENV};
use crate::error::DwsError;
use crate::input::UploadPart;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

/// Name of the multipart field carrying the JSON instruction document.
pub const INSTRUCTIONS_FIELD: &str = "instructions";

/// Authenticated HTTP client shared by the workflow and direct APIs.
///
/// Holds one connection pool for its whole life. The only state change
/// after construction is [`HttpClient::close`].
pub struct HttpClient {
    transport: Box<dyn Transport>,
    api_key: Option<String>,
    config: ClientConfig,
    retry: RetryPolicy,
    closed: bool,
}

impl HttpClient {
    /// Build a client over the production reqwest transport.
    ///
    /// The credential is resolved here, once.
    pub fn new(config: ClientConfig) -> Result<Self, DwsError> {
        let api_key = config.resolve_api_key();
        let transport = ReqwestTransport::new(&config, api_key.as_deref())?;
        Ok(Self::with_transport(config, api_key, Box::new(transport)))
    }

    /// Build a client over any [`Transport`].
    ///
    /// `api_key` is used only for the local presence check; the transport is
    /// responsible for sending it.
    pub fn with_transport(
        config: ClientConfig,
        api_key: Option<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            transport,
            api_key: api_key.filter(|k| !k.is_empty()),
            config,
            retry,
            closed: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST to `endpoint` and return the raw response body.
    ///
    /// `instructions`, when given, is JSON-encoded into the
    /// [`INSTRUCTIONS_FIELD`] text field alongside `files` and `form`.
    ///
    /// # Errors
    /// - [`DwsError::Authentication`] — no credential (no request is sent), 401, 403
    /// - [`DwsError::Validation`] — 422
    /// - [`DwsError::Api`] — other failure status, or a non-timeout network failure
    /// - [`DwsError::Timeout`] — the last attempt timed out
    pub fn post<I: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        files: &[UploadPart],
        form: &[(String, String)],
        instructions: Option<&I>,
    ) -> Result<Vec<u8>, DwsError> {
        if self.closed {
            return Err(DwsError::ClientClosed);
        }
        if self.api_key.is_none() {
            return Err(DwsError::authentication(format!(
                "API key is required. Pass one explicitly or set {API_KEY_ENV}."
            )));
        }

        let mut fields = form.to_vec();
        if let Some(instr) = instructions {
            fields.push((INSTRUCTIONS_FIELD.to_string(), serde_json::to_string(instr)?));
        }

        let url = self.config.url_for(endpoint);
        let request = OutgoingRequest {
            url: &url,
            files,
            fields: &fields,
        };

        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            debug!("POST {} (attempt {})", url, attempts);

            let retry_after = match self.transport.send(&request) {
                Ok(response) if response.is_success() => {
                    debug!(
                        "POST {} succeeded after {} attempt(s) in {:?}",
                        url,
                        attempts,
                        start.elapsed()
                    );
                    return Ok(response.body);
                }
                Ok(response)
                    if retry::is_retryable_status(response.status)
                        && self.retry.can_retry(attempts) =>
                {
                    warn!(
                        "POST {}: HTTP {} on attempt {}, retrying",
                        url, response.status, attempts
                    );
                    response.retry_after
                }
                Ok(response) => return Err(classify::classify_response(response)),
                Err(e) if e.is_transient() && self.retry.can_retry(attempts) => {
                    warn!("POST {}: {} on attempt {}, retrying", url, e, attempts);
                    None
                }
                Err(e) => {
                    return Err(classify::classify_transport_error(
                        e,
                        self.config.timeout_secs,
                    ))
                }
            };

            let delay = self.retry.delay_for(attempts, retry_after);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    /// Release the connection pool. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.closed {
            self.transport.close();
            self.closed = true;
            debug!("HTTP client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("has_api_key", &self.has_api_key())
            .field("retry", &self.retry)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned outcomes and counts attempts.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        attempts: Arc<Mutex<u32>>,
        fields_seen: Arc<Mutex<Vec<(String, String)>>>,
    }

    fn client_with(
        outcomes: Vec<Result<RawResponse, TransportError>>,
        api_key: Option<&str>,
    ) -> (HttpClient, Arc<Mutex<u32>>, Arc<Mutex<Vec<(String, String)>>>) {
        let attempts = Arc::new(Mutex::new(0));
        let fields_seen = Arc::new(Mutex::new(Vec::new()));
        let transport = Scripted {
            outcomes: Mutex::new(outcomes.into()),
            attempts: Arc::clone(&attempts),
            fields_seen: Arc::clone(&fields_seen),
        };
        let config = ClientConfig::builder().retry_backoff_ms(0).build().unwrap();
        let client =
            HttpClient::with_transport(config, api_key.map(String::from), Box::new(transport));
        (client, attempts, fields_seen)
    }

    impl Transport for Scripted {
        fn send(&self, request: &OutgoingRequest<'_>) -> Result<RawResponse, TransportError> {
            *self.attempts.lock().unwrap() += 1;
            *self.fields_seen.lock().unwrap() = request.fields.to_vec();
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::new(200, "default")))
        }
    }

    fn post(client: &HttpClient) -> Result<Vec<u8>, DwsError> {
        client.post::<serde_json::Value>("/build", &[], &[], None)
    }

    #[test]
    fn retries_until_success() {
        let (client, attempts, _) = client_with(
            vec![
                Ok(RawResponse::new(500, "")),
                Ok(RawResponse::new(502, "")),
                Ok(RawResponse::new(200, "Success after retry")),
            ],
            Some("key"),
        );
        assert_eq!(post(&client).unwrap(), b"Success after retry");
        assert_eq!(*attempts.lock().unwrap(), 3);
    }

    #[test]
    fn missing_key_fails_without_attempt() {
        let (client, attempts, _) = client_with(vec![], None);
        let err = post(&client).unwrap_err();
        assert!(matches!(err, DwsError::Authentication { .. }));
        assert!(err.to_string().contains("API key is required"));
        assert_eq!(*attempts.lock().unwrap(), 0);
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let (client, attempts, _) = client_with(vec![], Some(""));
        assert!(!client.has_api_key());
        assert!(post(&client).is_err());
        assert_eq!(*attempts.lock().unwrap(), 0);
    }

    #[test]
    fn non_retryable_status_fails_immediately() {
        let (client, attempts, _) = client_with(
            vec![Ok(RawResponse::new(400, r#"{"message":"bad"}"#))],
            Some("key"),
        );
        let err = post(&client).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[test]
    fn exhausted_retries_surface_last_status() {
        let (client, attempts, _) = client_with(
            (0..10).map(|_| Ok(RawResponse::new(503, "busy"))).collect(),
            Some("key"),
        );
        let err = post(&client).unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(*attempts.lock().unwrap(), 4);
    }

    #[test]
    fn timeouts_are_retried_then_reported() {
        let (client, attempts, _) = client_with(
            (0..4).map(|_| Err(TransportError::Timeout)).collect(),
            Some("key"),
        );
        let err = post(&client).unwrap_err();
        assert!(matches!(err, DwsError::Timeout { secs: 300 }));
        assert_eq!(*attempts.lock().unwrap(), 4);
    }

    #[test]
    fn connection_error_recovers() {
        let (client, attempts, _) = client_with(
            vec![
                Err(TransportError::Connect("refused".into())),
                Ok(RawResponse::new(200, "ok")),
            ],
            Some("key"),
        );
        assert_eq!(post(&client).unwrap(), b"ok");
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn instructions_are_added_as_json_field() {
        let (client, _, fields) = client_with(vec![], Some("key"));
        let instr = serde_json::json!({"parts": [{"file": "file"}], "actions": []});
        client
            .post("/build", &[], &[("extra".into(), "1".into())], Some(&instr))
            .unwrap();
        let fields = fields.lock().unwrap();
        assert_eq!(fields[0], ("extra".to_string(), "1".to_string()));
        assert_eq!(fields[1].0, INSTRUCTIONS_FIELD);
        let sent: serde_json::Value = serde_json::from_str(&fields[1].1).unwrap();
        assert_eq!(sent, instr);
    }

    #[test]
    fn closed_client_rejects_requests() {
        let (mut client, attempts, _) = client_with(vec![], Some("key"));
        client.close();
        client.close();
        assert!(client.is_closed());
        assert!(matches!(post(&client), Err(DwsError::ClientClosed)));
        assert_eq!(*attempts.lock().unwrap(), 0);
    }
}
