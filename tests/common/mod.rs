//! Shared helpers for integration tests.

#![allow(dead_code)]

use nutrient_dws::{ClientConfig, DwsClient, OutgoingRequest, RawResponse, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Sent {
    pub url: String,
    /// `(field name, filename, byte length)` per file part.
    pub files: Vec<(String, String, u64)>,
    pub fields: Vec<(String, String)>,
}

impl Sent {
    /// The decoded `instructions` field.
    pub fn instructions(&self) -> Value {
        let (_, raw) = self
            .fields
            .iter()
            .find(|(name, _)| name == "instructions")
            .expect("no instructions field");
        serde_json::from_str(raw).expect("instructions are not JSON")
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.files.iter().map(|(f, _, _)| f.as_str()).collect()
    }
}

/// Replays canned responses in order; defaults to `200 "%PDF-ok"`.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &OutgoingRequest<'_>) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(Sent {
            url: request.url.to_string(),
            files: request
                .files
                .iter()
                .map(|f| (f.field_name.clone(), f.filename.clone(), f.content.len()))
                .collect(),
            fields: request.fields.to_vec(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::new(200, "%PDF-ok")))
    }
}

/// A client with an explicit key, zero backoff and a scripted transport.
pub fn scripted_client(
    outcomes: Vec<Result<RawResponse, TransportError>>,
) -> (DwsClient, Arc<Mutex<Vec<Sent>>>) {
    let config = ClientConfig::builder()
        .api_key("test-key")
        .retry_backoff_ms(0)
        .build()
        .unwrap();
    scripted_client_with(config, outcomes)
}

pub fn scripted_client_with(
    config: ClientConfig,
    outcomes: Vec<Result<RawResponse, TransportError>>,
) -> (DwsClient, Arc<Mutex<Vec<Sent>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        outcomes: Mutex::new(outcomes.into()),
        sent: Arc::clone(&sent),
    };
    (DwsClient::with_transport(config, Box::new(transport)), sent)
}

pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n%test\n".to_vec()
}
