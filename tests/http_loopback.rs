//! The production reqwest transport against a local HTTP/1.1 server.
//!
//! Each test starts a one-thread server on 127.0.0.1 that answers the
//! scripted responses in order (one per connection) and records what it
//! received.

use nutrient_dws::{ClientConfig, DwsClient, DwsError, STREAMING_THRESHOLD};
use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

// ── Test server ──────────────────────────────────────────────────────────────

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
    /// Close the socket after the request head, without answering.
    hang_up: bool,
}

fn reply(status: u16, body: &str) -> Reply {
    Reply {
        status,
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
        hang_up: false,
    }
}

fn hang_up() -> Reply {
    Reply {
        hang_up: true,
        ..reply(0, "")
    }
}

#[derive(Debug, Clone)]
struct Received {
    request_line: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Received {
    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

struct Server {
    base_url: String,
    received: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

impl Server {
    fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let handle = thread::spawn(move || {
            for r in replies {
                let (stream, _) = listener.accept().unwrap();
                let req = handle_one(stream, &r);
                log.lock().unwrap().push(req);
            }
        });
        Self {
            base_url,
            received,
            handle,
        }
    }

    fn finish(self) -> Vec<Received> {
        self.handle.join().unwrap();
        let received = self.received.lock().unwrap().clone();
        received
    }
}

fn handle_one(stream: TcpStream, r: &Reply) -> Received {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
    }

    if r.hang_up {
        return Received {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: Vec::new(),
        };
    }

    let body = if let Some(len) = headers.get("content-length") {
        let mut body = vec![0; len.parse().unwrap()];
        reader.read_exact(&mut body).unwrap();
        body
    } else if headers.get("transfer-encoding").map(String::as_str) == Some("chunked") {
        read_chunked(&mut reader)
    } else {
        Vec::new()
    };

    let mut out = stream;
    let mut head = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n",
        r.status,
        r.body.len()
    );
    for (k, v) in &r.headers {
        head.push_str(&format!("{k}: {v}\r\n"));
    }
    head.push_str("\r\n");
    out.write_all(head.as_bytes()).unwrap();
    out.write_all(&r.body).unwrap();
    out.flush().unwrap();

    Received {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    }
}

fn read_chunked(reader: &mut impl BufRead) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).unwrap();
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap();
        let mut chunk = vec![0; size + 2];
        reader.read_exact(&mut chunk).unwrap();
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&chunk[..size]);
    }
}

fn client_for(server: &Server, max_retries: u32) -> DwsClient {
    let config = ClientConfig::builder()
        .api_key("loopback-key")
        .base_url(server.base_url.clone())
        .timeout_secs(10)
        .max_retries(max_retries)
        .retry_backoff_ms(0)
        .build()
        .unwrap();
    DwsClient::with_config(config).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn build_request_shape() {
    let server = Server::start(vec![reply(200, "%PDF-from-server")]);
    let client = client_for(&server, 0);

    let bytes = client
        .build(b"%PDF-1.4 input".to_vec())
        .add_step("rotate-pages", json!({"degrees": 90}))
        .unwrap()
        .execute_bytes()
        .unwrap();
    assert_eq!(bytes, b"%PDF-from-server");

    let received = server.finish();
    assert_eq!(received.len(), 1);
    let req = &received[0];
    assert_eq!(req.request_line, "POST /build HTTP/1.1");
    assert_eq!(req.headers["authorization"], "Bearer loopback-key");
    assert!(req.headers["user-agent"].starts_with("nutrient-dws-rust/"));
    assert!(req.headers["content-type"].starts_with("multipart/form-data"));

    let body = req.body_text();
    assert!(body.contains(r#"name="file"; filename="document""#));
    assert!(body.contains("%PDF-1.4 input"));
    assert!(body.contains(r#"name="instructions""#));
    assert!(body.contains(r#""rotateBy":90"#));
}

#[test]
fn retries_then_succeeds() {
    let mut busy = reply(503, "busy");
    busy.headers.push(("Retry-After", "0".to_string()));
    let server = Server::start(vec![busy, reply(502, ""), reply(200, "ok")]);
    let client = client_for(&server, 3);

    let bytes = client.flatten_annotations(b"%PDF".to_vec(), None).unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"ok"[..]));

    let received = server.finish();
    assert_eq!(received.len(), 3);
    // each attempt carries the full upload
    for req in &received {
        assert!(req.body_text().contains(r#"name="instructions""#));
    }
}

#[test]
fn dropped_connection_is_retried() {
    let server = Server::start(vec![hang_up(), reply(200, "recovered")]);
    let client = client_for(&server, 3);

    let bytes = client.convert_to_pdf(b"%PDF".to_vec(), None).unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"recovered"[..]));

    let received = server.finish();
    assert_eq!(received.len(), 2);
    assert!(received[1].body_text().contains(r#"name="instructions""#));
}

#[test]
fn unauthorized_is_not_retried() {
    let server = Server::start(vec![reply(401, r#"{"message":"Invalid API key"}"#)]);
    let client = client_for(&server, 3);

    let err = client.convert_to_pdf(b"%PDF".to_vec(), None).unwrap_err();
    match err {
        DwsError::Authentication { message } => assert_eq!(message, "Invalid API key"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(server.finish().len(), 1);
}

#[test]
fn server_error_carries_request_id() {
    let mut failed = reply(400, r#"{"error":"bad part"}"#);
    failed.headers.push(("X-Request-Id", "req-42".to_string()));
    let server = Server::start(vec![failed]);
    let client = client_for(&server, 3);

    let err = client.convert_to_pdf(b"%PDF".to_vec(), None).unwrap_err();
    match &err {
        DwsError::Api {
            status_code,
            request_id,
            response_body,
            ..
        } => {
            assert_eq!(*status_code, Some(400));
            assert_eq!(request_id.as_deref(), Some("req-42"));
            assert_eq!(response_body.as_deref(), Some(r#"{"error":"bad part"}"#));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().contains("Request ID: req-42"));
    server.finish();
}

#[test]
fn legacy_endpoint_sends_form_fields() {
    let server = Server::start(vec![reply(200, "done")]);
    let client = client_for(&server, 0);

    let options = json!({"degrees": 180});
    client
        .process_tool("rotate", b"%PDF".to_vec(), options.as_object().unwrap(), None)
        .unwrap();

    let received = server.finish();
    assert_eq!(received[0].request_line, "POST /process/rotate HTTP/1.1");
    let body = received[0].body_text();
    assert!(body.contains(r#"name="degrees""#));
    assert!(body.contains("180"));
    assert!(!body.contains(r#"name="instructions""#));
}

#[test]
fn large_file_is_streamed_in_full() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.pdf");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"%PDF-large").unwrap();
    file.set_len(STREAMING_THRESHOLD + 1).unwrap();
    drop(file);

    let server = Server::start(vec![reply(200, "ok")]);
    let client = client_for(&server, 0);
    client.convert_to_pdf(path.as_path(), None).unwrap();

    let received = server.finish();
    let body = &received[0].body;
    assert!(body.len() as u64 > STREAMING_THRESHOLD);
    let text = String::from_utf8_lossy(&body[..4096.min(body.len())]).into_owned();
    assert!(text.contains(r#"filename="large.pdf""#));
}

#[test]
fn connection_refused_is_reported() {
    // grab a free port, then close it
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder()
        .api_key("k")
        .base_url(format!("http://127.0.0.1:{port}"))
        .max_retries(1)
        .retry_backoff_ms(0)
        .build()
        .unwrap();
    let client = DwsClient::with_config(config).unwrap();

    let err = client.convert_to_pdf(b"%PDF".to_vec(), None).unwrap_err();
    assert!(matches!(err, DwsError::Api { status_code: None, .. }));
    assert!(err.to_string().starts_with("Connection error"));
}
