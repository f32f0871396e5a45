//! # nutrient-dws
//!
//! Client for the Nutrient Document Web Services (DWS) API: convert, OCR,
//! watermark, redact, rotate, split and merge documents on a remote service.
//!
//! ## Request Overview
//!
//! ```text
//! FileInput (path / bytes / reader)
//!  │
//!  ├─ 1. Input     normalise to an upload part (files > 10 MiB stream from disk)
//!  ├─ 2. Workflow  tool steps ──▶ {parts, actions, output} instructions
//!  ├─ 3. HTTP      multipart POST /build with bearer auth
//!  ├─ 4. Retry     429 / 5xx / timeout / connect, exponential backoff
//!  └─ 5. Output    result bytes, or an atomic write to disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nutrient_dws::{DwsClient, WatermarkOptions};
//! use serde_json::json;
//!
//! fn main() -> Result<(), nutrient_dws::DwsError> {
//!     // Key from the argument, else NUTRIENT_API_KEY
//!     let client = DwsClient::new(None)?;
//!
//!     // One operation, one request
//!     let pdf = client
//!         .watermark_pdf("contract.pdf", WatermarkOptions::text("DRAFT"), None)?
//!         .unwrap_or_default();
//!     eprintln!("{} bytes", pdf.len());
//!
//!     // Several operations, still one request
//!     client
//!         .build("scan.docx")
//!         .add_step("ocr-pdf", json!({"language": "english"}))?
//!         .add_step("flatten-annotations", json!(null))?
//!         .set_output_options([("optimize", json!(true))])
//!         .execute_to_file("scan.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dws` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! nutrient-dws = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod direct;
pub mod error;
pub mod http;
pub mod input;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::DwsClient;
pub use config::{ClientConfig, ClientConfigBuilder, API_KEY_ENV, DEFAULT_BASE_URL};
pub use error::DwsError;
pub use http::{OutgoingRequest, RawResponse, RetryPolicy, Transport, TransportError};
pub use input::{get_file_size, save_file_output, FileInput, STREAMING_THRESHOLD};
pub use workflow::{
    Action, Instructions, Margins, NewPagePart, OcrOptions, Orientation, PageLabel, PageLayout,
    PageRange, Part, RedactionOptions, RedactionStrategy, RotateOptions, Tool, WatermarkOptions,
    Workflow,
};
