//! Multi-step workflows executed in a single build request.
//!
//! ## Data Flow
//!
//! ```text
//! DwsClient::build(input)
//!     │
//!     ├─ add_step / add_tool      tool name + options ──▶ wire Action
//!     ├─ set_output_options       output keys merged (last write wins per key)
//!     ▼
//! execute(output_path)
//!     │
//!     ├─ normalise every FileInput (local errors surface here, before I/O)
//!     ├─ {parts, actions, output} ──▶ "instructions" field
//!     ├─ POST /build via HttpClient (retries live there)
//!     └─ bytes ──▶ returned, or written atomically to output_path
//! ```
//!
//! `execute` consumes the workflow, so a built workflow cannot be reused.

pub mod instructions;
pub mod pages;
pub mod tool;

pub use instructions::{
    Action, Instructions, KnownAction, Margins, NewPagePart, Orientation, PageLabel, PageLayout,
    PageRange, Part, PassthroughAction,
};
pub use tool::{
    OcrOptions, RedactionOptions, RedactionStrategy, RotateOptions, Tool, WatermarkOptions,
};

use crate::error::DwsError;
use crate::http::HttpClient;
use crate::input::{prepare_file_for_upload, save_file_output, FileInput, UploadPart};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Multipart field of the primary input.
pub const PRIMARY_FIELD: &str = "file";

/// Endpoint accepting an instruction document.
pub const BUILD_ENDPOINT: &str = "/build";

/// A pending build request.
///
/// Created by [`crate::DwsClient::build`] or [`crate::DwsClient::build_merge`].
/// Nothing touches the filesystem or network until [`Workflow::execute`].
#[derive(Debug)]
pub struct Workflow<'c> {
    http: &'c HttpClient,
    files: Vec<(String, FileInput)>,
    parts: Vec<Part>,
    actions: Vec<Action>,
    output: Map<String, Value>,
}

impl<'c> Workflow<'c> {
    pub(crate) fn new(http: &'c HttpClient, input: FileInput) -> Self {
        Self {
            http,
            files: vec![(PRIMARY_FIELD.to_string(), input)],
            parts: vec![Part::file(PRIMARY_FIELD)],
            actions: Vec::new(),
            output: Map::new(),
        }
    }

    /// One part per input, in order, uploaded as `file0`, `file1`, ...
    pub(crate) fn merge(http: &'c HttpClient, inputs: Vec<FileInput>) -> Result<Self, DwsError> {
        if inputs.is_empty() {
            return Err(DwsError::InvalidArgument(
                "at least one input file is required".into(),
            ));
        }
        let files: Vec<(String, FileInput)> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| (format!("file{i}"), input))
            .collect();
        let parts = files.iter().map(|(field, _)| Part::file(field.as_str())).collect();
        Ok(Self {
            http,
            files,
            parts,
            actions: Vec::new(),
            output: Map::new(),
        })
    }

    /// Append a step by tool name.
    ///
    /// `options` is a JSON object of snake_case keys, or `null` for none.
    ///
    /// ```rust,no_run
    /// # fn main() -> Result<(), nutrient_dws::DwsError> {
    /// use nutrient_dws::DwsClient;
    /// use serde_json::json;
    ///
    /// let client = DwsClient::new(Some("pdf_live_..."))?;
    /// client
    ///     .build("scan.pdf")
    ///     .add_step("ocr-pdf", json!({"language": "english"}))?
    ///     .add_step("rotate-pages", json!({"degrees": 90, "page_indexes": [0]}))?
    ///     .execute_to_file("out.pdf")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_step(self, tool: &str, options: Value) -> Result<Self, DwsError> {
        let options = match options {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DwsError::InvalidArgument(format!(
                    "options for '{tool}' must be a JSON object, got {other}"
                )))
            }
        };
        self.add_tool(Tool::parse(tool, options)?)
    }

    /// Append a typed step.
    pub fn add_tool(mut self, tool: Tool) -> Result<Self, DwsError> {
        let field = self.attachment_field(tool.name());
        let lowered = tool.lower(&field)?;
        debug!("Added step '{}'", lowered.action.kind());
        self.actions.push(lowered.action);
        if let Some(attachment) = lowered.attachment {
            self.files.push(attachment);
        }
        Ok(self)
    }

    /// Merge keys into the output options; a repeated key takes the later value.
    pub fn set_output_options<K, I>(mut self, options: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.output
            .extend(options.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Store page labels under the `labels` output option.
    pub fn set_page_labels(mut self, labels: &[PageLabel]) -> Result<Self, DwsError> {
        if labels.is_empty() {
            return Err(DwsError::InvalidArgument(
                "at least one page label is required".into(),
            ));
        }
        for label in labels {
            pages::validate_range(&label.pages)?;
        }
        self.output
            .insert("labels".to_string(), serde_json::to_value(labels)?);
        Ok(self)
    }

    /// Replace the document parts, e.g. with a page selection.
    pub fn with_parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    /// The instruction document as it would be sent.
    pub fn instructions(&self) -> Instructions {
        Instructions {
            parts: self.parts.clone(),
            actions: self.actions.clone(),
            output: (!self.output.is_empty()).then(|| self.output.clone()),
        }
    }

    /// Send the workflow.
    ///
    /// Returns the result bytes, or writes them to `output_path` and returns
    /// `None`.
    pub fn execute(self, output_path: Option<&Path>) -> Result<Option<Vec<u8>>, DwsError> {
        let instructions = self.instructions();
        if instructions.parts.is_empty() {
            return Err(DwsError::InvalidArgument(
                "a workflow needs at least one part".into(),
            ));
        }

        let uploads = self
            .files
            .into_iter()
            .map(|(field, input)| prepare_file_for_upload(input, &field))
            .collect::<Result<Vec<UploadPart>, _>>()?;

        info!(
            "Executing workflow: {} part(s), {} action(s), {} file(s)",
            instructions.parts.len(),
            instructions.actions.len(),
            uploads.len()
        );
        let bytes = self
            .http
            .post(BUILD_ENDPOINT, &uploads, &[], Some(&instructions))?;

        match output_path {
            Some(path) => {
                save_file_output(&bytes, path)?;
                Ok(None)
            }
            None => Ok(Some(bytes)),
        }
    }

    /// Send the workflow and return the result bytes.
    pub fn execute_bytes(self) -> Result<Vec<u8>, DwsError> {
        self.execute(None)
            .map(|bytes| bytes.unwrap_or_default())
    }

    /// Send the workflow and write the result to `path`.
    pub fn execute_to_file(self, path: impl AsRef<Path>) -> Result<(), DwsError> {
        self.execute(Some(path.as_ref())).map(|_| ())
    }

    fn attachment_field(&self, tool_name: &str) -> String {
        let base = tool_name.trim_start_matches("apply-").replace('-', "_");
        let taken = |name: &str| self.files.iter().any(|(f, _)| f == name);
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let name = format!("{base}_{n}");
            if !taken(&name) {
                return name;
            }
            n += 1;
        }
    }
}
