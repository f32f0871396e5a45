//! Single-operation helpers on [`DwsClient`].
//!
//! Each helper is a one-step workflow: it accepts any [`FileInput`], sends a
//! single request, and either returns the result bytes or writes them to
//! `output_path` and returns `None`. Office documents given to any helper
//! are converted to PDF by the service first.

use crate::client::DwsClient;
use crate::error::DwsError;
use crate::input::{prepare_file_for_upload, save_file_output, FileInput};
use crate::workflow::pages::{self, validate_range};
use crate::workflow::{
    Instructions, NewPagePart, OcrOptions, PageLabel, PageLayout, PageRange, Part,
    RedactionOptions, RotateOptions, Tool, WatermarkOptions, BUILD_ENDPOINT, PRIMARY_FIELD,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

type Output = Result<Option<Vec<u8>>, DwsError>;

impl DwsClient {
    /// Convert an Office document (or pass a PDF through unchanged).
    pub fn convert_to_pdf(&self, input: impl Into<FileInput>, output_path: Option<&Path>) -> Output {
        self.build(input).execute(output_path)
    }

    /// Burn annotations and form fields into page content.
    pub fn flatten_annotations(
        &self,
        input: impl Into<FileInput>,
        output_path: Option<&Path>,
    ) -> Output {
        self.run_tool(input, Tool::FlattenAnnotations, output_path)
    }

    /// Rotate pages clockwise by `degrees` (a multiple of 90).
    ///
    /// `page_indexes` restricts the rotation; `None` rotates every page.
    pub fn rotate_pages(
        &self,
        input: impl Into<FileInput>,
        degrees: i32,
        page_indexes: Option<Vec<i64>>,
        output_path: Option<&Path>,
    ) -> Output {
        let tool = Tool::RotatePages(RotateOptions {
            degrees: Some(degrees),
            page_indexes,
        });
        self.run_tool(input, tool, output_path)
    }

    /// Make scanned pages searchable.
    pub fn ocr_pdf(
        &self,
        input: impl Into<FileInput>,
        language: &str,
        output_path: Option<&Path>,
    ) -> Output {
        let tool = Tool::Ocr(OcrOptions {
            language: Some(language.to_string()),
        });
        self.run_tool(input, tool, output_path)
    }

    /// Stamp a text or image watermark on every page.
    pub fn watermark_pdf(
        &self,
        input: impl Into<FileInput>,
        options: WatermarkOptions,
        output_path: Option<&Path>,
    ) -> Output {
        self.run_tool(input, Tool::Watermark(options), output_path)
    }

    /// Apply existing redaction annotations, removing the covered content.
    pub fn apply_redactions(&self, input: impl Into<FileInput>, output_path: Option<&Path>) -> Output {
        self.run_tool(input, Tool::ApplyRedactions, output_path)
    }

    /// Mark content matching `options` for redaction.
    ///
    /// The returned document carries redaction annotations only; follow with
    /// [`DwsClient::apply_redactions`] to remove the content.
    pub fn create_redactions(
        &self,
        input: impl Into<FileInput>,
        options: RedactionOptions,
        output_path: Option<&Path>,
    ) -> Output {
        self.run_tool(input, Tool::CreateRedactions(options), output_path)
    }

    /// Import annotations from an Instant JSON file.
    pub fn apply_instant_json(
        &self,
        input: impl Into<FileInput>,
        instant_json: impl Into<FileInput>,
        output_path: Option<&Path>,
    ) -> Output {
        self.run_tool(input, Tool::ApplyInstantJson(instant_json.into()), output_path)
    }

    /// Import annotations from an XFDF file.
    pub fn apply_xfdf(
        &self,
        input: impl Into<FileInput>,
        xfdf: impl Into<FileInput>,
        output_path: Option<&Path>,
    ) -> Output {
        self.run_tool(input, Tool::ApplyXfdf(xfdf.into()), output_path)
    }

    /// Split into one document per range, one request each.
    ///
    /// With no ranges the first page is extracted. When `output_paths` is
    /// given it must match the range count; results are written there only
    /// after every range has succeeded, and an empty list is returned.
    pub fn split_pdf(
        &self,
        input: impl Into<FileInput>,
        page_ranges: Option<&[PageRange]>,
        output_paths: Option<&[PathBuf]>,
    ) -> Result<Vec<Vec<u8>>, DwsError> {
        let default_range = [PageRange::new(0, 1)];
        let ranges = match page_ranges {
            Some(r) if !r.is_empty() => r,
            _ => &default_range[..],
        };
        if let Some(paths) = output_paths {
            if paths.len() != ranges.len() {
                return Err(DwsError::InvalidArgument(format!(
                    "output_paths length ({}) must match page_ranges length ({})",
                    paths.len(),
                    ranges.len()
                )));
            }
        }
        for range in ranges {
            validate_range(range)?;
        }

        let upload = prepare_file_for_upload(input.into(), PRIMARY_FIELD)?;
        let mut results = Vec::with_capacity(ranges.len());
        for (i, range) in ranges.iter().enumerate() {
            let part = upload.try_clone().map_err(|e| DwsError::FileProcessing {
                path: PathBuf::from(&upload.filename),
                source: e,
            })?;
            let instructions =
                Instructions::from_parts(vec![Part::file_pages(PRIMARY_FIELD, *range)]);
            info!("Splitting range {}/{}", i + 1, ranges.len());
            let bytes = self
                .http()
                .post(BUILD_ENDPOINT, &[part], &[], Some(&instructions))?;
            results.push(bytes);
        }

        // nothing is written until every range has succeeded
        if let Some(paths) = output_paths {
            for (bytes, path) in results.iter().zip(paths) {
                save_file_output(bytes, path)?;
            }
            results.clear();
        }
        Ok(results)
    }

    /// Build a document from the given pages, repeating any listed twice.
    ///
    /// Negative indices count back from the last page (-1 is the last).
    pub fn duplicate_pdf_pages(
        &self,
        input: impl Into<FileInput>,
        page_indexes: &[i64],
        output_path: Option<&Path>,
    ) -> Output {
        let parts = pages::duplicate_parts(PRIMARY_FIELD, page_indexes)?;
        self.build(input).with_parts(parts).execute(output_path)
    }

    /// Remove the given pages. Only non-negative indices are accepted.
    pub fn delete_pdf_pages(
        &self,
        input: impl Into<FileInput>,
        page_indexes: &[i64],
        output_path: Option<&Path>,
    ) -> Output {
        let parts = pages::delete_parts(PRIMARY_FIELD, page_indexes)?;
        self.build(input).with_parts(parts).execute(output_path)
    }

    /// Insert `page_count` blank pages after page `after_page_index`, or at
    /// the end when it is `None`.
    pub fn add_page(
        &self,
        input: impl Into<FileInput>,
        page_count: u32,
        after_page_index: Option<i64>,
        layout: PageLayout,
        output_path: Option<&Path>,
    ) -> Output {
        let parts = pages::insert_blank_parts(
            PRIMARY_FIELD,
            after_page_index,
            NewPagePart::new(page_count, layout),
        )?;
        self.build(input).with_parts(parts).execute(output_path)
    }

    /// Concatenate at least two documents in order.
    pub fn merge_pdfs<I>(&self, inputs: I, output_path: Option<&Path>) -> Output
    where
        I: IntoIterator,
        I::Item: Into<FileInput>,
    {
        let inputs: Vec<FileInput> = inputs.into_iter().map(Into::into).collect();
        if inputs.len() < 2 {
            return Err(DwsError::InvalidArgument(
                "at least 2 files are required for merge".into(),
            ));
        }
        self.build_merge(inputs)?.execute(output_path)
    }

    /// Attach page labels shown by PDF viewers in place of page numbers.
    pub fn set_page_labels(
        &self,
        input: impl Into<FileInput>,
        labels: &[PageLabel],
        output_path: Option<&Path>,
    ) -> Output {
        self.build(input)
            .set_page_labels(labels)?
            .execute(output_path)
    }

    /// Call the single-tool endpoint `POST /process/{tool}`.
    ///
    /// Options are sent as form fields. Strings, numbers and booleans are
    /// stringified and `null` is skipped; arrays and objects are rejected.
    pub fn process_tool(
        &self,
        tool: &str,
        input: impl Into<FileInput>,
        options: &Map<String, Value>,
        output_path: Option<&Path>,
    ) -> Output {
        if tool.is_empty() || tool.contains('/') {
            return Err(DwsError::InvalidArgument(format!(
                "invalid tool name '{tool}'"
            )));
        }
        let form = form_fields(options)?;
        let upload = prepare_file_for_upload(input.into(), PRIMARY_FIELD)?;
        let bytes = self.http().post::<Value>(
            &format!("/process/{tool}"),
            &[upload],
            &form,
            None,
        )?;
        match output_path {
            Some(path) => {
                save_file_output(&bytes, path)?;
                Ok(None)
            }
            None => Ok(Some(bytes)),
        }
    }

    fn run_tool(&self, input: impl Into<FileInput>, tool: Tool, output_path: Option<&Path>) -> Output {
        self.build(input).add_tool(tool)?.execute(output_path)
    }
}

fn form_fields(options: &Map<String, Value>) -> Result<Vec<(String, String)>, DwsError> {
    let mut fields = Vec::with_capacity(options.len());
    for (key, value) in options {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(DwsError::InvalidArgument(format!(
                    "option '{key}' must be a string, number or boolean"
                )))
            }
        };
        fields.push((key.clone(), text));
    }
    Ok(fields)
}
