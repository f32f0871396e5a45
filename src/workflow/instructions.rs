//! Wire types for the build endpoint's `instructions` field.
//!
//! ```json
//! {
//!   "parts":   [{"file": "file", "pages": {"start": 1, "end": 2}}],
//!   "actions": [{"type": "rotate", "rotateBy": 90}],
//!   "output":  {"optimize": true}
//! }
//! ```
//!
//! `parts` lists what goes into the document, in order. `actions` run over
//! the assembled document; an empty list means a plain passthrough (which
//! also converts Office inputs to PDF). `output` is omitted when unset.

use serde::Serialize;
use serde_json::{Map, Value};

/// The full instruction document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instructions {
    pub parts: Vec<Part>,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
}

impl Instructions {
    /// Instructions with the given parts and nothing else.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            parts,
            actions: Vec::new(),
            output: None,
        }
    }
}

/// A page range within an uploaded file.
///
/// A non-negative `end` is exclusive. Negative values count back from the
/// last page and are resolved by the service. `end: None` runs to the end
/// of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl PageRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// From `start` to the end of the document.
    pub fn from_start(start: i64) -> Self {
        Self { start, end: None }
    }
}

/// One input to the assembled document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    File(FilePart),
    NewPage(NewPagePart),
}

impl Part {
    /// The whole of an uploaded file.
    pub fn file(field: impl Into<String>) -> Self {
        Part::File(FilePart {
            file: field.into(),
            pages: None,
        })
    }

    /// A page range of an uploaded file.
    pub fn file_pages(field: impl Into<String>, pages: PageRange) -> Self {
        Part::File(FilePart {
            file: field.into(),
            pages: Some(pages),
        })
    }

    /// The page range, if this part references a file slice.
    pub fn pages(&self) -> Option<PageRange> {
        match self {
            Part::File(f) => f.pages,
            Part::NewPage(_) => None,
        }
    }
}

/// Reference to an uploaded multipart field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePart {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageRange>,
}

/// Freshly generated blank pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPagePart {
    page: &'static str,
    #[serde(rename = "pageCount")]
    pub page_count: u32,
    pub layout: PageLayout,
}

impl NewPagePart {
    pub fn new(page_count: u32, layout: PageLayout) -> Self {
        Self {
            page: "new",
            page_count,
            layout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLayout {
    pub orientation: Orientation,
    /// Paper size name understood by the service: "A4", "Letter", "Legal", ...
    pub size: String,
    pub margin: Margins,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            size: "A4".to_string(),
            margin: Margins::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 72,
            top: 72,
            right: 72,
            bottom: 72,
        }
    }
}

/// A page label entry stored under `output.labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLabel {
    pub pages: PageRange,
    pub label: String,
}

/// One processing step as the service sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Action {
    Known(KnownAction),
    Passthrough(PassthroughAction),
}

impl Action {
    /// The wire `type` discriminator.
    pub fn kind(&self) -> &str {
        match self {
            Action::Known(k) => k.kind(),
            Action::Passthrough(p) => &p.kind,
        }
    }
}

/// Actions with a dedicated translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KnownAction {
    Rotate {
        #[serde(rename = "rotateBy", skip_serializing_if = "Option::is_none")]
        rotate_by: Option<i32>,
        #[serde(rename = "pageIndexes", skip_serializing_if = "Option::is_none")]
        page_indexes: Option<Vec<i64>>,
    },
    Ocr {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Watermark {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<ImageRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    Flatten,
    ApplyRedactions,
    CreateRedactions {
        strategy: String,
        #[serde(rename = "strategyOptions")]
        strategy_options: Map<String, Value>,
    },
    ApplyInstantJson {
        file: String,
    },
    ApplyXfdf {
        file: String,
    },
}

impl KnownAction {
    pub fn kind(&self) -> &'static str {
        match self {
            KnownAction::Rotate { .. } => "rotate",
            KnownAction::Ocr { .. } => "ocr",
            KnownAction::Watermark { .. } => "watermark",
            KnownAction::Flatten => "flatten",
            KnownAction::ApplyRedactions => "applyRedactions",
            KnownAction::CreateRedactions { .. } => "createRedactions",
            KnownAction::ApplyInstantJson { .. } => "applyInstantJson",
            KnownAction::ApplyXfdf { .. } => "applyXfdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
}

/// An unrecognised tool, forwarded as `{type: <tool>, ...options}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassthroughAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}
