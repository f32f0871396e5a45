//! Tool names and their translation into wire actions.
//!
//! Callers address tools by their kebab-case names (`rotate-pages`,
//! `watermark-pdf`, ...) with flat snake_case options. Each known tool has a
//! typed option struct; [`Tool::parse`] fills it from a JSON object and
//! rejects keys the tool does not understand. Unrecognised tool names are
//! forwarded untouched as `{type: <name>, ...options}`.

use super::instructions::{Action, ImageRef, KnownAction, PassthroughAction};
use crate::error::DwsError;
use crate::input::FileInput;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::warn;

pub const ROTATE_PAGES: &str = "rotate-pages";
pub const OCR_PDF: &str = "ocr-pdf";
pub const WATERMARK_PDF: &str = "watermark-pdf";
pub const FLATTEN_ANNOTATIONS: &str = "flatten-annotations";
pub const APPLY_REDACTIONS: &str = "apply-redactions";
pub const CREATE_REDACTIONS: &str = "create-redactions";
pub const APPLY_INSTANT_JSON: &str = "apply-instant-json";
pub const APPLY_XFDF: &str = "apply-xfdf";

/// Every tool name with a dedicated translation.
pub const KNOWN_TOOLS: [&str; 8] = [
    ROTATE_PAGES,
    OCR_PDF,
    WATERMARK_PDF,
    FLATTEN_ANNOTATIONS,
    APPLY_REDACTIONS,
    CREATE_REDACTIONS,
    APPLY_INSTANT_JSON,
    APPLY_XFDF,
];

/// A processing step, before translation.
#[derive(Debug)]
pub enum Tool {
    RotatePages(RotateOptions),
    Ocr(OcrOptions),
    Watermark(WatermarkOptions),
    FlattenAnnotations,
    ApplyRedactions,
    CreateRedactions(RedactionOptions),
    /// Import annotations from an Instant JSON document.
    ApplyInstantJson(FileInput),
    /// Import annotations from an XFDF document.
    ApplyXfdf(FileInput),
    /// Any other tool name; options are forwarded verbatim.
    Other {
        name: String,
        options: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotateOptions {
    /// Clockwise rotation; required, a multiple of 90.
    pub degrees: Option<i32>,
    pub page_indexes: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrOptions {
    /// Language name or ISO 639-2 code; `german` is sent as `deu`.
    pub language: Option<String>,
}

/// Exactly one of `text` and `image_url` must be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkOptions {
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: Option<f64>,
    /// Placement keyword understood by the service, e.g. "center".
    pub position: Option<String>,
}

impl WatermarkOptions {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionStrategy {
    Text,
    Regex,
    Preset,
}

impl RedactionStrategy {
    fn as_str(self) -> &'static str {
        match self {
            RedactionStrategy::Text => "text",
            RedactionStrategy::Regex => "regex",
            RedactionStrategy::Preset => "preset",
        }
    }
}

/// Options for creating redaction annotations.
///
/// The field matching `strategy` (`text`, `regex` or `preset`) is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionOptions {
    pub strategy: RedactionStrategy,
    pub text: Option<String>,
    pub regex: Option<String>,
    /// Built-in pattern name, e.g. "email-address" or "credit-card-number".
    pub preset: Option<String>,
    pub case_sensitive: Option<bool>,
    pub whole_words_only: Option<bool>,
    pub include_annotations: Option<bool>,
}

impl RedactionOptions {
    pub fn text(text: impl Into<String>) -> Self {
        Self::with(RedactionStrategy::Text, |o| o.text = Some(text.into()))
    }

    pub fn regex(regex: impl Into<String>) -> Self {
        Self::with(RedactionStrategy::Regex, |o| o.regex = Some(regex.into()))
    }

    pub fn preset(preset: impl Into<String>) -> Self {
        Self::with(RedactionStrategy::Preset, |o| o.preset = Some(preset.into()))
    }

    fn with(strategy: RedactionStrategy, set: impl FnOnce(&mut Self)) -> Self {
        let mut o = Self {
            strategy,
            text: None,
            regex: None,
            preset: None,
            case_sensitive: None,
            whole_words_only: None,
            include_annotations: None,
        };
        set(&mut o);
        o
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AttachmentOptions {
    file: PathBuf,
}

/// A translated step, plus any extra file it needs uploaded.
#[derive(Debug)]
pub(crate) struct Lowered {
    pub action: Action,
    pub attachment: Option<(String, FileInput)>,
}

impl Tool {
    /// Resolve a tool name and flat option object.
    ///
    /// # Errors
    /// [`DwsError::InvalidArgument`] when a known tool gets an unknown key or
    /// a value of the wrong type.
    pub fn parse(name: &str, options: Map<String, Value>) -> Result<Self, DwsError> {
        Ok(match name {
            ROTATE_PAGES => Tool::RotatePages(from_options(name, options)?),
            OCR_PDF => Tool::Ocr(from_options(name, options)?),
            WATERMARK_PDF => Tool::Watermark(from_options(name, options)?),
            FLATTEN_ANNOTATIONS => {
                from_options::<Empty>(name, options)?;
                Tool::FlattenAnnotations
            }
            APPLY_REDACTIONS => {
                from_options::<Empty>(name, options)?;
                Tool::ApplyRedactions
            }
            CREATE_REDACTIONS => Tool::CreateRedactions(from_options(name, options)?),
            APPLY_INSTANT_JSON => {
                let opts: AttachmentOptions = from_options(name, options)?;
                Tool::ApplyInstantJson(FileInput::Path(opts.file))
            }
            APPLY_XFDF => {
                let opts: AttachmentOptions = from_options(name, options)?;
                Tool::ApplyXfdf(FileInput::Path(opts.file))
            }
            other => Tool::Other {
                name: other.to_string(),
                options,
            },
        })
    }

    /// The caller-facing tool name.
    pub fn name(&self) -> &str {
        match self {
            Tool::RotatePages(_) => ROTATE_PAGES,
            Tool::Ocr(_) => OCR_PDF,
            Tool::Watermark(_) => WATERMARK_PDF,
            Tool::FlattenAnnotations => FLATTEN_ANNOTATIONS,
            Tool::ApplyRedactions => APPLY_REDACTIONS,
            Tool::CreateRedactions(_) => CREATE_REDACTIONS,
            Tool::ApplyInstantJson(_) => APPLY_INSTANT_JSON,
            Tool::ApplyXfdf(_) => APPLY_XFDF,
            Tool::Other { name, .. } => name,
        }
    }

    /// Translate into a wire action.
    ///
    /// `attachment_field` names the multipart field used when the tool
    /// uploads a file of its own.
    pub(crate) fn lower(self, attachment_field: &str) -> Result<Lowered, DwsError> {
        let known = |k: KnownAction| Lowered {
            action: Action::Known(k),
            attachment: None,
        };

        Ok(match self {
            Tool::RotatePages(o) => {
                let deg = o.degrees.ok_or_else(|| {
                    DwsError::InvalidArgument("rotate-pages requires 'degrees'".into())
                })?;
                if deg % 90 != 0 {
                    return Err(DwsError::InvalidArgument(format!(
                        "rotation must be a multiple of 90 degrees, got {deg}"
                    )));
                }
                known(KnownAction::Rotate {
                    rotate_by: Some(deg),
                    page_indexes: o.page_indexes,
                })
            }
            Tool::Ocr(o) => known(KnownAction::Ocr {
                language: o.language.map(|l| ocr_language_code(&l)),
            }),
            Tool::Watermark(o) => {
                match (&o.text, &o.image_url) {
                    (None, None) => {
                        return Err(DwsError::InvalidArgument(
                            "watermark needs either text or image_url".into(),
                        ))
                    }
                    (Some(_), Some(_)) => {
                        return Err(DwsError::InvalidArgument(
                            "watermark takes text or image_url, not both".into(),
                        ))
                    }
                    _ => {}
                }
                if let Some(op) = o.opacity {
                    if !(0.0..=1.0).contains(&op) {
                        return Err(DwsError::InvalidArgument(format!(
                            "watermark opacity must be between 0 and 1, got {op}"
                        )));
                    }
                }
                known(KnownAction::Watermark {
                    text: o.text,
                    image: o.image_url.map(|url| ImageRef { url }),
                    width: o.width,
                    height: o.height,
                    opacity: o.opacity,
                    position: o.position,
                })
            }
            Tool::FlattenAnnotations => known(KnownAction::Flatten),
            Tool::ApplyRedactions => known(KnownAction::ApplyRedactions),
            Tool::CreateRedactions(o) => known(lower_redactions(o)?),
            Tool::ApplyInstantJson(file) => Lowered {
                action: Action::Known(KnownAction::ApplyInstantJson {
                    file: attachment_field.to_string(),
                }),
                attachment: Some((attachment_field.to_string(), file)),
            },
            Tool::ApplyXfdf(file) => Lowered {
                action: Action::Known(KnownAction::ApplyXfdf {
                    file: attachment_field.to_string(),
                }),
                attachment: Some((attachment_field.to_string(), file)),
            },
            Tool::Other { name, mut options } => {
                if let Some(dropped) = options.remove("type") {
                    warn!("Ignoring 'type' option {} on tool '{}'", dropped, name);
                }
                Lowered {
                    action: Action::Passthrough(PassthroughAction {
                        kind: name,
                        options,
                    }),
                    attachment: None,
                }
            }
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Empty {}

fn from_options<T: DeserializeOwned>(tool: &str, options: Map<String, Value>) -> Result<T, DwsError> {
    serde_json::from_value(Value::Object(options))
        .map_err(|e| DwsError::InvalidArgument(format!("invalid options for '{tool}': {e}")))
}

/// The service expects ISO 639-2 codes.
fn ocr_language_code(language: &str) -> String {
    match language.to_ascii_lowercase().as_str() {
        "english" => "eng".to_string(),
        "german" => "deu".to_string(),
        _ => language.to_string(),
    }
}

fn lower_redactions(o: RedactionOptions) -> Result<KnownAction, DwsError> {
    let (key, value) = match o.strategy {
        RedactionStrategy::Text => ("value", o.text),
        RedactionStrategy::Regex => ("value", o.regex),
        RedactionStrategy::Preset => ("preset", o.preset),
    };
    let value = value.ok_or_else(|| {
        DwsError::InvalidArgument(format!(
            "'{}' redaction strategy needs a '{}' option",
            o.strategy.as_str(),
            o.strategy.as_str()
        ))
    })?;

    let mut strategy_options = Map::new();
    strategy_options.insert(key.to_string(), Value::String(value));
    if let Some(v) = o.case_sensitive {
        strategy_options.insert("caseSensitive".into(), Value::Bool(v));
    }
    if let Some(v) = o.whole_words_only {
        strategy_options.insert("wholeWordsOnly".into(), Value::Bool(v));
    }
    if let Some(v) = o.include_annotations {
        strategy_options.insert("includeAnnotations".into(), Value::Bool(v));
    }

    Ok(KnownAction::CreateRedactions {
        strategy: o.strategy.as_str().to_string(),
        strategy_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn lowered(name: &str, options: Value) -> Value {
        let tool = Tool::parse(name, obj(options)).unwrap();
        serde_json::to_value(tool.lower("attachment").unwrap().action).unwrap()
    }

    #[test]
    fn rotate_renames_keys() {
        assert_eq!(
            lowered(ROTATE_PAGES, json!({"degrees": 180, "page_indexes": [0, 2, 4]})),
            json!({"type": "rotate", "rotateBy": 180, "pageIndexes": [0, 2, 4]})
        );
    }

    #[test]
    fn rotate_requires_degrees() {
        let tool = Tool::parse(ROTATE_PAGES, obj(json!({"page_indexes": [1]}))).unwrap();
        let err = tool.lower("a").unwrap_err();
        assert!(matches!(&err, DwsError::InvalidArgument(m) if m.contains("degrees")));
    }

    #[test]
    fn rotate_rejects_odd_angles() {
        let tool = Tool::parse(ROTATE_PAGES, obj(json!({"degrees": 45}))).unwrap();
        assert!(matches!(
            tool.lower("a"),
            Err(DwsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn ocr_maps_language_names() {
        assert_eq!(
            lowered(OCR_PDF, json!({"language": "german"})),
            json!({"type": "ocr", "language": "deu"})
        );
        assert_eq!(
            lowered(OCR_PDF, json!({"language": "english"})),
            json!({"type": "ocr", "language": "eng"})
        );
        assert_eq!(
            lowered(OCR_PDF, json!({"language": "fra"})),
            json!({"type": "ocr", "language": "fra"})
        );
    }

    #[test]
    fn watermark_image_url_nests() {
        assert_eq!(
            lowered(
                WATERMARK_PDF,
                json!({"image_url": "https://example.com/logo.png", "opacity": 0.5})
            ),
            json!({
                "type": "watermark",
                "image": {"url": "https://example.com/logo.png"},
                "opacity": 0.5
            })
        );
    }

    #[test]
    fn watermark_text_with_size() {
        assert_eq!(
            lowered(
                WATERMARK_PDF,
                json!({"text": "DRAFT", "width": 200, "height": 100, "position": "center"})
            ),
            json!({
                "type": "watermark",
                "text": "DRAFT",
                "width": 200,
                "height": 100,
                "position": "center"
            })
        );
    }

    #[test]
    fn watermark_needs_exactly_one_source() {
        let none = Tool::parse(WATERMARK_PDF, Map::new()).unwrap();
        assert!(none.lower("a").is_err());
        let both = Tool::parse(
            WATERMARK_PDF,
            obj(json!({"text": "x", "image_url": "https://example.com/x.png"})),
        )
        .unwrap();
        assert!(both.lower("a").is_err());
    }

    #[test]
    fn unit_tools_translate() {
        assert_eq!(lowered(FLATTEN_ANNOTATIONS, json!({})), json!({"type": "flatten"}));
        assert_eq!(
            lowered(APPLY_REDACTIONS, json!({})),
            json!({"type": "applyRedactions"})
        );
    }

    #[test]
    fn create_redactions_builds_strategy_options() {
        assert_eq!(
            lowered(
                CREATE_REDACTIONS,
                json!({"strategy": "text", "text": "secret", "case_sensitive": true})
            ),
            json!({
                "type": "createRedactions",
                "strategy": "text",
                "strategyOptions": {"value": "secret", "caseSensitive": true}
            })
        );
        assert_eq!(
            lowered(
                CREATE_REDACTIONS,
                json!({"strategy": "preset", "preset": "email-address"})
            ),
            json!({
                "type": "createRedactions",
                "strategy": "preset",
                "strategyOptions": {"preset": "email-address"}
            })
        );
    }

    #[test]
    fn create_redactions_requires_matching_value() {
        let tool = Tool::parse(CREATE_REDACTIONS, obj(json!({"strategy": "regex"}))).unwrap();
        assert!(tool.lower("a").is_err());
    }

    #[test]
    fn instant_json_attaches_file() {
        let tool = Tool::parse(APPLY_INSTANT_JSON, obj(json!({"file": "notes.json"}))).unwrap();
        let lowered = tool.lower("instant_json").unwrap();
        assert_eq!(
            serde_json::to_value(&lowered.action).unwrap(),
            json!({"type": "applyInstantJson", "file": "instant_json"})
        );
        let (field, input) = lowered.attachment.unwrap();
        assert_eq!(field, "instant_json");
        assert!(matches!(input, FileInput::Path(p) if p == PathBuf::from("notes.json")));
    }

    #[test]
    fn known_tool_rejects_unknown_key() {
        let err = Tool::parse(ROTATE_PAGES, obj(json!({"degres": 90}))).unwrap_err();
        assert!(err.to_string().contains("rotate-pages"));
        assert!(Tool::parse(FLATTEN_ANNOTATIONS, obj(json!({"x": 1}))).is_err());
    }

    #[test]
    fn unknown_tool_passes_through() {
        assert_eq!(
            lowered("custom-tool", json!({"type": "ignored", "level": 3})),
            json!({"type": "custom-tool", "level": 3})
        );
    }

    #[test]
    fn names_round_trip_through_parse() {
        for name in KNOWN_TOOLS {
            let options = match name {
                APPLY_INSTANT_JSON | APPLY_XFDF => obj(json!({"file": "a"})),
                CREATE_REDACTIONS => obj(json!({"strategy": "text", "text": "a"})),
                _ => Map::new(),
            };
            assert_eq!(Tool::parse(name, options).unwrap().name(), name);
        }
    }
}
