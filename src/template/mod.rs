//! # Label Templates
//!
//! A label template is static geometry: groups of positioned text fields and
//! barcodes bound to named values. Templates are authored as XML, parsed once
//! and cached by name (see [`registry`]), then rendered into an
//! [`Envelope`](crate::envelope::Envelope) per print job.
//!
//! ## XML Format
//!
//! ```xml
//! <LabelTemplate name="VIAL_BOX" width="80" height="60" units="mm" baseFont="Swiss 721 Bold BT">
//!   <Meta>
//!     <Version>4</Version>
//!     <DpiReference>203</DpiReference>
//!   </Meta>
//!   <Group name="right" offsetX="0" offsetY="0">
//!     <!-- patient -->
//!     <Field x="8" y="50" name="NAAM" size="8" align="5"/>
//!     <Barcode x="40" y="20" name="UDI" type="DATAMATRIX" width="2" height="3"/>
//!   </Group>
//! </LabelTemplate>
//! ```
//!
//! Templates are trusted assets: unparsable numeric attributes fall back to
//! defaults instead of failing the parse.

pub mod registry;
mod render;
mod xml;

pub use registry::{TemplateRegistry, get_template, list_templates, render_template};
pub use render::format_placeholders;

use std::fs;
use std::path::Path;

use crate::envelope::{DEFAULT_BARCODE_TYPE, Units};
use crate::error::{EtiketError, Result};

/// Font used when neither a field nor the render state names one.
pub const DEFAULT_BASE_FONT: &str = "Swiss 721 Bold BT";

/// A parsed label template.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTemplate {
    /// File name the template was loaded from (e.g. `scleral_v4.xml`).
    pub source: String,
    /// Canonical label name sent with `Setup`.
    pub label_name: String,
    pub width: f64,
    pub height: f64,
    pub units: Units,
    pub base_font: String,
    /// Reference dpi declared in `<Meta><DpiReference>`.
    pub dpi: Option<f64>,
    /// Version/author/date/description folded into one line.
    pub description: String,
    pub groups: Vec<Group>,
}

/// Children sharing one position offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: Option<String>,
    pub offset_x: f64,
    pub offset_y: f64,
    pub items: Vec<Item>,
}

/// One child of a group, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Field(FieldSpec),
    Barcode(BarcodeSpec),
    /// Layout annotation, whitespace already normalised.
    Comment(String),
}

/// Positioned text field.
///
/// Style attributes are overrides: `None` means "inherit the render state".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    pub x: f64,
    pub y: f64,
    /// Literal text (may contain `{NAME}` placeholders). Wins over `name`.
    pub text: Option<String>,
    pub name: Option<String>,
    pub prefix: String,
    pub suffix: String,
    pub font: Option<String>,
    /// Raw `size` attribute; parsed at render time against the current state.
    pub size: Option<String>,
    pub align: Option<String>,
    pub direction: Option<String>,
}

/// Positioned barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeSpec {
    pub x: f64,
    pub y: f64,
    pub name: Option<String>,
    /// Literal fallback when `name` is not in the value map.
    pub value: String,
    pub kind: String,
    pub width: i64,
    pub ratio: i64,
    pub height: i64,
    pub size: i64,
    pub align: Option<String>,
    pub direction: Option<String>,
}

impl Default for BarcodeSpec {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            name: None,
            value: String::new(),
            kind: DEFAULT_BARCODE_TYPE.to_string(),
            width: 1,
            ratio: 1,
            height: 1,
            size: 100,
            align: None,
            direction: None,
        }
    }
}

impl LabelTemplate {
    /// Parse a template from XML text.
    ///
    /// `source` is the file name recorded in rendered envelopes; its stem is
    /// the label name when the root element has no `name` attribute.
    pub fn parse(xml: &str, source: &str) -> Result<Self> {
        xml::parse_template(xml, source)
    }

    /// Load and parse a template file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            EtiketError::Template(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(&text, &source)
    }

    /// Number of fields and barcodes across all groups.
    pub fn element_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.items)
            .filter(|item| !matches!(item, Item::Comment(_)))
            .count()
    }
}

/// Parse a float attribute, falling back to `default` when absent or malformed.
pub(crate) fn parse_f64(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_defaults() {
        assert_eq!(parse_f64(Some("12.5"), 0.0), 12.5);
        assert_eq!(parse_f64(Some(" 3 "), 0.0), 3.0);
        assert_eq!(parse_f64(Some("abc"), 7.0), 7.0);
        assert_eq!(parse_f64(None, 1.0), 1.0);
        assert_eq!(parse_f64(Some("nan"), 2.0), 2.0);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  right \n\t lens  "), "right lens");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_barcode_defaults() {
        let barcode = BarcodeSpec::default();
        assert_eq!(barcode.kind, "DATAMATRIX");
        assert_eq!((barcode.width, barcode.ratio, barcode.height, barcode.size), (1, 1, 1, 100));
    }

    #[test]
    fn test_from_path_records_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vial_box.xml");
        fs::write(&path, r#"<LabelTemplate width="50" height="30"/>"#).unwrap();

        let template = LabelTemplate::from_path(&path).unwrap();
        assert_eq!(template.source, "vial_box.xml");
        assert_eq!(template.label_name, "vial_box");
        assert_eq!(template.width, 50.0);
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(matches!(
            LabelTemplate::from_path("/nonexistent/label.xml"),
            Err(EtiketError::Template(_))
        ));
    }
}
