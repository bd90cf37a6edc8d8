//! # Command Envelope
//!
//! The envelope is the serializable hand-off between template rendering and
//! printing: a versioned, ordered list of commands plus the layout geometry
//! the coordinates are expressed in.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌─────────────┐     ┌────────┐
//! │ Template │ ──► │ Envelope  │ ──► │ Interpreter │ ──► │ Driver │
//! │  (XML)   │     │  (JSON)   │     │             │     │        │
//! └──────────┘     └───────────┘     └─────────────┘     └────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use etiket::envelope::{Command, Envelope, Origin, Units, YDirection};
//!
//! let mut envelope = Envelope::new(Some("demo_label.xml"));
//! envelope.set_layout(80.0, 60.0, Units::Mm, Origin::BottomLeft, YDirection::Up, Some(203.0));
//! envelope.push(Command::Setup { name: "TEST_LABEL".into() });
//! envelope.push(Command::MoveTo { x: 10.0, y: 50.0 });
//! envelope.push(Command::DrawText { text: "Hello".into() });
//! envelope.push(Command::PrintFeed);
//!
//! let json = envelope.to_json().unwrap();
//! let back = Envelope::from_json(&json).unwrap();
//! assert_eq!(back, envelope);
//! ```

mod command;
mod schema;

pub use command::{Command, CommandEntry, CommandName, DEFAULT_BARCODE_TYPE};
pub use schema::validate_value;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{EtiketError, Result};

/// Envelope format version written by this crate.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Length units for layout geometry and coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    #[serde(rename = "mm")]
    Mm,
    #[serde(rename = "in")]
    Inch,
    #[serde(rename = "dots")]
    Dots,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Mm => "mm",
            Units::Inch => "in",
            Units::Dots => "dots",
        }
    }

    /// Convert a length in these units to printer dots.
    pub fn to_dots(self, value: f64, dpi: f64) -> f64 {
        match self {
            Units::Mm => value * dpi / 25.4,
            Units::Inch => value * dpi,
            Units::Dots => value,
        }
    }
}

impl FromStr for Units {
    type Err = EtiketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" => Ok(Units::Mm),
            "in" | "inch" => Ok(Units::Inch),
            "dots" | "dot" => Ok(Units::Dots),
            other => Err(EtiketError::MalformedEnvelope(format!(
                "unknown units '{other}'"
            ))),
        }
    }
}

/// Corner the coordinate origin sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::BottomLeft => "bottom-left",
            Origin::TopLeft => "top-left",
            Origin::BottomRight => "bottom-right",
            Origin::TopRight => "top-right",
        }
    }

    /// Whether X grows leftwards from a right-hand corner.
    pub fn is_right(self) -> bool {
        matches!(self, Origin::BottomRight | Origin::TopRight)
    }
}

impl FromStr for Origin {
    type Err = EtiketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom-left" => Ok(Origin::BottomLeft),
            "top-left" => Ok(Origin::TopLeft),
            "bottom-right" => Ok(Origin::BottomRight),
            "top-right" => Ok(Origin::TopRight),
            other => Err(EtiketError::MalformedEnvelope(format!(
                "unknown origin '{other}'"
            ))),
        }
    }
}

/// Direction the Y axis grows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YDirection {
    #[default]
    Up,
    Down,
}

impl YDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            YDirection::Up => "up",
            YDirection::Down => "down",
        }
    }
}

impl FromStr for YDirection {
    type Err = EtiketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(YDirection::Up),
            "down" => Ok(YDirection::Down),
            other => Err(EtiketError::MalformedEnvelope(format!(
                "unknown y_direction '{other}'"
            ))),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Units, Origin, YDirection);

/// Label geometry and the coordinate space commands are expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub y_direction: YDirection,
    /// Reference dpi; drivers fall back to their own when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<f64>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            units: Units::Mm,
            origin: Origin::BottomLeft,
            y_direction: YDirection::Up,
            dpi: None,
        }
    }
}

/// Free-form metadata about where an envelope came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DocumentMeta {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.description.is_none()
    }
}

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

/// Versioned, ordered command list plus layout metadata.
///
/// Command order is execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(flatten)]
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "DocumentMeta::is_empty")]
    pub document: DocumentMeta,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Envelope {
    /// Create an empty envelope, optionally tagged with its source.
    pub fn new(source: Option<&str>) -> Self {
        Self::with_version(source, ENVELOPE_VERSION)
    }

    /// Create an empty envelope with an explicit version tag.
    pub fn with_version(source: Option<&str>, version: &str) -> Self {
        Self {
            version: version.to_string(),
            commands: Vec::new(),
            layout: Layout::default(),
            document: DocumentMeta {
                source: source.map(str::to_string),
                description: None,
            },
        }
    }

    /// Overwrite the layout geometry.
    ///
    /// Non-finite width/height become 0.0.
    pub fn set_layout(
        &mut self,
        width: f64,
        height: f64,
        units: Units,
        origin: Origin,
        y_direction: YDirection,
        dpi: Option<f64>,
    ) {
        self.layout = Layout {
            width: finite_or_zero(width),
            height: finite_or_zero(height),
            units,
            origin,
            y_direction,
            dpi,
        };
    }

    /// Append a raw command entry.
    ///
    /// The name is not checked against the command set here; that happens
    /// when the envelope is interpreted. The returned entry may be mutated
    /// to merge further arguments.
    pub fn emit(&mut self, name: impl Into<String>, args: Map<String, Value>) -> &mut CommandEntry {
        self.commands.push(CommandEntry {
            name: name.into(),
            args,
        });
        let last = self.commands.len() - 1;
        &mut self.commands[last]
    }

    /// Append a typed command.
    pub fn push(&mut self, command: Command) -> &mut CommandEntry {
        let entry = command.to_entry();
        self.emit(entry.name, entry.args)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Decode every entry into a typed [`Command`].
    pub fn decode_commands(&self) -> Result<Vec<Command>> {
        self.commands.iter().map(CommandEntry::decode).collect()
    }

    /// Serialized (dictionary) form.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty-printed JSON (2-space indent).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an envelope from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EtiketError::Payload(e.to_string()))
    }

    /// Build an envelope from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| EtiketError::Payload(e.to_string()))
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Envelope {
        let mut envelope = Envelope::new(Some("demo_label.xml"));
        envelope.set_layout(
            80.0,
            60.0,
            Units::Mm,
            Origin::BottomLeft,
            YDirection::Up,
            Some(203.0),
        );
        envelope.push(Command::Setup {
            name: "TEST_LABEL".into(),
        });
        envelope.push(Command::SetFont {
            name: "Swiss 721".into(),
            size: 8.0,
        });
        envelope.push(Command::MoveTo { x: 100.0, y: 50.0 });
        envelope.push(Command::DrawText {
            text: "Hello JSON World".into(),
        });
        envelope.push(Command::PrintFeed);
        envelope
    }

    #[test]
    fn test_new_envelope_defaults() {
        let envelope = Envelope::new(None);
        assert_eq!(envelope.version, "1.0");
        assert!(envelope.is_empty());
        assert_eq!(envelope.layout, Layout::default());
        assert!(envelope.document.is_empty());
    }

    #[test]
    fn test_emit_returns_mutable_entry() {
        let mut envelope = Envelope::new(None);
        let entry = envelope.emit("SetFont", Map::new());
        entry.args.insert("name".into(), json!("Swiss"));
        entry.merge_args(json!({"size": 7.0}).as_object().cloned().unwrap());

        assert_eq!(
            envelope.decode_commands().unwrap(),
            vec![Command::SetFont {
                name: "Swiss".into(),
                size: 7.0
            }]
        );
    }

    #[test]
    fn test_emit_accepts_unknown_names() {
        let mut envelope = Envelope::new(None);
        envelope.emit("Foo", Map::new());
        assert_eq!(envelope.len(), 1);
        assert!(matches!(
            envelope.decode_commands(),
            Err(EtiketError::UnsupportedCommand(_))
        ));
    }

    #[test]
    fn test_serialized_shape() {
        let value = sample().to_value().unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["width"], 80.0);
        assert_eq!(value["height"], 60.0);
        assert_eq!(value["units"], "mm");
        assert_eq!(value["origin"], "bottom-left");
        assert_eq!(value["y_direction"], "up");
        assert_eq!(value["dpi"], 203.0);
        assert_eq!(value["document"]["source"], "demo_label.xml");
        assert_eq!(value["commands"][0], json!({"name": "Setup", "args": {"name": "TEST_LABEL"}}));
        assert_eq!(value["commands"][4], json!({"name": "PrintFeed", "args": {}}));
    }

    #[test]
    fn test_dpi_and_empty_document_are_omitted() {
        let value = Envelope::new(None).to_value().unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("dpi"));
        assert!(!obj.contains_key("document"));
    }

    #[test]
    fn test_json_round_trip() {
        let envelope = sample();
        let back = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(back.commands, envelope.commands);
        assert_eq!(back.layout, envelope.layout);
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_from_json_applies_layout_defaults() {
        let envelope = Envelope::from_json(r#"{"commands": []}"#).unwrap();
        assert_eq!(envelope.version, "1.0");
        assert_eq!(envelope.layout, Layout::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Envelope::from_json("not json"),
            Err(EtiketError::Payload(_))
        ));
    }

    #[test]
    fn test_set_layout_sanitizes_non_finite() {
        let mut envelope = Envelope::new(None);
        envelope.set_layout(f64::NAN, 12.0, Units::Dots, Origin::TopLeft, YDirection::Down, None);
        assert_eq!(envelope.layout.width, 0.0);
        assert_eq!(envelope.layout.height, 12.0);
    }

    #[test]
    fn test_units_to_dots() {
        assert!((Units::Mm.to_dots(25.4, 203.0) - 203.0).abs() < 1e-9);
        assert_eq!(Units::Inch.to_dots(2.0, 300.0), 600.0);
        assert_eq!(Units::Dots.to_dots(17.0, 300.0), 17.0);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("top-left".parse::<Origin>().unwrap(), Origin::TopLeft);
        assert_eq!("DOWN".parse::<YDirection>().unwrap(), YDirection::Down);
        assert_eq!("dots".parse::<Units>().unwrap(), Units::Dots);
        assert!("sideways".parse::<YDirection>().is_err());
    }
}
