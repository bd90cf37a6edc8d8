//! # Envelope Commands
//!
//! The fixed command set a printer driver understands, in two shapes:
//!
//! - [`CommandEntry`]: the raw `{name, args}` pair stored in an envelope.
//!   Construction is permissive so payloads can be authored ahead of the
//!   drivers that will run them.
//! - [`Command`]: the typed form. Decoding an entry into a `Command` is where
//!   unknown names and malformed arguments are rejected.
//!
//! Each variant represents a single driver call. Style changes are individual
//! commands so the renderer can skip the ones that would not change state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

use crate::error::{EtiketError, Result};

/// Default barcode symbology when a template does not name one.
pub const DEFAULT_BARCODE_TYPE: &str = "DATAMATRIX";

/// Raw command entry as stored in an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl CommandEntry {
    /// Create an entry with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    /// Merge additional arguments, overwriting existing keys.
    pub fn merge_args(&mut self, extra: Map<String, Value>) {
        for (key, value) in extra {
            self.args.insert(key, value);
        }
    }

    /// Decode into a typed [`Command`].
    pub fn decode(&self) -> Result<Command> {
        decode_parts(&self.name, &self.args)
    }
}

/// Names of the fixed command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Setup,
    SetFont,
    SetAlignment,
    SetDirection,
    MoveTo,
    DrawText,
    DrawBarcode,
    Comment,
    PrintFeed,
}

impl CommandName {
    /// Every command name, in protocol order.
    pub const ALL: [CommandName; 9] = [
        CommandName::Setup,
        CommandName::SetFont,
        CommandName::SetAlignment,
        CommandName::SetDirection,
        CommandName::MoveTo,
        CommandName::DrawText,
        CommandName::DrawBarcode,
        CommandName::Comment,
        CommandName::PrintFeed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Setup => "Setup",
            CommandName::SetFont => "SetFont",
            CommandName::SetAlignment => "SetAlignment",
            CommandName::SetDirection => "SetDirection",
            CommandName::MoveTo => "MoveTo",
            CommandName::DrawText => "DrawText",
            CommandName::DrawBarcode => "DrawBarcode",
            CommandName::Comment => "Comment",
            CommandName::PrintFeed => "PrintFeed",
        }
    }

    /// Argument names accepted by this command.
    pub fn arg_names(self) -> &'static [&'static str] {
        match self {
            CommandName::Setup => &["name"],
            CommandName::SetFont => &["name", "size"],
            CommandName::SetAlignment => &["align"],
            CommandName::SetDirection => &["direction"],
            CommandName::MoveTo => &["x", "y"],
            CommandName::DrawText | CommandName::Comment => &["text"],
            CommandName::DrawBarcode => &["value", "type", "width", "ratio", "height", "size"],
            CommandName::PrintFeed => &[],
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = EtiketError;

    fn from_str(s: &str) -> Result<Self> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| EtiketError::UnsupportedCommand(s.to_string()))
    }
}

/// Typed printer command.
///
/// Coordinates are canonical layout coordinates (bottom-left origin, Y up)
/// in the envelope's units. Drivers convert them to device space.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Prepare the printer for a named label format.
    Setup { name: String },

    /// Select font family and point size.
    SetFont { name: String, size: f64 },

    /// Alignment code for subsequent operations.
    SetAlignment { align: String },

    /// Print direction code for subsequent operations.
    SetDirection { direction: String },

    /// Absolute move of the insertion point.
    MoveTo { x: f64, y: f64 },

    /// Text at the current position.
    DrawText { text: String },

    /// Barcode at the current position. Geometry is barcode-specific,
    /// not label geometry.
    DrawBarcode {
        value: String,
        kind: String,
        width: i64,
        ratio: i64,
        height: i64,
        size: i64,
    },

    /// Diagnostic annotation, no printed output.
    Comment { text: String },

    /// Advance the media and print.
    PrintFeed,
}

impl Command {
    pub fn name(&self) -> CommandName {
        match self {
            Command::Setup { .. } => CommandName::Setup,
            Command::SetFont { .. } => CommandName::SetFont,
            Command::SetAlignment { .. } => CommandName::SetAlignment,
            Command::SetDirection { .. } => CommandName::SetDirection,
            Command::MoveTo { .. } => CommandName::MoveTo,
            Command::DrawText { .. } => CommandName::DrawText,
            Command::DrawBarcode { .. } => CommandName::DrawBarcode,
            Command::Comment { .. } => CommandName::Comment,
            Command::PrintFeed => CommandName::PrintFeed,
        }
    }

    /// Convert into the raw entry form stored in an envelope.
    pub fn to_entry(&self) -> CommandEntry {
        let args = match self {
            Command::Setup { name } => json!({ "name": name }),
            Command::SetFont { name, size } => json!({ "name": name, "size": size }),
            Command::SetAlignment { align } => json!({ "align": align }),
            Command::SetDirection { direction } => json!({ "direction": direction }),
            Command::MoveTo { x, y } => json!({ "x": x, "y": y }),
            Command::DrawText { text } | Command::Comment { text } => json!({ "text": text }),
            Command::DrawBarcode {
                value,
                kind,
                width,
                ratio,
                height,
                size,
            } => json!({
                "value": value,
                "type": kind,
                "width": width,
                "ratio": ratio,
                "height": height,
                "size": size,
            }),
            Command::PrintFeed => json!({}),
        };

        CommandEntry {
            name: self.name().as_str().to_string(),
            args: match args {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    /// Decode a raw JSON command entry.
    ///
    /// ## Errors
    ///
    /// - [`EtiketError::MalformedEnvelope`] if the entry is not an object,
    ///   the name is not a string, `args` is not an object, or an argument
    ///   is missing, unexpected or of the wrong type
    /// - [`EtiketError::UnsupportedCommand`] if the name is outside the
    ///   fixed command set
    pub fn from_entry(entry: &Value) -> Result<Command> {
        let obj = entry
            .as_object()
            .ok_or_else(|| malformed("command entries must be objects"))?;

        let name = match obj.get("name") {
            Some(Value::String(name)) => name.as_str(),
            _ => return Err(malformed("command name must be a string")),
        };

        match obj.get("args") {
            None => decode_parts(name, &Map::new()),
            Some(Value::Object(args)) => decode_parts(name, args),
            Some(_) => Err(malformed(format!("{name}: command args must be an object"))),
        }
    }
}

fn malformed(msg: impl Into<String>) -> EtiketError {
    EtiketError::MalformedEnvelope(msg.into())
}

fn decode_parts(name: &str, args: &Map<String, Value>) -> Result<Command> {
    let command: CommandName = name.parse()?;
    let reader = ArgReader { command, args };
    reader.check_unexpected()?;

    let decoded = match command {
        CommandName::Setup => Command::Setup {
            name: reader.string("name")?,
        },
        CommandName::SetFont => Command::SetFont {
            name: reader.string("name")?,
            size: reader.number("size")?,
        },
        CommandName::SetAlignment => Command::SetAlignment {
            align: reader.string("align")?,
        },
        CommandName::SetDirection => Command::SetDirection {
            direction: reader.string("direction")?,
        },
        CommandName::MoveTo => Command::MoveTo {
            x: reader.number("x")?,
            y: reader.number("y")?,
        },
        CommandName::DrawText => Command::DrawText {
            text: reader.string("text")?,
        },
        CommandName::DrawBarcode => Command::DrawBarcode {
            value: reader.string("value")?,
            kind: reader.string("type")?,
            width: reader.integer("width")?,
            ratio: reader.integer("ratio")?,
            height: reader.integer("height")?,
            size: reader.integer("size")?,
        },
        CommandName::Comment => Command::Comment {
            text: reader.string("text")?,
        },
        CommandName::PrintFeed => Command::PrintFeed,
    };

    Ok(decoded)
}

/// Typed access to a command's argument map.
struct ArgReader<'a> {
    command: CommandName,
    args: &'a Map<String, Value>,
}

impl ArgReader<'_> {
    fn check_unexpected(&self) -> Result<()> {
        let expected = self.command.arg_names();
        match self.args.keys().find(|key| !expected.contains(&key.as_str())) {
            Some(key) => Err(malformed(format!(
                "{}: unexpected argument '{}'",
                self.command, key
            ))),
            None => Ok(()),
        }
    }

    fn get(&self, key: &str) -> Result<&Value> {
        self.args
            .get(key)
            .ok_or_else(|| malformed(format!("{}: missing argument '{}'", self.command, key)))
    }

    fn string(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.wrong_type(key, "a string", other)),
        }
    }

    fn number(&self, key: &str) -> Result<f64> {
        let value = self.get(key)?;
        value
            .as_f64()
            .ok_or_else(|| self.wrong_type(key, "a number", value))
    }

    /// Integer argument; fractional numbers are truncated toward zero.
    fn integer(&self, key: &str) -> Result<i64> {
        let value = self.get(key)?;
        if let Some(n) = value.as_i64() {
            return Ok(n);
        }
        value
            .as_f64()
            .map(|n| n.trunc() as i64)
            .ok_or_else(|| self.wrong_type(key, "an integer", value))
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Value) -> EtiketError {
        malformed(format!(
            "{}: argument '{}' must be {}, got {}",
            self.command, key, expected, got
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_name_parse() {
        assert_eq!("MoveTo".parse::<CommandName>().unwrap(), CommandName::MoveTo);
        assert!(matches!(
            "Foo".parse::<CommandName>(),
            Err(EtiketError::UnsupportedCommand(name)) if name == "Foo"
        ));
    }

    #[test]
    fn test_command_names_are_case_sensitive() {
        assert!("moveto".parse::<CommandName>().is_err());
    }

    #[test]
    fn test_decode_move_to() {
        let entry = json!({"name": "MoveTo", "args": {"x": 10, "y": 20}});
        let cmd = Command::from_entry(&entry).unwrap();
        assert_eq!(cmd, Command::MoveTo { x: 10.0, y: 20.0 });
    }

    #[test]
    fn test_decode_print_feed_without_args() {
        let entry = json!({"name": "PrintFeed"});
        assert_eq!(Command::from_entry(&entry).unwrap(), Command::PrintFeed);
    }

    #[test]
    fn test_decode_barcode_truncates_geometry() {
        let entry = json!({
            "name": "DrawBarcode",
            "args": {"value": "X", "type": "CODE128", "width": 2.9, "ratio": 1, "height": 3, "size": 100}
        });
        match Command::from_entry(&entry).unwrap() {
            Command::DrawBarcode { width, kind, .. } => {
                assert_eq!(width, 2);
                assert_eq!(kind, "CODE128");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_non_object_entry() {
        let err = Command::from_entry(&json!(["MoveTo"])).unwrap_err();
        assert!(matches!(err, EtiketError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decode_rejects_non_string_name() {
        let err = Command::from_entry(&json!({"name": 3, "args": {}})).unwrap_err();
        assert!(matches!(err, EtiketError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decode_rejects_non_object_args() {
        let err = Command::from_entry(&json!({"name": "PrintFeed", "args": []})).unwrap_err();
        assert!(matches!(err, EtiketError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decode_rejects_missing_argument() {
        let err = Command::from_entry(&json!({"name": "MoveTo", "args": {"x": 1}})).unwrap_err();
        assert!(err.to_string().contains("missing argument 'y'"));
    }

    #[test]
    fn test_decode_rejects_unexpected_argument() {
        let entry = json!({"name": "DrawText", "args": {"text": "a", "bold": true}});
        let err = Command::from_entry(&entry).unwrap_err();
        assert!(err.to_string().contains("unexpected argument 'bold'"));
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let entry = json!({"name": "MoveTo", "args": {"x": "ten", "y": 1}});
        assert!(matches!(
            Command::from_entry(&entry),
            Err(EtiketError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_to_entry_uses_protocol_argument_names() {
        let cmd = Command::DrawBarcode {
            value: "V".into(),
            kind: DEFAULT_BARCODE_TYPE.into(),
            width: 2,
            ratio: 1,
            height: 3,
            size: 100,
        };
        let entry = cmd.to_entry();
        assert_eq!(entry.name, "DrawBarcode");
        let keys: Vec<&str> = entry.args.keys().map(String::as_str).collect();
        assert_eq!(keys, ["value", "type", "width", "ratio", "height", "size"]);
        assert_eq!(entry.decode().unwrap(), cmd);
    }
}
