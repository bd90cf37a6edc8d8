//! # Command Interpreter
//!
//! Replays an envelope against a [`Driver`].
//!
//! ## Run Sequence
//!
//! ```text
//!  payload ──► resolve ──► configure ──► open ──► dispatch × N ──► close
//!   (JSON,      (Value)    (layout,               (Command enum)     │
//!    path,                  dpi)                                     │
//!    Value)                                    always runs ◄─────────┘
//! ```
//!
//! Envelopes are untrusted: structural problems fail the run with
//! [`EtiketError::MalformedEnvelope`], unknown command names with
//! [`EtiketError::UnsupportedCommand`]. The first failing command aborts the
//! run; commands before it have already reached the device.
//!
//! Interpreting needs `&mut` access to the driver, so a driver serves at
//! most one session at a time.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use crate::driver::{Driver, LayoutContext};
use crate::envelope::{Command, Envelope, Origin, Units, YDirection};
use crate::error::{EtiketError, Result};

/// Anything an envelope can arrive as.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already-parsed JSON.
    Value(Value),
    /// JSON text. If it does not parse, it is tried as a file path.
    Json(String),
    /// Path to a JSON file.
    File(PathBuf),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Json(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Json(text.to_string())
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::File(path)
    }
}

impl From<&Path> for Payload {
    fn from(path: &Path) -> Self {
        Payload::File(path.to_path_buf())
    }
}

impl Payload {
    /// Resolve to structured JSON.
    pub fn resolve(self) -> Result<Value> {
        match self {
            Payload::Value(value) => Ok(value),
            Payload::Json(text) => match serde_json::from_str(&text) {
                Ok(value) => Ok(value),
                Err(json_err) => {
                    let path = Path::new(text.trim());
                    if !text.trim().is_empty() && path.is_file() {
                        read_json_file(path)
                    } else {
                        Err(EtiketError::Payload(format!(
                            "not valid JSON and not a readable file: {}",
                            json_err
                        )))
                    }
                }
            },
            Payload::File(path) => read_json_file(&path),
        }
    }
}

fn read_json_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| EtiketError::Payload(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| EtiketError::Payload(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// Drives one envelope run at a time against a borrowed driver.
pub struct Interpreter<'d, D: Driver + ?Sized> {
    driver: &'d mut D,
}

impl<'d, D: Driver + ?Sized> Interpreter<'d, D> {
    pub fn new(driver: &'d mut D) -> Self {
        Self { driver }
    }

    /// Execute every command in the payload, returning how many ran.
    #[instrument(skip_all)]
    pub fn run(&mut self, payload: impl Into<Payload>) -> Result<usize> {
        let value = payload.into().resolve()?;
        let envelope = value.as_object().ok_or_else(|| {
            EtiketError::MalformedEnvelope("envelope must be a JSON object".to_string())
        })?;

        let layout = layout_context(envelope, self.driver.dpi())?;
        self.driver.configure_layout(&layout);
        self.driver
            .set_label_context(layout.height, layout.units, layout.dpi);

        let commands: &[Value] = match envelope.get("commands") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(commands)) => commands,
            Some(other) => {
                return Err(EtiketError::MalformedEnvelope(format!(
                    "commands must be an array, got {}",
                    json_type(other)
                )));
            }
        };

        debug!(
            commands = commands.len(),
            width = layout.width,
            height = layout.height,
            units = %layout.units,
            dpi = layout.dpi,
            "Starting envelope run"
        );

        let mut session = Session::open(&mut *self.driver)?;
        for (index, entry) in commands.iter().enumerate() {
            let command = Command::from_entry(entry).inspect_err(|e| {
                warn!(index, error = %e, "Rejecting command");
            })?;
            dispatch(&mut *session.driver, command)?;
        }
        session.close()?;

        info!(commands = commands.len(), "Envelope executed");
        Ok(commands.len())
    }

    /// Execute a typed envelope.
    pub fn run_envelope(&mut self, envelope: &Envelope) -> Result<usize> {
        self.run(envelope.to_value()?)
    }
}

/// Open driver session; closes on drop if not closed explicitly.
struct Session<'a, D: Driver + ?Sized> {
    driver: &'a mut D,
    closed: bool,
}

impl<'a, D: Driver + ?Sized> Session<'a, D> {
    fn open(driver: &'a mut D) -> Result<Self> {
        driver.open()?;
        Ok(Self {
            driver,
            closed: false,
        })
    }

    fn close(mut self) -> Result<()> {
        self.closed = true;
        self.driver.close()
    }
}

impl<D: Driver + ?Sized> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.driver.close() {
                warn!(error = %e, "Failed to close driver after aborted run");
            }
        }
    }
}

fn dispatch<D: Driver + ?Sized>(driver: &mut D, command: Command) -> Result<()> {
    match command {
        Command::Setup { name } => driver.setup(&name),
        Command::SetFont { name, size } => driver.set_font(&name, size),
        Command::SetAlignment { align } => driver.set_alignment(&align),
        Command::SetDirection { direction } => driver.set_direction(&direction),
        Command::MoveTo { x, y } => driver.move_to(x, y),
        Command::DrawText { text } => driver.draw_text(&text),
        Command::DrawBarcode {
            value,
            kind,
            width,
            ratio,
            height,
            size,
        } => driver.draw_barcode(&value, &kind, width, ratio, height, size),
        Command::Comment { text } => driver.comment(&text),
        Command::PrintFeed => driver.print_feed(),
    }
}

fn layout_context(envelope: &Map<String, Value>, driver_dpi: f64) -> Result<LayoutContext> {
    Ok(LayoutContext {
        width: dimension(envelope, "width")?,
        height: dimension(envelope, "height")?,
        units: layout_enum(envelope, "units", Units::Mm)?,
        origin: layout_enum(envelope, "origin", Origin::BottomLeft)?,
        y_direction: layout_enum(envelope, "y_direction", YDirection::Up)?,
        dpi: dpi(envelope, driver_dpi)?,
    })
}

/// Width/height: falsy values are 0.0, anything else must be numeric.
fn dimension(envelope: &Map<String, Value>, field: &str) -> Result<f64> {
    match envelope.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(0.0),
        Some(Value::Bool(true)) => Ok(1.0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(value) => number(field, value),
    }
}

/// Dpi: absent or null means the driver's own; anything else must be a
/// positive number.
fn dpi(envelope: &Map<String, Value>, driver_dpi: f64) -> Result<f64> {
    match envelope.get("dpi") {
        None | Some(Value::Null) => Ok(driver_dpi),
        Some(value) => {
            let dpi = number("dpi", value)?;
            if dpi > 0.0 {
                Ok(dpi)
            } else {
                Err(coercion_error("dpi", value))
            }
        }
    }
}

fn number(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| coercion_error(field, value))
}

fn coercion_error(field: &str, value: &Value) -> EtiketError {
    EtiketError::NumericCoercion {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn layout_enum<T: FromStr<Err = EtiketError>>(
    envelope: &Map<String, Value>,
    field: &str,
    default: T,
) -> Result<T> {
    match envelope.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(EtiketError::MalformedEnvelope(format!(
            "{} must be a string, got {}",
            field,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
