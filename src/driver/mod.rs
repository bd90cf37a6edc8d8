//! # Printer Drivers
//!
//! A driver turns envelope commands into device output: network writes, a
//! dry-run buffer, or console lines. The [`Driver`] trait has one method per
//! command name; the interpreter dispatches to them in envelope order.
//!
//! ## Available Drivers
//!
//! | Kind | Type | Native space | DPI |
//! |------|------|--------------|-----|
//! | `fingerprint` | [`FingerprintDriver`] | bottom-left, Y up | 203 |
//! | `console` | [`ConsoleDriver`] | top-left, Y down | 96 |
//!
//! ## Coordinate Spaces
//!
//! Templates lay labels out in the canonical space: origin bottom-left,
//! Y growing upwards. Each driver owns a [`DeviceSpace`] that maps source
//! coordinates into its native space:
//!
//! ```text
//!  canonical (bottom-left, up)        top-left, down
//!
//!  H ┌──────────┐                   0 ┌──────────┐
//!    │   • (x,y)│                     │   • (x,H-y)
//!    │          │                     │          │
//!  0 └──────────┘                   H └──────────┘
//!    0          W                     0          W
//! ```
//!
//! ## Optional Capabilities
//!
//! `configure_layout`, `set_label_context`, `open` and `close` have no-op
//! defaults, so a minimal driver only implements the command methods.

mod console;
mod fingerprint;

pub use console::ConsoleDriver;
pub use fingerprint::FingerprintDriver;

use serde::{Deserialize, Serialize};

use crate::envelope::{Origin, Units, YDirection};
use crate::error::Result;
use crate::transport::TcpOptions;

/// Layout pushed into a driver before a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    pub width: f64,
    pub height: f64,
    pub units: Units,
    pub origin: Origin,
    pub y_direction: YDirection,
    /// Effective dpi: the envelope's, or the driver's own.
    pub dpi: f64,
}

/// Capability contract every printer backend implements.
///
/// Command methods are side-effecting and fallible. Drivers that need a live
/// connection return [`EtiketError::NotConnected`](crate::error::EtiketError::NotConnected)
/// when called outside `open()`/`close()`.
pub trait Driver {
    fn setup(&mut self, name: &str) -> Result<()>;
    fn set_font(&mut self, name: &str, size: f64) -> Result<()>;
    fn set_alignment(&mut self, align: &str) -> Result<()>;
    fn set_direction(&mut self, direction: &str) -> Result<()>;
    /// Move the print position. `x`/`y` are in the envelope's source space.
    fn move_to(&mut self, x: f64, y: f64) -> Result<()>;
    fn draw_text(&mut self, text: &str) -> Result<()>;
    fn draw_barcode(
        &mut self,
        value: &str,
        kind: &str,
        width: i64,
        ratio: i64,
        height: i64,
        size: i64,
    ) -> Result<()>;
    fn comment(&mut self, text: &str) -> Result<()>;
    fn print_feed(&mut self) -> Result<()>;

    /// Native resolution.
    fn dpi(&self) -> f64;

    /// Map source coordinates into the driver's native space.
    fn to_device_coords(&self, x: f64, y: f64) -> (f64, f64);

    /// Receive the envelope's full layout.
    fn configure_layout(&mut self, _layout: &LayoutContext) {}

    /// Receive the label height, units and effective dpi.
    fn set_label_context(&mut self, _height: f64, _units: Units, _dpi: f64) {}

    /// Acquire the device session (connect).
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the device session. Must be safe to call after errors.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Device lines buffered by a dry run, if this driver buffers.
    fn sent_lines(&self) -> Option<&[String]> {
        None
    }
}

/// Per-driver coordinate state: native space, source space, label extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSpace {
    pub native_origin: Origin,
    pub native_y_direction: YDirection,
    pub source_origin: Origin,
    pub source_y_direction: YDirection,
    /// Label width in source units.
    pub width: f64,
    /// Label height in source units.
    pub height: f64,
    pub units: Units,
    pub dpi: f64,
}

impl DeviceSpace {
    /// Space for a driver with the given native orientation. The source space
    /// starts out canonical (bottom-left, Y up) with a zero extent.
    pub fn new(native_origin: Origin, native_y_direction: YDirection, dpi: f64) -> Self {
        Self {
            native_origin,
            native_y_direction,
            source_origin: Origin::BottomLeft,
            source_y_direction: YDirection::Up,
            width: 0.0,
            height: 0.0,
            units: Units::Mm,
            dpi,
        }
    }

    /// Adopt the envelope's layout as the source space.
    pub fn configure(&mut self, layout: &LayoutContext) {
        self.source_origin = layout.origin;
        self.source_y_direction = layout.y_direction;
        self.width = layout.width;
        self.height = layout.height;
        self.units = layout.units;
        self.dpi = layout.dpi;
    }

    pub fn set_label_context(&mut self, height: f64, units: Units, dpi: f64) {
        self.height = height;
        self.units = units;
        self.dpi = dpi;
    }

    /// Source → native coordinates, still in source units.
    ///
    /// Y flips to `height - y` when the Y directions differ; X flips to
    /// `width - x` when one origin is on the left and the other on the
    /// right. A zero extent leaves that axis untouched.
    pub fn to_device(&self, x: f64, y: f64) -> (f64, f64) {
        let x = if self.source_origin.is_right() != self.native_origin.is_right() && self.width > 0.0 {
            self.width - x
        } else {
            x
        };
        let y = if self.source_y_direction != self.native_y_direction && self.height > 0.0 {
            self.height - y
        } else {
            y
        };
        (x, y)
    }

    /// Convert a length in source units to device dots.
    pub fn to_dots(&self, value: f64) -> i64 {
        self.units.to_dots(value, self.dpi).round() as i64
    }
}

/// Driver backends selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Intermec Fingerprint over TCP (or dry-run buffer)
    #[default]
    #[value(alias = "pd41")]
    #[serde(alias = "pd41")]
    Fingerprint,
    /// Human-readable lines on stdout
    #[value(alias = "gdi")]
    #[serde(alias = "gdi")]
    Console,
}

impl DriverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverKind::Fingerprint => "fingerprint",
            DriverKind::Console => "console",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create a fresh driver instance.
///
/// `printer` is only used by network drivers; `dry_run` keeps them off the
/// network and buffers device lines instead.
pub fn create_driver(kind: DriverKind, printer: &str, dry_run: bool) -> Box<dyn Driver + Send> {
    match kind {
        DriverKind::Fingerprint => {
            if dry_run {
                Box::new(FingerprintDriver::dry_run())
            } else {
                Box::new(FingerprintDriver::new(printer, TcpOptions::default()))
            }
        }
        DriverKind::Console => Box::new(ConsoleDriver::stdout()),
    }
}
