//! Console stub driver.
//!
//! Stands in for a GDI-style page printer: native space is top-left with Y
//! growing downwards at 96 dpi. Every command becomes one bracketed line on
//! the wrapped writer, which makes it handy for eyeballing an envelope.

use std::io::{self, Stdout, Write};

use super::{DeviceSpace, Driver, LayoutContext};
use crate::envelope::{Origin, Units, YDirection};
use crate::error::Result;

pub const CONSOLE_DPI: f64 = 96.0;

/// Label height assumed until a layout says otherwise.
pub const DEFAULT_LABEL_HEIGHT: f64 = 60.0;

pub struct ConsoleDriver<W: Write> {
    out: W,
    space: DeviceSpace,
}

impl ConsoleDriver<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleDriver<W> {
    pub fn new(out: W) -> Self {
        let mut space = DeviceSpace::new(Origin::TopLeft, YDirection::Down, CONSOLE_DPI);
        space.height = DEFAULT_LABEL_HEIGHT;
        Self { out, space }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) -> Result<()> {
        self.out.write_fmt(text)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> Driver for ConsoleDriver<W> {
    fn setup(&mut self, name: &str) -> Result<()> {
        self.line(format_args!("[SETUP] {}", name))
    }

    fn set_font(&mut self, name: &str, size: f64) -> Result<()> {
        self.line(format_args!("[FONT] {} {}", name, size))
    }

    fn set_alignment(&mut self, align: &str) -> Result<()> {
        self.line(format_args!("[ALIGN] {}", align))
    }

    fn set_direction(&mut self, direction: &str) -> Result<()> {
        self.line(format_args!("[DIR] {}", direction))
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        let (x, y) = self.to_device_coords(x, y);
        self.line(format_args!("[MOVE] {:.1},{:.1}", x, y))
    }

    fn draw_text(&mut self, text: &str) -> Result<()> {
        self.line(format_args!("[TEXT] {}", text))
    }

    fn draw_barcode(
        &mut self,
        value: &str,
        kind: &str,
        width: i64,
        _ratio: i64,
        height: i64,
        _size: i64,
    ) -> Result<()> {
        self.line(format_args!("[BARCODE] {} '{}' {}x{}", kind, value, width, height))
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.line(format_args!("[COMMENT] {}", text))
    }

    fn print_feed(&mut self) -> Result<()> {
        self.line(format_args!("[PRINTFEED]"))?;
        self.out.flush()?;
        Ok(())
    }

    fn dpi(&self) -> f64 {
        CONSOLE_DPI
    }

    fn to_device_coords(&self, x: f64, y: f64) -> (f64, f64) {
        self.space.to_device(x, y)
    }

    fn configure_layout(&mut self, layout: &LayoutContext) {
        self.space.configure(layout);
    }

    fn set_label_context(&mut self, height: f64, units: Units, dpi: f64) {
        self.space.set_label_context(height, units, dpi);
    }
}
