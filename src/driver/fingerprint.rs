//! Intermec Fingerprint network driver.
//!
//! Live mode writes CRLF-terminated Latin-1 lines to the printer over TCP.
//! Dry-run mode appends the same lines to an in-memory buffer.

use tracing::{debug, info};

use super::{DeviceSpace, Driver, LayoutContext};
use crate::envelope::{Origin, Units, YDirection};
use crate::error::{EtiketError, Result};
use crate::protocol::{fingerprint, latin1};
use crate::transport::{TcpOptions, TcpTransport};

/// Resolution of the PD41-class printers this dialect targets.
pub const FINGERPRINT_DPI: f64 = 203.0;

enum Output {
    DryRun(Vec<String>),
    Live {
        printer: String,
        options: TcpOptions,
        transport: Option<TcpTransport>,
    },
}

/// Driver speaking the Fingerprint line protocol.
///
/// Native space is bottom-left, Y up. Positions are converted from layout
/// units to dots and rounded.
pub struct FingerprintDriver {
    output: Output,
    space: DeviceSpace,
}

impl FingerprintDriver {
    /// Live driver for `host` or `host:port`. Nothing connects until `open()`.
    pub fn new(printer: &str, options: TcpOptions) -> Self {
        Self::with_output(Output::Live {
            printer: printer.to_string(),
            options,
            transport: None,
        })
    }

    /// Driver that buffers lines instead of sending them.
    pub fn dry_run() -> Self {
        Self::with_output(Output::DryRun(Vec::new()))
    }

    fn with_output(output: Output) -> Self {
        Self {
            output,
            space: DeviceSpace::new(Origin::BottomLeft, YDirection::Up, FINGERPRINT_DPI),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.output, Output::DryRun(_))
    }

    /// Lines buffered so far (always empty in live mode).
    pub fn sent(&self) -> &[String] {
        match &self.output {
            Output::DryRun(sent) => sent,
            Output::Live { .. } => &[],
        }
    }

    pub fn space(&self) -> &DeviceSpace {
        &self.space
    }

    fn send(&mut self, line: String) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        match &mut self.output {
            Output::DryRun(sent) => {
                sent.push(line);
                Ok(())
            }
            Output::Live { transport, .. } => {
                let transport = transport.as_mut().ok_or(EtiketError::NotConnected)?;
                let mut data = latin1::encode(&line);
                data.extend_from_slice(fingerprint::LINE_END);
                transport.write_all(&data)
            }
        }
    }
}

impl Driver for FingerprintDriver {
    fn setup(&mut self, name: &str) -> Result<()> {
        self.send(fingerprint::setup(name))
    }

    fn set_font(&mut self, name: &str, size: f64) -> Result<()> {
        self.send(fingerprint::font(name, size as i64))
    }

    fn set_alignment(&mut self, align: &str) -> Result<()> {
        self.send(fingerprint::align(align))
    }

    fn set_direction(&mut self, direction: &str) -> Result<()> {
        self.send(fingerprint::dir(direction))
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        let (x, y) = self.to_device_coords(x, y);
        let (x, y) = (self.space.to_dots(x), self.space.to_dots(y));
        self.send(fingerprint::prpos(x, y))
    }

    fn draw_text(&mut self, text: &str) -> Result<()> {
        self.send(fingerprint::prtxt(text))
    }

    fn draw_barcode(
        &mut self,
        value: &str,
        kind: &str,
        width: i64,
        ratio: i64,
        height: i64,
        size: i64,
    ) -> Result<()> {
        self.send(fingerprint::barset(kind, width, ratio, height, size))?;
        self.send(fingerprint::prbar(value))
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.send(fingerprint::rem(text))
    }

    fn print_feed(&mut self) -> Result<()> {
        self.send(fingerprint::printfeed())
    }

    fn dpi(&self) -> f64 {
        FINGERPRINT_DPI
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

    fn open(&mut self) -> Result<()> {
        if let Output::Live {
            printer,
            options,
            transport,
        } = &mut self.output
        {
            if transport.is_none() {
                *transport = Some(TcpTransport::connect(printer, *options)?);
            }
        } else {
            debug!("Dry run, no connection opened");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Output::Live { transport, .. } = &mut self.output {
            if let Some(transport) = transport.take() {
                transport.shutdown();
            }
        }
        Ok(())
    }

    fn sent_lines(&self) -> Option<&[String]> {
        match &self.output {
            Output::DryRun(sent) => Some(sent),
            Output::Live { .. } => None,
        }
    }
}

impl Drop for FingerprintDriver {
    fn drop(&mut self) {
        if let Output::Live {
            transport: Some(_), ..
        } = &self.output
        {
            info!("Driver dropped with open connection, closing");
            let _ = self.close();
        }
    }
}
