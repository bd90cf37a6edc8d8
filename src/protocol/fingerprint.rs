//! # Intermec Fingerprint Command Lines
//!
//! Fingerprint is a line-oriented BASIC-like language. Each command is one
//! line terminated with CR LF; string arguments are double-quoted with
//! embedded quotes doubled.
//!
//! ## Command Summary
//!
//! | Builder | Line |
//! |---------|------|
//! | [`setup`] | `SETUP "<name>"` |
//! | [`font`] | `FONT "<name>",<size>` |
//! | [`align`] | `ALIGN <code>` |
//! | [`dir`] | `DIR <code>` |
//! | [`prpos`] | `PRPOS <x>,<y>` |
//! | [`prtxt`] | `PRTXT "<text>"` |
//! | [`barset`] | `BARSET "<type>",<w>,<r>,<h>,<s>` |
//! | [`prbar`] | `PRBAR "<value>"` |
//! | [`rem`] | `REM -- <text> --` |
//! | [`printfeed`] | `PRINTFEED` |
//!
//! ## Coordinates
//!
//! The print position is given in dots from the bottom-left corner of the
//! label, Y growing upwards.
//!
//! ## Alignment Codes
//!
//! ```text
//!   7 ─── 8 ─── 9
//!   │           │
//!   4     5     6
//!   │           │
//!   1 ─── 2 ─── 3
//! ```
//!
//! The code names the anchor point of the text box placed at the print
//! position.

/// Line terminator.
pub const LINE_END: &[u8] = b"\r\n";

/// Double-quote a string argument.
///
/// ```
/// use etiket::protocol::fingerprint::quote;
///
/// assert_eq!(quote(r#"5" vial"#), r#""5"" vial""#);
/// ```
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// # Select Label Layout (SETUP)
pub fn setup(name: &str) -> String {
    format!("SETUP {}", quote(name))
}

/// # Select Font (FONT)
///
/// `size` is the font height in points.
pub fn font(name: &str, size: i64) -> String {
    format!("FONT {},{}", quote(name), size)
}

/// # Set Alignment (ALIGN)
///
/// `code` is one of the 1–9 anchor positions.
pub fn align(code: &str) -> String {
    format!("ALIGN {}", code)
}

/// # Set Print Direction (DIR)
///
/// | Code | Direction |
/// |------|-----------|
/// | 1 | Normal |
/// | 2 | 90° clockwise |
/// | 3 | 180° |
/// | 4 | 270° clockwise |
pub fn dir(code: &str) -> String {
    format!("DIR {}", code)
}

/// # Set Print Position (PRPOS)
pub fn prpos(x: i64, y: i64) -> String {
    format!("PRPOS {},{}", x, y)
}

/// # Print Text (PRTXT)
pub fn prtxt(text: &str) -> String {
    format!("PRTXT {}", quote(text))
}

/// # Barcode Setup (BARSET)
///
/// ## Parameters
///
/// - `kind`: symbology, e.g. `DATAMATRIX`, `CODE128`
/// - `width`: narrow element width (enlargement for 2D codes)
/// - `ratio`: wide/narrow ratio
/// - `height`: bar height (module height for 2D codes)
/// - `size`: symbology-specific size parameter
pub fn barset(kind: &str, width: i64, ratio: i64, height: i64, size: i64) -> String {
    format!(
        "BARSET {},{},{},{},{}",
        quote(kind),
        width,
        ratio,
        height,
        size
    )
}

/// # Print Barcode (PRBAR)
pub fn prbar(value: &str) -> String {
    format!("PRBAR {}", quote(value))
}

/// # Remark (REM)
pub fn rem(text: &str) -> String {
    format!("REM -- {} --", text)
}

/// # Print and Feed (PRINTFEED)
pub fn printfeed() -> String {
    "PRINTFEED".to_string()
}
