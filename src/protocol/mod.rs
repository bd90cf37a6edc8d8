//! # Printer Dialects
//!
//! Line builders for the printer command languages spoken by the drivers,
//! plus the text encoding they go over the wire in.
//!
//! ## Module Structure
//!
//! - [`fingerprint`]: Intermec Fingerprint command lines
//! - [`latin1`]: ISO 8859-1 encoding for device text
//!
//! ## Usage Example
//!
//! ```
//! use etiket::protocol::{fingerprint, latin1};
//!
//! let mut data = Vec::new();
//! for line in [
//!     fingerprint::setup("VIAL_BOX"),
//!     fingerprint::font("Swiss 721 BT", 8),
//!     fingerprint::prpos(80, 400),
//!     fingerprint::prtxt("Café"),
//!     fingerprint::printfeed(),
//! ] {
//!     data.extend(latin1::encode(&line));
//!     data.extend(fingerprint::LINE_END);
//! }
//! assert!(data.ends_with(b"PRINTFEED\r\n"));
//! ```

pub mod fingerprint;
pub mod latin1;
