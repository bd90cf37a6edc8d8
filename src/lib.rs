//! # Etiket - Label Printing Pipeline
//!
//! Etiket turns fixed-width order records into printed labels:
//!
//! - **Templates**: XML label layouts rendered against a value map
//! - **Command envelope**: a versioned, printer-agnostic JSON command list
//! - **Interpreter**: replays an envelope against a printer driver
//! - **Drivers**: Intermec Fingerprint over TCP, plus a console stub
//! - **Label server**: receives records over TCP and prints them
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiket::{
//!     driver::FingerprintDriver,
//!     interpreter::Interpreter,
//!     template,
//!     values::{ValueDefaults, build_values_from_order, demo_order, derive_display_fields},
//! };
//!
//! let defaults = ValueDefaults::default();
//! let values = build_values_from_order(&demo_order(&defaults), &defaults);
//! let values = derive_display_fields(&values, &defaults);
//!
//! // Render the built-in scleral template into an envelope
//! let envelope = template::render_template("scleral_v4", &values)?;
//!
//! // Replay it without touching the network
//! let mut driver = FingerprintDriver::dry_run();
//! Interpreter::new(&mut driver).run_envelope(&envelope)?;
//!
//! for line in driver.sent() {
//!     println!("{}", line);
//! }
//! # Ok::<(), etiket::error::EtiketError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`envelope`] | Command envelope model, JSON encoding, schema validation |
//! | [`template`] | XML templates, rendering, registry |
//! | [`interpreter`] | Envelope execution against a driver |
//! | [`driver`] | Driver trait, coordinate spaces, backends |
//! | [`protocol`] | Fingerprint line builders, Latin-1 codec |
//! | [`transport`] | TCP socket transport |
//! | [`regel`] | Fixed-width record parsing |
//! | [`values`] | Display field derivation, order mapping |
//! | [`server`] | TCP label server and HTTP API |
//! | [`error`] | Error types |

pub mod driver;
pub mod envelope;
pub mod error;
pub mod interpreter;
pub mod protocol;
pub mod regel;
pub mod server;
pub mod template;
pub mod transport;
pub mod values;

// Re-exports for convenience
pub use driver::{Driver, DriverKind, create_driver};
pub use envelope::{Command, Envelope};
pub use error::{EtiketError, Result};
pub use interpreter::Interpreter;
pub use template::LabelTemplate;
