//! # Printer Transport Layer
//!
//! Communication backends for sending device bytes to printers.
//!
//! ## Available Transports
//!
//! - [`tcp`]: raw TCP (port 9100) for network label printers

pub mod tcp;

pub use tcp::{TcpOptions, TcpTransport};
