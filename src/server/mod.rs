//! # Label Server
//!
//! Accepts REGEL records from the order system over TCP, logs them, renders
//! the configured template and prints the result. An optional HTTP API
//! exposes the template registry and the interpreter.
//!
//! ## Usage
//!
//! ```bash
//! etiket serve --listen 0.0.0.0:9100 --printer 10.0.0.118 --out-dir out
//! etiket serve --dry --api 127.0.0.1:8080
//! ```
//!
//! ## Per-record pipeline
//!
//! ```text
//! bytes ─► Latin-1 ─► REGEL fields ─► labels.csv
//!                          │
//!                          ▼
//!                  display fields ─► template ─► envelope ─► driver
//!                                                   │           │
//!                                          label_<ts>.json  label_<ts>.prn
//! ```
//!
//! Print jobs from the listener and the API share one lock, so a single
//! envelope reaches the device at a time.

mod api;
mod csv_log;
mod listener;
mod state;

pub use api::router;
pub use csv_log::{CSV_FILE, RECEIVED_AT};
pub use listener::{LabelJob, MAX_RECORD_BYTES, accept_loop, decode_record, process_record, read_record};
pub use state::{AppState, DEFAULT_TEMPLATE, ServerConfig};

use std::sync::Arc;

use tracing::{error, info};

use crate::error::{EtiketError, Result};

/// Start the label listener and, if configured, the HTTP API.
///
/// ## Example
///
/// ```no_run
/// use etiket::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), etiket::error::EtiketError> {
/// let config = ServerConfig {
///     dry_run: true,
///     api_addr: Some("127.0.0.1:8080".to_string()),
///     ..ServerConfig::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.out_dir)?;
    let state = Arc::new(AppState::new(config));

    if let Some(api_addr) = state.config.api_addr.clone() {
        let listener = tokio::net::TcpListener::bind(&api_addr)
            .await
            .map_err(|e| EtiketError::Transport(format!("Failed to bind to {}: {}", api_addr, e)))?;
        info!(addr = %api_addr, "HTTP API listening");

        let app = router(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "HTTP API stopped");
            }
        });
    }

    listener::run(state).await
}
