//! TCP label listener.
//!
//! One connection carries one record. The record ends at EOF, at an `&`
//! terminator, after [`MAX_RECORD_BYTES`], or when the peer stays silent for
//! the configured read timeout, whichever comes first.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};

use super::csv_log::{self, RECEIVED_AT};
use super::state::AppState;
use crate::driver::create_driver;
use crate::envelope::Envelope;
use crate::error::{EtiketError, Result};
use crate::interpreter::Interpreter;
use crate::protocol::latin1;
use crate::regel::{is_valid_regel, parse_regel};
use crate::values::derive_display_fields;

pub const MAX_RECORD_BYTES: usize = 65535;

/// Files written for one processed record.
#[derive(Debug)]
pub struct LabelJob {
    pub envelope: Envelope,
    pub commands: usize,
    pub json_path: PathBuf,
    /// Device lines, present when the driver buffered them.
    pub prn_path: Option<PathBuf>,
}

/// Bind the configured address and serve until the process stops.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let addr = &state.config.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| EtiketError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

    info!(
        addr = %addr,
        driver = %state.config.driver,
        template = %state.config.template,
        dry_run = state.config.dry_run,
        "Label server listening"
    );
    accept_loop(listener, state).await
}

/// Accept connections on an already bound listener.
pub async fn accept_loop(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            info!(%peer, "Connection opened");
            if let Err(e) = handle_connection(stream, state).await {
                error!(%peer, error = %e, "Label job failed");
            }
            info!(%peer, "Connection closed");
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> Result<()> {
    let raw = read_record(&mut stream, state.config.read_timeout).await?;
    if raw.is_empty() {
        info!("Empty connection ignored");
        return Ok(());
    }

    let Some(record) = decode_record(&raw) else {
        warn!(bytes = raw.len(), "Ignored invalid record");
        return Ok(());
    };

    let job = tokio::task::spawn_blocking(move || process_record(&state, &record))
        .await
        .map_err(|e| EtiketError::Transport(format!("Print task failed: {}", e)))??;

    info!(
        commands = job.commands,
        json = %job.json_path.display(),
        "Label processed"
    );
    Ok(())
}

/// Read one framed record from `reader`.
pub async fn read_record<R: AsyncRead + Unpin>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match tokio::time::timeout(timeout, reader.read(&mut chunk)).await {
            Ok(read) => read?,
            Err(_) => {
                debug!(bytes = buf.len(), "Read timed out, taking record as complete");
                break;
            }
        };
        if n == 0 {
            break;
        }

        buf.extend_from_slice(&chunk[..n]);
        if buf.len() >= MAX_RECORD_BYTES {
            buf.truncate(MAX_RECORD_BYTES);
            break;
        }
        if chunk[..n].contains(&b'&') {
            break;
        }
    }

    Ok(buf)
}

/// Decode raw bytes into a record, or `None` if it is not a plausible REGEL.
pub fn decode_record(raw: &[u8]) -> Option<String> {
    let text = latin1::decode(raw);
    let mut text = text.trim();
    if let Some(stripped) = text.strip_suffix('&') {
        text = stripped.trim();
    }
    is_valid_regel(text).then(|| text.to_string())
}

/// Parse, log, render and print one record. Blocking.
#[instrument(skip_all, fields(len = record.chars().count()))]
pub fn process_record(state: &AppState, record: &str) -> Result<LabelJob> {
    let config = &state.config;
    let now = Local::now();

    let mut values = parse_regel(record);
    values.insert(
        RECEIVED_AT.to_string(),
        now.to_rfc3339_opts(SecondsFormat::Micros, false),
    );
    info!(
        record_type = values.get("TYPE").map(String::as_str).unwrap_or(""),
        order = values.get("BONNR").map(String::as_str).unwrap_or(""),
        "Parsed record"
    );

    std::fs::create_dir_all(&config.out_dir)?;
    csv_log::append_row(&config.out_dir.join(csv_log::CSV_FILE), &values)?;

    let display = derive_display_fields(&values, &config.defaults);
    let envelope = state.registry.render_template(&config.template, &display)?;

    let (commands, lines) = {
        let _guard = state.print_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut driver = create_driver(config.driver, &config.printer, config.dry_run);
        let commands = Interpreter::new(driver.as_mut()).run_envelope(&envelope)?;
        (commands, driver.sent_lines().map(<[String]>::to_vec))
    };

    let stamp = now.format("%Y%m%d_%H%M%S_%3f");
    let json_path = config.out_dir.join(format!("label_{}.json", stamp));
    std::fs::write(&json_path, envelope.to_json()?)?;
    debug!(path = %json_path.display(), "Envelope saved");

    let prn_path = match lines {
        Some(lines) if !lines.is_empty() => {
            let path = config.out_dir.join(format!("label_{}.prn", stamp));
            std::fs::write(&path, latin1::encode(&lines.join("\n")))?;
            debug!(path = %path.display(), "Driver output saved");
            Some(path)
        }
        _ => None,
    };

    Ok(LabelJob {
        envelope,
        commands,
        json_path,
        prn_path,
    })
}
