//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::driver::DriverKind;
use crate::template::TemplateRegistry;
use crate::values::ValueDefaults;

/// Template rendered for every incoming record unless configured otherwise.
pub const DEFAULT_TEMPLATE: &str = "scleral_v4";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the label listener binds (e.g., "0.0.0.0:9100")
    pub listen_addr: String,
    /// Address for the HTTP API; no API when `None`
    pub api_addr: Option<String>,
    /// Printer address, `host` or `host:port`
    pub printer: String,
    /// Driver backend used for print jobs
    pub driver: DriverKind,
    /// Template rendered for incoming records
    pub template: String,
    /// Buffer device lines instead of contacting the printer
    pub dry_run: bool,
    /// Directory receiving `labels.csv` and per-label output files
    pub out_dir: PathBuf,
    /// On-disk templates shadowing the built-in ones
    pub template_dir: Option<PathBuf>,
    /// How long a connection may stay silent before its record is taken as complete
    pub read_timeout: Duration,
    /// Domain defaults for blank record fields
    pub defaults: ValueDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9100".to_string(),
            api_addr: None,
            printer: "127.0.0.1".to_string(),
            driver: DriverKind::default(),
            template: DEFAULT_TEMPLATE.to_string(),
            dry_run: false,
            out_dir: PathBuf::from("out"),
            template_dir: None,
            read_timeout: Duration::from_secs(2),
            defaults: ValueDefaults::default(),
        }
    }
}

/// Application state shared by the label listener and HTTP handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: TemplateRegistry,
    /// Serialises print jobs: one envelope reaches the device at a time.
    pub print_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = match &config.template_dir {
            Some(dir) => TemplateRegistry::with_dir(dir),
            None => TemplateRegistry::builtin(),
        };
        Self {
            config,
            registry,
            print_lock: Mutex::new(()),
        }
    }
}
