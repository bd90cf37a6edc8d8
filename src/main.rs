//! # Etiket CLI
//!
//! Command-line interface for the label pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Run the label server against a printer
//! etiket serve --printer 10.0.0.118 --out-dir out
//!
//! # Render a template into an envelope
//! etiket render scleral_v4 --demo > label.json
//!
//! # Replay an envelope without contacting the printer
//! etiket run label.json --dry
//!
//! # Check an envelope against the command schema
//! etiket validate label.json
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use etiket::{
    DriverKind, EtiketError, Interpreter, create_driver,
    driver::FingerprintDriver,
    envelope,
    interpreter::Payload,
    server::{self, DEFAULT_TEMPLATE, ServerConfig},
    template::TemplateRegistry,
    values::{self, OrderSpec, ValueDefaults, ValueMap},
};

const BUNDLED_SCHEMA: &str = include_str!("../schema/printer_commands.schema.json");

/// Etiket - label printing pipeline
#[derive(Parser, Debug)]
#[command(name = "etiket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding domain defaults (captions, device identifier)
    #[arg(long, global = true, value_name = "FILE")]
    defaults: Option<PathBuf>,

    /// Directory of XML templates shadowing the built-in ones
    #[arg(long, global = true, value_name = "DIR", env = "ETIKET_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Receive records over TCP and print them
    Serve {
        /// Label listener address
        #[arg(long, default_value = "0.0.0.0:9100")]
        listen: String,

        /// Also serve the HTTP API on this address
        #[arg(long, value_name = "ADDR")]
        api: Option<String>,

        /// Printer address (host or host:port)
        #[arg(long, default_value = "127.0.0.1")]
        printer: String,

        /// Driver backend
        #[arg(long, value_enum, default_value_t = DriverKind::Fingerprint)]
        driver: DriverKind,

        /// Template rendered for each record
        #[arg(long, default_value = DEFAULT_TEMPLATE)]
        template: String,

        /// Buffer device output instead of printing
        #[arg(long)]
        dry: bool,

        /// Output directory for labels.csv and per-label files
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Seconds of silence that end a record
        #[arg(long, default_value = "2")]
        read_timeout: u64,
    },

    /// Render a template into an envelope (JSON on stdout)
    Render {
        /// Template name (see `etiket templates`)
        template: String,

        /// JSON object of field values
        #[arg(long, value_name = "FILE", conflicts_with_all = ["order", "demo"])]
        values: Option<PathBuf>,

        /// JSON order description mapped to field values
        #[arg(long, value_name = "FILE", conflicts_with = "demo")]
        order: Option<PathBuf>,

        /// Use the built-in sample order
        #[arg(long)]
        demo: bool,

        /// Skip display field derivation
        #[arg(long)]
        raw: bool,

        /// Write the envelope here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Execute an envelope against a driver
    Run {
        /// Envelope JSON file
        envelope: PathBuf,

        /// Driver backend
        #[arg(long, value_enum, default_value_t = DriverKind::Fingerprint)]
        driver: DriverKind,

        /// Printer address (host or host:port)
        #[arg(long, default_value = "127.0.0.1")]
        printer: String,

        /// Print device lines instead of sending them
        #[arg(long)]
        dry: bool,
    },

    /// Validate an envelope against the command schema
    Validate {
        /// Envelope JSON file
        envelope: PathBuf,

        /// Schema file (defaults to the bundled schema)
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
    },

    /// List available templates
    Templates,

    /// Render the sample order and show the Fingerprint output
    Demo {
        /// Template to render
        #[arg(long, default_value = DEFAULT_TEMPLATE)]
        template: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "etiket=info,tower_http=info".into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), EtiketError> {
    let cli = Cli::parse();
    let defaults = load_defaults(cli.defaults.as_deref())?;
    let registry = match &cli.template_dir {
        Some(dir) => TemplateRegistry::with_dir(dir),
        None => TemplateRegistry::builtin(),
    };

    match cli.command {
        Commands::Serve {
            listen,
            api,
            printer,
            driver,
            template,
            dry,
            out_dir,
            read_timeout,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                api_addr: api,
                printer,
                driver,
                template,
                dry_run: dry,
                out_dir,
                template_dir: cli.template_dir,
                read_timeout: Duration::from_secs(read_timeout),
                defaults,
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config))?;
        }

        Commands::Render {
            template,
            values: values_file,
            order,
            demo,
            raw,
            out,
        } => {
            let mut map = if let Some(path) = values_file {
                read_json::<ValueMap>(&path)?
            } else if let Some(path) = order {
                values::build_values_from_order(&read_json::<OrderSpec>(&path)?, &defaults)
            } else if demo {
                values::build_values_from_order(&values::demo_order(&defaults), &defaults)
            } else {
                ValueMap::new()
            };
            if !raw {
                map = values::derive_display_fields(&map, &defaults);
            }

            let json = registry.render_template(&template, &map)?.to_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Saved to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Run {
            envelope,
            driver,
            printer,
            dry,
        } => {
            let mut driver = create_driver(driver, &printer, dry);
            let count = Interpreter::new(driver.as_mut()).run(Payload::File(envelope))?;
            if let Some(lines) = driver.sent_lines() {
                for line in lines {
                    println!("{}", line);
                }
            }
            eprintln!("Executed {} commands", count);
        }

        Commands::Validate {
            envelope: path,
            schema,
        } => {
            let instance = Payload::File(path.clone()).resolve()?;
            let schema: Value = match schema {
                Some(path) => read_json(&path)?,
                None => serde_json::from_str(BUNDLED_SCHEMA)?,
            };
            envelope::validate_value(&instance, &schema)?;
            println!("{}: valid", path.display());
        }

        Commands::Templates => {
            println!("Available templates:");
            for name in registry.list_templates() {
                match registry.get_template(&name) {
                    Ok(t) => println!(
                        "  {:<16} {}x{} {}  {} elements",
                        name,
                        t.width,
                        t.height,
                        t.units.as_str(),
                        t.element_count()
                    ),
                    Err(e) => println!("  {:<16} (unreadable: {})", name, e),
                }
            }
            if let Some(dir) = registry.dir() {
                println!("\nTemplate directory: {}", dir.display());
            }
        }

        Commands::Demo { template } => {
            let map = values::build_values_from_order(&values::demo_order(&defaults), &defaults);
            let map = values::derive_display_fields(&map, &defaults);
            let envelope = registry.render_template(&template, &map)?;

            let mut driver = FingerprintDriver::dry_run();
            Interpreter::new(&mut driver).run_envelope(&envelope)?;
            for line in driver.sent() {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn load_defaults(path: Option<&Path>) -> Result<ValueDefaults, EtiketError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(ValueDefaults::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EtiketError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| EtiketError::Payload(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| EtiketError::Payload(format!("{} is not valid JSON: {}", path.display(), e)))
}

