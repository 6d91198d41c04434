//! # modbridge-host
//!
//! Command-line host for add-on bridging.
//!
//! The host is responsible for:
//! - Building the source set (plugin directory plus active mod manager profiles)
//! - Inspecting module images without executing them
//! - Activating discovered bridges and tearing them down on exit
//!
//! ## Configuration
//!
//! The host reads configuration from `$XDG_CONFIG_HOME/modbridge/config.toml`,
//! or from the file passed with `--config`.
//!
//! ## Running
//!
//! ```bash
//! # Scan and report what would be loaded
//! cargo run --bin modbridge-host -- scan
//!
//! # Describe the bridge types in one module
//! cargo run --bin modbridge-host -- inspect path/to/Example.bmod
//!
//! # Scan, activate, and wait for Ctrl+C
//! RUST_LOG=debug cargo run --bin modbridge-host -- run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modbridge_api::ModuleInspector;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modbridge_host::config::Config;
use modbridge_host::{build_host, host_context};

#[derive(Debug, Parser)]
#[command(name = "modbridge-host", version, about = "Discover and bridge add-on modules")]
struct Cli {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan all sources and report what was found
    Scan,
    /// Describe the bridge types in one module file
    Inspect {
        /// Module file to inspect
        file: PathBuf,
    },
    /// Scan, activate bridges, and wait for Ctrl+C
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting modbridge-host v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Run) {
        Command::Scan => scan(&config, cli.json),
        Command::Inspect { file } => inspect(&config, &file, cli.json),
        Command::Run => run(&config).await,
    }
}

fn scan(config: &Config, json: bool) -> Result<()> {
    let mut host = build_host(config)?;
    let report = host.scan().context("Scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for source in &report.sources {
        println!("source  {}", source.display());
    }
    for entry in host.registry().entries() {
        for instance in &entry.instances {
            println!("bridge  {}  ({})", instance.type_name(), entry.path.display());
        }
    }
    println!(
        "{} file(s) seen, {} inspected, {} failed, {} bridge(s)",
        report.files_seen, report.files_inspected, report.files_failed, report.instances
    );
    Ok(())
}

fn inspect(config: &Config, file: &Path, json: bool) -> Result<()> {
    let host = build_host(config)?;
    let inspector = ModuleInspector::new(host.scanner().contract(), host.catalog());
    let descriptors = inspector
        .describe(file)
        .with_context(|| format!("Failed to inspect {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    if descriptors.is_empty() {
        println!("No bridge types in {}", file.display());
    }
    for descriptor in &descriptors {
        println!(
            "{:<40} factory={:<5} tagged={:<5} load={}",
            descriptor.type_name,
            descriptor.resolvable,
            descriptor.opted_in,
            descriptor.would_load()
        );
    }
    Ok(())
}

async fn run(config: &Config) -> Result<()> {
    let mut host = build_host(config)?;
    let context = host_context(config)?;

    let report = host.scan().context("Scan failed")?;
    info!(
        "Discovered {} bridge(s) in {} source(s)",
        report.instances,
        report.sources.len()
    );

    let activation = host.activate(&context);
    if !activation.is_clean() {
        warn!("{} bridge(s) failed to load", activation.failures.len());
    }

    info!("Host session {} running", context.session_id);
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    host.shutdown();

    info!("Host stopped");
    Ok(())
}
