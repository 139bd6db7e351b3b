//! MemsFCR monitor
//!
//! Connects to a Rover MEMS ECU (or the loopback ECU, or a recorded scenario), polls
//! its dataframes and reports engine status and faults as they are detected.
//!
//! # Usage
//!
//! ```bash
//! memsfcr-monitor --port /dev/ttyUSB0
//! memsfcr-monitor --port loopback --cycles 20 --no-log
//! memsfcr-monitor --port drive.fcr
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memsfcr_core::config::{default_config_path, MemsConfig};
use memsfcr_core::datalog::{DataLogger, ScenarioFile};
use memsfcr_core::ecu::{EcuReader, Reading};
use memsfcr_core::poll::PollLoop;
use memsfcr_core::protocol::list_ports;

/// Prefix of log file names
const LOG_PREFIX: &str = "memsfcr";

#[derive(Parser, Debug)]
#[command(name = "memsfcr-monitor")]
#[command(about = "Poll a Rover MEMS ECU and report engine faults", version)]
struct Args {
    /// Serial port, `loopback`, or a .csv/.fcr scenario to replay
    #[arg(short, long)]
    port: Option<String>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many polls
    #[arg(long)]
    cycles: Option<u64>,

    /// Don't write a CSV log
    #[arg(long)]
    no_log: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Convert a CSV log to a .fcr scenario and exit
    #[arg(long, value_name = "LOG")]
    convert: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Filter used when `RUST_LOG` is not set
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "memsfcr_core=debug,memsfcr_monitor=debug"
    } else {
        "memsfcr_core=info,memsfcr_monitor=info"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &Args) -> Result<MemsConfig> {
    let mut config = match &args.config {
        Some(path) => MemsConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MemsConfig::load_or_default(default_config_path()),
    };

    if let Some(port) = &args.port {
        config.connection = port.clone();
    }
    if let Some(interval) = args.interval {
        config.poll_interval_ms = interval;
    }
    if args.no_log {
        config.log_to_file = false;
    }
    Ok(config)
}

fn convert(log: &Path) -> Result<()> {
    let scenario = ScenarioFile::from_log(log)
        .with_context(|| format!("Failed to read log {}", log.display()))?;
    let out = log.with_file_name(&scenario.name);
    scenario
        .write(&out)
        .with_context(|| format!("Failed to write scenario {}", out.display()))?;
    println!("{} records written to {}", scenario.count, out.display());
    Ok(())
}

fn report(reading: &Reading) {
    let sample = &reading.sample;
    let faults = reading.report.active_faults();
    info!(
        time = %sample.time_of_day(),
        rpm = sample.engine_rpm,
        coolant = sample.coolant_temp,
        map = sample.manifold_absolute_pressure,
        lambda = sample.lambda_voltage,
        idle = reading.report.is_engine_idle,
        "reading"
    );
    if !faults.is_empty() {
        warn!(?faults, "faults detected");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_ports {
        for port in list_ports() {
            println!("{}\t{}", port.name, port.product.unwrap_or_default());
        }
        return Ok(());
    }

    if let Some(log) = &args.convert {
        return convert(log);
    }

    let config = load_config(&args)?;
    info!(connection = %config.connection, "starting MemsFCR monitor");

    let reader = EcuReader::from_config(&config);
    let (reader, connected) = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let connected = reader.connect();
        (reader, connected)
    })
    .await
    .context("Connect task failed")?;

    if !connected.with_context(|| format!("Failed to connect to {}", config.connection))? {
        bail!("No ECU responded on {}", config.connection);
    }

    let status = reader.status().clone();
    println!(
        "Connected to ECU {} (serial {}, IAC {})",
        status.ecu_id, status.ecu_serial, status.iac_position
    );

    let reader = Arc::new(Mutex::new(reader));
    let cancel = CancellationToken::new();

    let mut poll = PollLoop::new(
        Arc::clone(&reader),
        Duration::from_millis(config.poll_interval_ms),
    )
    .with_cancellation(cancel.clone());

    if let Some(cycles) = args.cycles {
        poll = poll.with_cycle_limit(cycles);
    }

    if config.log_to_file {
        let logger = DataLogger::create(&config.log_folder, LOG_PREFIX)
            .await
            .with_context(|| format!("Failed to create log in {}", config.log_folder.display()))?;
        println!("Logging to {}", logger.path().display());
        poll = poll.with_logger(logger);
    }

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            ctrl_c.cancel();
        }
    });

    let summary = poll.run(report).await;

    let mut reader = reader.lock().await;
    if let Err(e) = reader.disconnect() {
        warn!("error while disconnecting: {}", e);
    }

    println!(
        "{} polls, {} readings, {} transport errors, {} decode errors",
        summary.cycles, summary.readings, summary.transport_errors, summary.decode_errors
    );
    if let Some(error) = summary.terminal_error {
        bail!("Polling stopped: {}", error);
    }
    Ok(())
}
