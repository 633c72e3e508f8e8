use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use g4sync_lib::{
    DataExporter, DiscoveryConfig, JsonExporter, LastSyncStore, Receiver, SerialConfig, SerialTransport,
    SyncCoordinator, adapt, find_receiver,
};

/// Download glucose and event data from a Dexcom G4 receiver over USB serial.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Mode,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run a single sync and exit.
    Sync(SyncArgs),
    /// Keep looking for a receiver and sync it every interval until Ctrl-C.
    Watch {
        #[command(flatten)]
        sync: SyncArgs,
        /// Seconds between sync attempts.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

#[derive(Args, Debug, Clone)]
struct SyncArgs {
    /// Directory the JSON exports are written to.
    #[arg(short, long)]
    output_dir: PathBuf,
    /// File holding the instant of the last successful sync.
    #[arg(long, default_value = "g4-last-sync")]
    state_file: PathBuf,
    /// Serial port of the receiver. Skips discovery when given.
    #[arg(short, long)]
    port: Option<String>,
    /// Regex that candidate port names must match during discovery.
    #[arg(long)]
    port_pattern: Option<String>,
}

impl SyncArgs {
    fn discovery(&self) -> DiscoveryConfig {
        match &self.port_pattern {
            Some(pattern) => DiscoveryConfig::default().with_port_pattern(pattern.clone()),
            None => DiscoveryConfig::default(),
        }
    }
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false);

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file =
            File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG with -v (frame hex dumps), TRACE with -vv
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;
    let coordinator = SyncCoordinator::new();

    let outcome = match cli.command {
        Mode::Sync(args) => run_sync(&args, &coordinator).await,
        Mode::Watch { sync, interval_secs } => run_watch(&sync, &coordinator, interval_secs).await,
    };

    if let Err(e) = outcome {
        error!("Sync failed: {:?}", e);
        process::exit(1);
    }

    Ok(())
}

async fn run_sync(args: &SyncArgs, coordinator: &SyncCoordinator) -> Result<()> {
    if !args.output_dir.is_dir() {
        bail!("Output directory {:?} does not exist or is not a directory", args.output_dir);
    }

    let port = match &args.port {
        Some(port) => port.clone(),
        None => find_receiver(&args.discovery())
            .await
            .context("Failed to locate a receiver")?,
    };

    let Some(permit) = coordinator.try_begin(&port) else {
        warn!("A sync is already running on {}, skipping", port);
        return Ok(());
    };

    let store = LastSyncStore::new(&args.state_file);
    let last_sync = store
        .load()
        .with_context(|| format!("Failed to read last sync state from {:?}", store.path()))?;
    info!("Last successful sync: {}", last_sync);

    let path = permit.port().to_string();
    let raw = tokio::task::spawn_blocking(move || {
        let mut receiver = Receiver::new(SerialTransport::new(path, SerialConfig::default()));
        receiver.sync(Utc::now())
    })
    .await
    .context("Sync worker did not complete")?
    .with_context(|| format!("Failed to sync receiver on {}", port))?;

    let data = adapt(&raw);
    info!(
        "Adapted {} glucose reads, {} insulin injections, {} food events, {} exercise sessions",
        data.glucose_reads.len(),
        data.insulin_injections.len(),
        data.food_events.len(),
        data.exercise_sessions.len()
    );

    let exporter = JsonExporter::new(&args.output_dir);
    let written = exporter.export(&data).context("Failed to export sync data")?;
    info!("Wrote {:?}", written);

    store
        .store(data.as_of)
        .with_context(|| format!("Failed to record sync state in {:?}", store.path()))?;
    drop(permit);
    Ok(())
}

async fn run_watch(args: &SyncArgs, coordinator: &SyncCoordinator, interval_secs: u64) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    info!("Watching for a receiver every {}s, press Ctrl-C to stop", interval_secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_sync(args, coordinator).await {
                    warn!("Sync attempt failed: {:#}", e);
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}
