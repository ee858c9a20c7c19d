//! shard-reconcile CLI - verify a migrated store against its sharded source.

use clap::{Parser, Subcommand};
use shard_reconcile::{
    Config, Coordinator, OutcomeKind, ReconcileError, RunSummary, TableTemplate,
    VerificationRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit code when at least one partition has differences.
const EXIT_DIFFERENCES: u8 = 3;

#[derive(Parser)]
#[command(name = "shard-reconcile")]
#[command(about = "Verify a migrated store against its time-sharded source, partition by partition")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Seconds to wait for running partitions after SIGINT/SIGTERM
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Partition selection shared by `verify` and `plan`.
#[derive(clap::Args, Clone)]
struct Selection {
    /// Partitions to verify: years (2023) or months (2023-04), comma separated
    #[arg(long, value_delimiter = ',')]
    years: Vec<String>,

    /// Source table template, e.g. kline_{year}
    #[arg(long)]
    source_template: Option<String>,

    /// Target table base name; the partition suffix is appended
    #[arg(long)]
    target_table: Option<String>,

    /// Override the target partition suffix (empty for an unpartitioned target)
    #[arg(long)]
    target_suffix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify partitions and report differences
    Verify {
        #[command(flatten)]
        selection: Selection,

        /// Override number of concurrent partitions
        #[arg(long)]
        workers: Option<usize>,

        /// Override source rows per page
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override the number of diff samples kept per partition
        #[arg(long)]
        sample_cap: Option<usize>,
    },

    /// Show the partitions and tables a verify run would check
    Plan {
        #[command(flatten)]
        selection: Selection,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, ReconcileError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(ReconcileError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Plan { ref selection } => {
            let request = build_request(&mut config, selection)?;
            let scopes = request.plan(&config.reconcile.target_partition_suffix)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&scopes)?);
            } else {
                println!("Verification plan ({} partitions):", scopes.len());
                for scope in &scopes {
                    println!(
                        "  {}  {} -> {}",
                        scope.partition, scope.source_table, scope.target_table
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            ref selection,
            workers,
            batch_size,
            sample_cap,
        } => {
            if let Some(w) = workers {
                config.reconcile.workers = Some(w);
            }
            if let Some(b) = batch_size {
                config.reconcile.batch_size = Some(b);
            }
            if let Some(s) = sample_cap {
                config.reconcile.sample_cap = s;
            }
            let request = build_request(&mut config, selection)?;
            config.validate()?;
            let config = config.with_auto_tuning();

            let cancel = setup_signal_handler(cli.shutdown_timeout)?;
            let mut coordinator = Coordinator::new(config)
                .await?
                .with_cancellation(cancel.clone());
            if cli.progress {
                coordinator = coordinator.with_progress(spawn_progress_printer());
            }

            let handle = coordinator.start(&request)?;
            eprintln!(
                "Accepted run {} ({} partitions)",
                handle.run_id(),
                handle.partitions()
            );

            let summary = wait_with_shutdown(handle.wait(), &cancel, cli.shutdown_timeout).await;
            coordinator.close().await;
            let summary = summary?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary);
            }

            Ok(if summary.all_clean() {
                ExitCode::SUCCESS
            } else if summary.has_differences() {
                ExitCode::from(EXIT_DIFFERENCES)
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::HealthCheck => {
            let coordinator = Coordinator::new(config.with_auto_tuning()).await?;
            let result = coordinator.health_check().await;
            coordinator.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source: {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target: {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            Ok(if result.healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Merge command-line selection over the config defaults.
fn build_request(
    config: &mut Config,
    selection: &Selection,
) -> Result<VerificationRequest, ReconcileError> {
    let reconcile = &mut config.reconcile;
    if let Some(ref template) = selection.source_template {
        reconcile.source_template = Some(template.clone());
    }
    if let Some(ref table) = selection.target_table {
        reconcile.target_table = Some(table.clone());
    }
    if let Some(ref suffix) = selection.target_suffix {
        reconcile.target_partition_suffix = TableTemplate::new(suffix.clone());
    }
    if !selection.years.is_empty() {
        reconcile.partitions = selection.years.clone();
    }
    VerificationRequest::from_config(reconcile)
}

/// Wait for the run; after cancellation, give running partitions
/// `shutdown_timeout` seconds to wind down.
async fn wait_with_shutdown(
    wait: impl std::future::Future<Output = Result<RunSummary, ReconcileError>>,
    cancel: &CancellationToken,
    shutdown_timeout: u64,
) -> Result<RunSummary, ReconcileError> {
    tokio::pin!(wait);
    tokio::select! {
        result = &mut wait => result,
        _ = async {
            cancel.cancelled().await;
            tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
        } => {
            warn!("Partitions still running after {}s, giving up", shutdown_timeout);
            Err(ReconcileError::Cancelled)
        }
    }
}

fn spawn_progress_printer() -> mpsc::Sender<shard_reconcile::VerifyProgressUpdate> {
    let (tx, mut rx) = mpsc::channel(256);
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&update) {
                eprintln!("{}", line);
            }
        }
    });
    tx
}

fn print_summary(summary: &RunSummary) {
    println!("\nVerification finished!");
    println!("  Run ID: {}", summary.run_id);
    println!("  Duration: {:.2}s", summary.duration_ms as f64 / 1000.0);
    println!(
        "  Partitions: {} ({} clean, {} count mismatch, {} row diff, {} error)",
        summary.partitions_total,
        summary.clean,
        summary.count_mismatch,
        summary.row_diff,
        summary.errors
    );
    for report in &summary.reports {
        if report.outcome.kind() != OutcomeKind::Clean {
            println!("  {}", report);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format '{}'", other)),
    }
    Ok(())
}

/// Cancel on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, ReconcileError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let token = cancel_token.clone();

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!(
            "\nReceived {}. Stopping verification (timeout: {}s)...",
            name, shutdown_timeout
        );
        token.cancel();
    });

    Ok(cancel_token)
}

/// Cancel on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, ReconcileError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\nReceived Ctrl-C. Stopping verification (timeout: {}s)...",
                shutdown_timeout
            );
            token.cancel();
        }
    });

    Ok(cancel_token)
}
