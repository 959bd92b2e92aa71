//! taskpool - command line driver for the task engine.

use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskpool::samples::{process_order_task, process_refund_task};
use taskpool::{BackgroundWorker, Config, TaskHandle, TaskManager, TaskStats};

/// Bounded in-process task runner
#[derive(Parser)]
#[command(name = "taskpool", version, about = "Run sample workloads on the taskpool engine")]
struct Cli {
    /// Number of worker threads (overrides TASKPOOL_MAX_WORKERS)
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    /// Admission queue capacity (overrides TASKPOOL_QUEUE_SIZE)
    #[arg(long, global = true)]
    queue_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Stats output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a batch of sample tasks to a task manager and report stats
    Run {
        /// Workload to run (product/order); runs everything when omitted
        #[arg(short = 't', long = "type")]
        worker_type: Option<String>,
    },

    /// Run the background worker with the recurring sample producer
    Serve {
        /// Seconds to keep the worker running before stopping it
        #[arg(long, default_value = "60")]
        run_for: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "taskpool=debug" } else { "taskpool=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("invalid TASKPOOL_* environment")?;
    if let Some(n) = cli.max_workers {
        config.max_workers = n;
    }
    if let Some(n) = cli.queue_size {
        config.queue_size = n;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;

    match &cli.command {
        Command::Run { worker_type } => run_batch(&config, worker_type.as_deref(), cli.format),
        Command::Serve { run_for } => serve(config, Duration::from_secs(*run_for), cli.format),
    }
}

fn run_batch(config: &Config, worker_type: Option<&str>, format: OutputFormat) -> Result<()> {
    let manager = TaskManager::with_config(config)?;

    let tasks = match worker_type.map(str::to_lowercase).as_deref() {
        Some("product") => (1..=5)
            .map(|i| process_order_task(&format!("product-{i}")))
            .collect::<Vec<_>>(),
        Some("order") => (1..=3)
            .map(|i| process_order_task(&format!("order-{i}")))
            .collect(),
        None | Some("") => (1..=3)
            .flat_map(|i| {
                [
                    process_order_task(&format!("all-{i}")),
                    process_refund_task(&format!("refund-{i}")),
                ]
            })
            .collect(),
        Some(other) => bail!("invalid worker type {other:?}, expected one of: product, order"),
    };

    info!(count = tasks.len(), "submitting tasks");

    let handles: Vec<TaskHandle> = tasks
        .into_iter()
        .filter_map(|task| {
            let id = task.id().to_string();
            match manager.submit_async(task) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(task_id = %id, error = %e, "submit failed");
                    None
                }
            }
        })
        .collect();

    for handle in handles {
        let id = handle.id().to_string();
        if let Err(e) = handle.wait() {
            warn!(task_id = %id, error = %e, "task did not succeed");
        }
    }

    manager.shutdown_and_wait();
    print_stats(&manager.get_all_stats(), format)
}

fn serve(config: Config, run_for: Duration, format: OutputFormat) -> Result<()> {
    let worker = BackgroundWorker::with_config(config)?;
    worker.start()?;
    worker.submit_sample_tasks()?;

    info!(seconds = run_for.as_secs(), "background worker running");
    thread::sleep(run_for);

    worker.stop();
    print_stats(&worker.manager().get_all_stats(), format)
}

fn print_stats(stats: &HashMap<String, TaskStats>, format: OutputFormat) -> Result<()> {
    let ordered: BTreeMap<&String, &TaskStats> = stats.iter().collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ordered)?);
        }
        OutputFormat::Text => {
            println!("\nTask stats:");
            for (id, stat) in ordered {
                let last = stat
                    .last_execution
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {id}: total={} success={} errors={} last={last}",
                    stat.total_executions, stat.success_count, stat.error_count
                );
            }
        }
    }

    Ok(())
}
