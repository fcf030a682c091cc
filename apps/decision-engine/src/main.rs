//! Decision Engine Binary
//!
//! Runs one decision cycle from a configuration file and a market snapshot.
//!
//! # Usage
//!
//! ```bash
//! decision-engine validate --config config.yaml
//! decision-engine run --config config.yaml --data snapshot.json --date 2025-06-30 [--submit]
//! ```
//!
//! The JSON report goes to stdout, logs to stderr. Any stage failure prints
//! an error report and exits non-zero.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: overrides `observability.logging.level`
//! - Any `${VAR}` referenced by the configuration

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use decision_engine::application::dto::RunPipelineRequest;
use decision_engine::config::{ConfigDocument, load_config};
use decision_engine::error::PipelineError;
use decision_engine::infrastructure::container::{Container, decision_time};
use decision_engine::observability::{init_metrics, init_tracing};

/// Exit code for a stage failure.
const EXIT_PIPELINE_FAILURE: u8 = 1;

/// Exit code for I/O or runtime failures outside the pipeline.
const EXIT_RUNTIME_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "decision-engine",
    version,
    about = "Deterministic signal-to-order decision engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle and print the pipeline report.
    Run {
        /// Path to the YAML configuration.
        #[arg(long)]
        config: PathBuf,

        /// Path to the JSON market snapshot.
        #[arg(long)]
        data: PathBuf,

        /// Decision date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Submit planned orders and monitor them until they complete.
        #[arg(long, default_value_t = false)]
        submit: bool,

        /// Directory for the JSON-lines audit trail. In memory when omitted.
        #[arg(long)]
        audit_dir: Option<PathBuf>,
    },
    /// Validate a configuration and print its hash.
    Validate {
        /// Path to the YAML configuration.
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Serialize)]
struct ValidationReport<'a> {
    strategy_id: &'a str,
    config_hash: &'a str,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            data,
            date,
            submit,
            audit_dir,
        } => run(&config, &data, date, submit, audit_dir.as_deref()).await,
    };

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            let report = err.to_report();
            tracing::error!(code = %report.code, stage = %report.stage, error = %err, "Decision cycle failed");
            if let Err(print_err) = print_json(&report) {
                eprintln!("error: {print_err:#}");
            }
            ExitCode::from(EXIT_PIPELINE_FAILURE)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_RUNTIME_FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}

fn validate(path: &Path) -> Result<Result<(), PipelineError>> {
    let document = match load_config(path) {
        Ok(document) => document,
        Err(err) => return Ok(Err(err.into())),
    };
    print_json(&ValidationReport {
        strategy_id: &document.config.strategy.id,
        config_hash: &document.hash,
    })?;
    Ok(Ok(()))
}

fn load_and_observe(path: &Path) -> Result<Result<ConfigDocument, PipelineError>> {
    let document = match load_config(path) {
        Ok(document) => document,
        Err(err) => return Ok(Err(err.into())),
    };
    let observability = &document.config.observability;
    init_tracing(&observability.logging).context("failed to initialize logging")?;
    init_metrics(&observability.metrics).context("failed to initialize metrics")?;
    Ok(Ok(document))
}

async fn run(
    config: &Path,
    data: &Path,
    date: NaiveDate,
    submit: bool,
    audit_dir: Option<&Path>,
) -> Result<Result<(), PipelineError>> {
    let document = match load_and_observe(config)? {
        Ok(document) => document,
        Err(err) => return Ok(Err(err)),
    };
    let poll_interval = document.config.monitor.poll_interval();

    tracing::info!(
        strategy_id = %document.config.strategy.id,
        config_hash = %document.hash,
        %date,
        submit,
        "Starting decision cycle"
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            shutdown.cancel();
        }
    });

    let container = match Container::build(document, data, audit_dir, date).await {
        Ok(container) => container,
        Err(err) => return Ok(Err(err)),
    };
    let monitor = container.order_monitor();
    let use_case = match container.run_pipeline_use_case() {
        Ok(use_case) => use_case.with_monitor(Arc::clone(&monitor)),
        Err(err) => return Ok(Err(err)),
    };

    let request = RunPipelineRequest {
        decided_at: decision_time(date),
        context: container.portfolio_context(),
        submit,
    };
    let report = match use_case.execute(request, &cancel).await {
        Ok(report) => report,
        Err(err) => return Ok(Err(err)),
    };
    print_json(&report)?;

    if submit && monitor.active_count() > 0 {
        let monitor_cancel = cancel.child_token();
        let handle = Arc::clone(&monitor).spawn(poll_interval, monitor_cancel.clone());
        while monitor.active_count() > 0 && !cancel.is_cancelled() {
            tokio::time::sleep(poll_interval).await;
        }
        monitor_cancel.cancel();
        handle.await.context("order monitor task failed")?;

        let completed = monitor.drain_completed();
        tracing::info!(
            completed = completed.len(),
            still_active = monitor.active_count(),
            "Order monitoring finished"
        );
    }

    Ok(Ok(()))
}
