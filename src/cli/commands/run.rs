//! Run command implementation
//!
//! This module implements the `run` command: the scheduler daemon, or a
//! single intake cycle with `--once`.

use crate::config::{load_config, DatabaseTarget};
use crate::core::pipeline::{run_daemon, IntakeCoordinator, RunSummary, TriggerSchedule};
use crate::domain::IntakeError;
use chrono::Local;
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Run a cycle immediately, then keep running on schedule
    #[arg(long)]
    pub run_now: bool,

    /// Run a single cycle and exit with its result
    #[arg(long, conflicts_with = "run_now")]
    pub once: bool,

    /// Use the in-memory store; nothing is persisted
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Dry run mode enabled - using in-memory store");
            println!("DRY RUN MODE - nothing will be written to the database");
            config.database_target = DatabaseTarget::Memory;
        }

        let schedule = match TriggerSchedule::from_config(&config.schedule, Local::now().naive_local())
        {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Invalid schedule: {e}");
                return Ok(2);
            }
        };

        tracing::info!("Creating intake coordinator");
        let coordinator = match IntakeCoordinator::from_config(&config).await {
            Ok(c) => c,
            Err(e @ IntakeError::Configuration(_)) => {
                tracing::error!(error = %e, "Invalid storage configuration");
                eprintln!("Failed to initialize intake: {e}");
                return Ok(2);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create intake coordinator");
                eprintln!("Failed to initialize intake: {e}");
                return Ok(4);
            }
        };

        if self.once {
            let summary = coordinator.run_cycle().await;
            print_summary(&summary);
            return Ok(summary.exit_code());
        }

        tracing::info!(
            times = ?config.schedule.times,
            poll_interval_seconds = config.schedule.poll_interval_seconds,
            "Scheduler started"
        );
        println!("Scheduler started: daily at {}", config.schedule.times.join(", "));

        let summary = run_daemon(
            &coordinator,
            schedule,
            Duration::from_secs(config.schedule.poll_interval_seconds),
            self.run_now,
            shutdown_signal.clone(),
        )
        .await;

        print_summary(&summary);

        if *shutdown_signal.borrow() {
            println!("Scheduler stopped by signal.");
            tracing::info!("Scheduler interrupted by user signal");
            Ok(130)
        } else {
            Ok(summary.exit_code())
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Intake Summary:");
    println!("  Files Seen: {}", summary.files_seen);
    println!("  Not Ready: {}", summary.not_ready);
    println!("  Rejected: {}", summary.rejected);
    println!("  Duplicates: {}", summary.duplicates);
    println!("  Imported: {}", summary.imported);
    println!("  Failed: {}", summary.failed);
    println!(
        "  Rows: {} total, {} rejected",
        summary.total_rows, summary.error_rows
    );
    println!(
        "  Records: {} created, {} updated, {} conflicts, {} skipped",
        summary.upsert.created,
        summary.upsert.updated,
        summary.upsert.conflicts,
        summary.upsert.skipped
    );
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}
