//! Health command implementation
//!
//! This module implements the `health` command: one ledger health check, or
//! a check every `health.interval_minutes` with `--watch`.

use crate::adapters::alert::WebhookAlerter;
use crate::adapters::database::create_store_and_ledger;
use crate::config::load_config;
use crate::core::health::{HealthMonitor, HealthReport};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the health command
#[derive(Args, Debug, Default)]
pub struct HealthArgs {
    /// Keep checking every configured interval until interrupted
    #[arg(long)]
    pub watch: bool,
}

impl HealthArgs {
    /// Execute the health command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Running batch health check");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let alerter = match WebhookAlerter::from_config(&config.health) {
            Ok(a) => a,
            Err(e) => {
                println!("❌ Failed to set up alerting");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        if !alerter.is_configured() {
            tracing::warn!("No alert webhook configured, alerts will only be logged");
        }

        let (_, ledger) = match create_store_and_ledger(&config).await {
            Ok(handles) => handles,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let monitor = HealthMonitor::new(ledger, Arc::new(alerter), &config.health);

        if !self.watch {
            let report = monitor.check(Utc::now()).await;
            print_report(&report);
            return Ok(if report.is_healthy() { 0 } else { 1 });
        }

        let interval = Duration::from_secs(config.health.interval_minutes * 60);
        tracing::info!(
            interval_minutes = config.health.interval_minutes,
            "Health watch started"
        );

        loop {
            let report = monitor.check(Utc::now()).await;
            print_report(&report);

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown_signal.changed() => {
                    if changed.is_err() || *shutdown_signal.borrow() {
                        tracing::info!("Health watch stopped");
                        return Ok(130);
                    }
                }
            }
        }
    }
}

fn print_report(report: &HealthReport) {
    let last_success = report
        .last_success_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    if report.is_healthy() {
        println!("✅ Batch healthy");
    } else {
        println!("⚠️  Batch unhealthy");
    }
    println!("  Last Success: {last_success}");
    if let Some(gap) = report.gap_hours {
        println!("  Hours Since Success: {gap:.1}");
    }
    println!("  Recent Failures: {}", report.recent_failures);
    for alert in &report.alerts {
        println!("  - {}: {}", alert.title, alert.message);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_is_config_error() {
        let (_tx, rx) = watch::channel(false);
        let code = HealthArgs::default()
            .execute("/nonexistent/emr-intake.toml", rx)
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
