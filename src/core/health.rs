//! Batch health check
//!
//! Reads the Import ledger and alerts when imports have stalled or failed.
//! Runs independently of the pipeline; it never writes anything.

use crate::adapters::alert::{Alert, AlertSink};
use crate::adapters::database::ImportLedger;
use crate::config::HealthConfig;
use crate::domain::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const STALLED_TITLE: &str = "Batch stalled";
pub const FAILURES_TITLE: &str = "Batch failures";
pub const CHECK_ERROR_TITLE: &str = "Health check error";

/// Result of one health check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub checked_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub gap_hours: Option<f64>,
    pub recent_failures: u64,
    pub alerts: Vec<Alert>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Periodic ledger check
pub struct HealthMonitor {
    ledger: Arc<dyn ImportLedger>,
    alerter: Arc<dyn AlertSink>,
    max_gap: Duration,
    failure_window: Duration,
}

impl HealthMonitor {
    pub fn new(
        ledger: Arc<dyn ImportLedger>,
        alerter: Arc<dyn AlertSink>,
        config: &HealthConfig,
    ) -> Self {
        Self {
            ledger,
            alerter,
            max_gap: Duration::hours(config.max_gap_hours as i64),
            failure_window: Duration::hours(config.failure_window_hours as i64),
        }
    }

    /// Runs one check as of `now`, sending any alerts it raises
    ///
    /// A ledger error becomes a "health check error" alert rather than an
    /// `Err`; alert delivery failures are logged.
    pub async fn check(&self, now: DateTime<Utc>) -> HealthReport {
        let mut report = HealthReport {
            checked_at: now,
            last_success_at: None,
            gap_hours: None,
            recent_failures: 0,
            alerts: Vec::new(),
        };

        match self.read_ledger(now).await {
            Ok((last_success, failures)) => {
                report.last_success_at = last_success;
                report.recent_failures = failures;
                self.evaluate(now, &mut report);
            }
            Err(e) => {
                tracing::error!(error = %e, "Health check failed");
                report.alerts.push(Alert::new(
                    CHECK_ERROR_TITLE,
                    format!("Batch health check could not run: {e}"),
                ));
            }
        }

        for alert in &report.alerts {
            if let Err(e) = self.alerter.send(alert).await {
                tracing::error!(title = %alert.title, error = %e, "Alert delivery failed");
            }
        }

        report
    }

    async fn read_ledger(&self, now: DateTime<Utc>) -> Result<(Option<DateTime<Utc>>, u64)> {
        let last_success = self.ledger.last_success_at().await?;
        let failures = self
            .ledger
            .count_failures_since(now - self.failure_window)
            .await?;
        Ok((last_success, failures))
    }

    fn evaluate(&self, now: DateTime<Utc>, report: &mut HealthReport) {
        match report.last_success_at {
            None => tracing::info!("No successful import recorded yet"),
            Some(last) => {
                let gap = now - last;
                let gap_hours = gap.num_seconds() as f64 / 3600.0;
                report.gap_hours = Some(gap_hours);

                if gap > self.max_gap {
                    report.alerts.push(Alert::new(
                        STALLED_TITLE,
                        format!(
                            "No import has succeeded for {gap_hours:.1} hours. Last success: {}",
                            last.format("%Y-%m-%d %H:%M")
                        ),
                    ));
                } else {
                    tracing::info!(
                        last_success = %last.format("%Y-%m-%d %H:%M"),
                        gap_hours = format!("{gap_hours:.1}"),
                        "Batch healthy"
                    );
                }
            }
        }

        if report.recent_failures > 0 {
            report.alerts.push(Alert::new(
                FAILURES_TITLE,
                format!(
                    "{} import(s) failed in the last {} hours",
                    report.recent_failures,
                    self.failure_window.num_hours()
                ),
            ));
        }
    }
}
