//! Time-of-day scheduling
//!
//! The daemon wakes every poll interval and asks [`TriggerSchedule::due`]
//! whether a configured trigger time has passed since the last check. Cycles
//! run to completion on the calling task; nothing runs in parallel.

use crate::config::ScheduleConfig;
use crate::core::pipeline::coordinator::IntakeCoordinator;
use crate::core::pipeline::summary::RunSummary;
use crate::domain::{IntakeError, Result};
use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tokio::sync::watch;

/// Daily trigger times and the instant they were last checked
#[derive(Debug, Clone)]
pub struct TriggerSchedule {
    times: Vec<NaiveTime>,
    last_checked: NaiveDateTime,
}

impl TriggerSchedule {
    /// Creates a schedule; triggers at or before `now` are not due
    pub fn new(mut times: Vec<NaiveTime>, now: NaiveDateTime) -> Self {
        times.sort();
        times.dedup();
        Self {
            times,
            last_checked: now,
        }
    }

    pub fn from_config(config: &ScheduleConfig, now: NaiveDateTime) -> Result<Self> {
        let times = config.trigger_times().map_err(IntakeError::Configuration)?;
        Ok(Self::new(times, now))
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// True when at least one trigger fell in `(last check, now]`
    ///
    /// Several triggers passed during one long cycle collapse into a single
    /// due answer. A clock that moved backwards resets the window.
    pub fn due(&mut self, now: NaiveDateTime) -> bool {
        if now <= self.last_checked {
            self.last_checked = now;
            return false;
        }

        let since = self.last_checked;
        self.last_checked = now;

        let mut day = since.date();
        while day <= now.date() {
            if self
                .times
                .iter()
                .map(|t| day.and_time(*t))
                .any(|at| at > since && at <= now)
            {
                return true;
            }
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        false
    }

    /// The first trigger strictly after `now`
    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        let tomorrow = today.checked_add_days(Days::new(1))?;
        self.times
            .iter()
            .map(|t| today.and_time(*t))
            .find(|at| *at > now)
            .or_else(|| self.times.first().map(|t| tomorrow.and_time(*t)))
    }
}

/// Runs the scheduler loop until `shutdown` flips to true
///
/// With `run_now` a cycle runs before the first wait. Returns the
/// accumulated summary of every cycle that ran.
pub async fn run_daemon(
    coordinator: &IntakeCoordinator,
    mut schedule: TriggerSchedule,
    poll_interval: Duration,
    run_now: bool,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let mut total = RunSummary::new();

    if run_now {
        tracing::info!("Running intake cycle immediately");
        total.merge(&coordinator.run_cycle().await);
    }

    if let Some(next) = schedule.next_after(Local::now().naive_local()) {
        tracing::info!(next_run = %next, "Scheduler waiting");
    }

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }

        let now = Local::now().naive_local();
        if schedule.due(now) {
            tracing::info!(at = %now, "Scheduled trigger due");
            total.merge(&coordinator.run_cycle().await);
            if let Some(next) = schedule.next_after(Local::now().naive_local()) {
                tracing::info!(next_run = %next, "Scheduler waiting");
            }
        }
    }

    tracing::info!("Scheduler stopped");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn schedule(now: NaiveDateTime) -> TriggerSchedule {
        TriggerSchedule::new(vec![t(17, 0), t(10, 0), t(13, 10)], now)
    }

    #[test]
    fn test_trigger_fires_once() {
        let mut s = schedule(at(1, 9, 59));
        assert!(!s.due(at(1, 9, 59)));
        assert!(s.due(at(1, 10, 0)));
        assert!(!s.due(at(1, 10, 0)));
        assert!(!s.due(at(1, 10, 1)));
    }

    #[test]
    fn test_startup_after_trigger_does_not_fire() {
        let mut s = schedule(at(1, 10, 5));
        assert!(!s.due(at(1, 10, 6)));
        assert!(s.due(at(1, 13, 10)));
    }

    #[test]
    fn test_missed_triggers_collapse_into_one() {
        let mut s = schedule(at(1, 9, 0));
        // A cycle ran from 09:00 until 18:00, spanning three triggers
        assert!(s.due(at(1, 18, 0)));
        assert!(!s.due(at(1, 18, 1)));
    }

    #[test]
    fn test_trigger_across_midnight() {
        let mut s = schedule(at(1, 23, 59));
        assert!(!s.due(at(2, 0, 1)));
        assert!(s.due(at(2, 10, 0)));
    }

    #[test]
    fn test_clock_going_backwards_is_not_due() {
        let mut s = schedule(at(1, 12, 0));
        assert!(!s.due(at(1, 9, 0)));
        assert!(s.due(at(1, 10, 0)));
    }

    #[test]
    fn test_next_after() {
        let s = schedule(at(1, 0, 0));
        assert_eq!(s.next_after(at(1, 11, 0)), Some(at(1, 13, 10)));
        assert_eq!(s.next_after(at(1, 17, 0)), Some(at(2, 10, 0)));
        assert_eq!(s.times().len(), 3);
    }

    #[test]
    fn test_from_config_rejects_bad_time() {
        let config = ScheduleConfig {
            times: vec!["7pm".to_string()],
            poll_interval_seconds: 30,
        };
        assert!(matches!(
            TriggerSchedule::from_config(&config, at(1, 0, 0)),
            Err(IntakeError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_daemon_stops_on_shutdown() {
        use crate::adapters::memory::MemoryStore;
        use crate::config::{
            ApplicationConfig, DatabaseTarget, FoldersConfig, HealthConfig, IntakeConfig,
            LoggingConfig, ReceiptConfig,
        };
        use std::sync::Arc;

        let root = tempfile::TempDir::new().unwrap();
        let config = IntakeConfig {
            application: ApplicationConfig::default(),
            folders: FoldersConfig {
                inpatient: root.path().join("inpatient"),
                outpatient: root.path().join("outpatient"),
                lab: None,
                error: root.path().join("error"),
                archive: root.path().join("archive"),
            },
            receipt: ReceiptConfig::default(),
            schedule: ScheduleConfig::default(),
            database_target: DatabaseTarget::Memory,
            postgresql: None,
            health: HealthConfig::default(),
            logging: LoggingConfig::default(),
        };
        let store = MemoryStore::new();
        let coordinator =
            IntakeCoordinator::new(&config, Arc::new(store.clone()), Arc::new(store));

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let summary = run_daemon(
            &coordinator,
            schedule(at(1, 0, 0)),
            Duration::from_secs(3600),
            true,
            rx,
        )
        .await;
        assert_eq!(summary.files_seen, 0);
    }
}
