//! Configuration management.
//!
//! TOML configuration with `${VAR}` substitution, `INTAKE_*` environment
//! overrides and validation on load. The loaded [`IntakeConfig`] is built
//! once at process entry and handed to every component that needs it.
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "postgresql"
//!
//! [folders]
//! inpatient = "/data/emr/inpatient"
//! outpatient = "/data/emr/outpatient"
//! error = "/data/emr/error"
//! archive = "/data/emr/archive"
//!
//! [receipt]
//! mode = "done_signal"
//!
//! [schedule]
//! times = ["10:00", "13:10", "17:00"]
//!
//! [postgresql]
//! connection_string = "${INTAKE_DATABASE_URL}"
//!
//! [health]
//! alert_webhook_url = "${INTAKE_ALERT_WEBHOOK_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseTarget, FoldersConfig, HealthConfig, IntakeConfig, LoggingConfig,
    PostgreSQLConfig, ReceiptConfig, ScheduleConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
