//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, IntakeConfig};
use super::secret::secret_string;
use crate::domain::errors::IntakeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into IntakeConfig
/// 4. Applies environment variable overrides (INTAKE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if a referenced
/// environment variable is unset, or if validation fails.
///
/// # Examples
///
/// ```no_run
/// use emr_intake::config::loader::load_config;
///
/// let config = load_config("emr-intake.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<IntakeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(IntakeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        IntakeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: IntakeConfig = toml::from_str(&contents)
        .map_err(|e| IntakeError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        IntakeError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| IntakeError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(IntakeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Applies environment variable overrides using INTAKE_* prefix
///
/// Environment variables follow the pattern: INTAKE_<SECTION>_<KEY>
/// For example: INTAKE_FOLDERS_INPATIENT, INTAKE_RECEIPT_MODE
fn apply_env_overrides(config: &mut IntakeConfig) -> Result<()> {
    if let Ok(val) = std::env::var("INTAKE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Folders
    if let Ok(val) = std::env::var("INTAKE_FOLDERS_INPATIENT") {
        config.folders.inpatient = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("INTAKE_FOLDERS_OUTPATIENT") {
        config.folders.outpatient = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("INTAKE_FOLDERS_LAB") {
        config.folders.lab = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("INTAKE_FOLDERS_ERROR") {
        config.folders.error = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("INTAKE_FOLDERS_ARCHIVE") {
        config.folders.archive = PathBuf::from(val);
    }

    // Receipt
    if let Ok(val) = std::env::var("INTAKE_RECEIPT_MODE") {
        config.receipt.mode = val;
    }
    if let Some(secs) = env_parse("INTAKE_RECEIPT_STABLE_WAIT_SECONDS") {
        config.receipt.stable_wait_seconds = secs;
    }

    // Schedule
    if let Ok(val) = std::env::var("INTAKE_SCHEDULE_TIMES") {
        config.schedule.times = val
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if let Some(secs) = env_parse("INTAKE_SCHEDULE_POLL_INTERVAL_SECONDS") {
        config.schedule.poll_interval_seconds = secs;
    }

    // Database target
    if let Ok(val) = std::env::var("INTAKE_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "postgresql" => DatabaseTarget::PostgreSQL,
            "memory" => DatabaseTarget::Memory,
            other => {
                return Err(IntakeError::Configuration(format!(
                    "Invalid INTAKE_DATABASE_TARGET '{other}'. Must be one of: postgresql, memory"
                )))
            }
        };
    }

    // PostgreSQL (only if configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("INTAKE_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(n) = env_parse("INTAKE_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = n;
        }
        if let Some(secs) = env_parse("INTAKE_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            pg.statement_timeout_seconds = secs;
        }
        if let Ok(val) = std::env::var("INTAKE_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Health
    if let Ok(val) = std::env::var("INTAKE_HEALTH_ALERT_WEBHOOK_URL") {
        config.health.alert_webhook_url = Some(secret_string(val));
    }
    if let Some(mins) = env_parse("INTAKE_HEALTH_INTERVAL_MINUTES") {
        config.health.interval_minutes = mins;
    }
    if let Some(hours) = env_parse("INTAKE_HEALTH_MAX_GAP_HOURS") {
        config.health.max_gap_hours = hours;
    }

    // Logging
    if let Ok(val) = std::env::var("INTAKE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("INTAKE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
