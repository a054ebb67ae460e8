//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the emr-intake configuration file.

use crate::adapters::postgresql::client::redact_connection_string;
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Inpatient Folder: {}", config.folders.inpatient.display());
        println!("  Outpatient Folder: {}", config.folders.outpatient.display());
        if let Some(ref lab) = config.folders.lab {
            println!("  Lab Folder: {} (not processed)", lab.display());
        }
        println!("  Error Folder: {}", config.folders.error.display());
        println!("  Archive Folder: {}", config.folders.archive.display());
        println!("  Receipt Mode: {}", config.receipt.mode);
        println!("  Schedule: {}", config.schedule.times.join(", "));

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Database Target: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(pg_config.connection_string.expose_secret())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                    println!("  SSL Mode: {}", pg_config.ssl_mode);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Database Target: memory (nothing is persisted)");
            }
        }

        println!(
            "  Alert Webhook: {}",
            if config.health.alert_webhook_url.is_some() {
                "configured"
            } else {
                "not configured"
            }
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let code = ValidateArgs {}
            .execute("/nonexistent/emr-intake.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
