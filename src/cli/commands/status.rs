//! Status command implementation
//!
//! This module implements the `status` command for displaying recent
//! imports and the rejected rows of one import.

use crate::adapters::database::create_store_and_ledger;
use crate::config::load_config;
use crate::core::ledger::ImportStatus;
use crate::domain::ImportId;
use clap::Args;
use std::str::FromStr;
use uuid::Uuid;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of imports to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Filter by status (PROCESSING, SUCCESS, FAIL)
    #[arg(long)]
    pub status: Option<String>,

    /// Show the rejected rows of one import
    #[arg(long, value_name = "IMPORT_ID")]
    pub errors: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking import status");

        let status = match self.status.as_deref().map(ImportStatus::from_str).transpose() {
            Ok(s) => s,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let (_, ledger) = match create_store_and_ledger(&config).await {
            Ok(handles) => handles,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        if let Some(ref raw_id) = self.errors {
            let import_id = match Uuid::parse_str(raw_id.trim()) {
                Ok(id) => ImportId::from_uuid(id),
                Err(e) => {
                    println!("❌ Invalid import id '{raw_id}': {e}");
                    return Ok(2);
                }
            };
            let errors = match ledger.import_errors(import_id).await {
                Ok(errors) => errors,
                Err(e) => {
                    println!("❌ Failed to load import errors");
                    println!("   Error: {e}");
                    return Ok(5);
                }
            };

            if errors.is_empty() {
                println!("No rejected rows for import {import_id}.");
                return Ok(0);
            }

            println!("{} rejected row(s) for import {import_id}:", errors.len());
            println!();
            println!("{:<6} {:<18} Message", "Row", "Code");
            println!("{}", "-".repeat(100));
            for error in errors {
                println!(
                    "{:<6} {:<18} {}",
                    error.row_number,
                    error.error_code.as_str(),
                    error.message
                );
            }
            println!();
            return Ok(0);
        }

        println!("📊 Import Status");
        println!();

        let imports = match ledger.recent_imports(self.limit, status).await {
            Ok(imports) => imports,
            Err(e) => {
                println!("❌ Failed to load imports");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if imports.is_empty() {
            println!("No import history found.");
            println!("Run 'emr-intake run --once' to process waiting files.");
            return Ok(0);
        }

        println!("Found {} import(s):", imports.len());
        println!();
        println!(
            "{:<38} {:<11} {:<11} {:<20} {:<8} File",
            "Import ID", "Kind", "Status", "Started", "Rows"
        );
        println!("{}", "-".repeat(120));

        for import in imports {
            let rows = import
                .stats_json
                .as_ref()
                .and_then(|s| s.get("totalRows"))
                .and_then(|v| v.as_u64())
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());

            println!(
                "{:<38} {:<11} {:<11} {:<20} {:<8} {}",
                import.id.to_string(),
                import.file_type.as_str(),
                import.status.as_str(),
                import.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                rows,
                import.file_path
            );
        }

        println!();
        Ok(0)
    }
}
