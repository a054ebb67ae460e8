//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for emr-intake using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// EMR spreadsheet intake pipeline
#[derive(Parser, Debug)]
#[command(name = "emr-intake")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "emr-intake.toml", env = "INTAKE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "INTAKE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler daemon (or a single cycle with --once)
    Run(commands::run::RunArgs),

    /// Show recent imports from the ledger
    Status(commands::status::StatusArgs),

    /// Check batch health and send alerts
    Health(commands::health::HealthArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["emr-intake", "run"]);
        assert_eq!(cli.config, "emr-intake.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_run_now() {
        let cli = Cli::parse_from(["emr-intake", "run", "--run-now"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.run_now);
        assert!(!args.once);
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["emr-intake", "--config", "custom.toml", "run", "--once"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["emr-intake", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_status_filters() {
        let cli = Cli::parse_from(["emr-intake", "status", "--limit", "5", "--status", "FAIL"]);
        let Commands::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.limit, 5);
        assert_eq!(args.status.as_deref(), Some("FAIL"));
    }

    #[test]
    fn test_cli_parse_health_watch() {
        let cli = Cli::parse_from(["emr-intake", "health", "--watch"]);
        assert!(matches!(cli.command, Commands::Health(args) if args.watch));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["emr-intake", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["emr-intake", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
