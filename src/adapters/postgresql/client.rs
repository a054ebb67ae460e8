//! PostgreSQL client implementation
//!
//! Owns the connection pool and the schema migration. Transactions are opened
//! by the adapter on pooled connections handed out here.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{IntakeError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

/// How the pool negotiates TLS for a configured `ssl_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Plain TCP
    Disabled,
    /// TLS when the server offers it, plaintext otherwise
    Opportunistic,
    /// TLS required, certificate not checked
    RequireUnverified,
    /// TLS required, chain checked but not the host name
    VerifyCa,
    /// TLS required, chain and host name checked
    VerifyFull,
}

impl TlsPolicy {
    pub fn from_ssl_mode(ssl_mode: &str) -> Self {
        match ssl_mode {
            "disable" => TlsPolicy::Disabled,
            "require" => TlsPolicy::RequireUnverified,
            "verify-ca" => TlsPolicy::VerifyCa,
            "verify-full" => TlsPolicy::VerifyFull,
            _ => TlsPolicy::Opportunistic,
        }
    }

    fn ssl_mode(&self) -> SslMode {
        match self {
            TlsPolicy::Disabled => SslMode::Disable,
            TlsPolicy::Opportunistic => SslMode::Prefer,
            _ => SslMode::Require,
        }
    }

    fn connector(&self) -> Result<Option<MakeTlsConnector>> {
        let mut builder = native_tls::TlsConnector::builder();
        match self {
            TlsPolicy::Disabled | TlsPolicy::Opportunistic => return Ok(None),
            TlsPolicy::RequireUnverified => {
                builder
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }
            TlsPolicy::VerifyCa => {
                builder.danger_accept_invalid_hostnames(true);
            }
            TlsPolicy::VerifyFull => {}
        }
        let connector = builder
            .build()
            .map_err(|e| IntakeError::Connection(format!("Failed to build TLS connector: {e}")))?;
        Ok(Some(MakeTlsConnector::new(connector)))
    }
}

/// PostgreSQL client for the intake pipeline
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool connects lazily; call [`PostgreSQLClient::test_connection`]
    /// to fail fast on a bad address or credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string does not parse or the pool
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config = pg_config(&config)?;
        let policy = TlsPolicy::from_ssl_mode(&config.ssl_mode);

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = match policy.connector()? {
            Some(tls) => Manager::from_config(pg_config, tls, manager_config),
            None => Manager::from_config(pg_config, NoTls, manager_config),
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| IntakeError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| IntakeError::Connection(format!("Connection test failed: {e}")))?;

        tracing::info!(
            target = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Run the schema migration
    ///
    /// Every statement is `IF NOT EXISTS`, so this is safe on every start.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;
        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| IntakeError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| {
            IntakeError::Connection(format!("Failed to get connection from pool: {e}"))
        })
    }

    /// Statement timeout set on every pooled connection, in milliseconds
    pub fn statement_timeout_ms(&self) -> u64 {
        self.config.statement_timeout_seconds * 1000
    }

    /// Connection string with credentials removed
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret())
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// Driver configuration for a pool connection
///
/// The statement timeout travels as a startup option, so it covers ledger
/// statements outside a transaction as well as the import transactions.
/// Options already present in the connection string are kept.
///
/// # Errors
///
/// Returns a configuration error if the connection string does not parse.
pub fn pg_config(config: &PostgreSQLConfig) -> Result<tokio_postgres::Config> {
    let mut pg_config: tokio_postgres::Config = config
        .connection_string
        .expose_secret()
        .parse()
        .map_err(|e| {
            IntakeError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;

    let policy = TlsPolicy::from_ssl_mode(&config.ssl_mode);
    pg_config.ssl_mode(policy.ssl_mode());
    pg_config.connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

    let timeout = format!(
        "-c statement_timeout={}",
        config.statement_timeout_seconds * 1000
    );
    let options = match pg_config.get_options() {
        Some(existing) if !existing.trim().is_empty() => format!("{existing} {timeout}"),
        _ => timeout,
    };
    pg_config.options(&options);

    Ok(pg_config)
}

/// Replaces everything before the host with `***`
pub fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
