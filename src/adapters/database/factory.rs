//! Store factory
//!
//! Builds the entity store and import ledger for the configured
//! `database_target`. Both handles share one underlying client so they share
//! one connection pool.

use crate::adapters::database::traits::{ImportLedger, IntakeStore};
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DatabaseTarget, IntakeConfig};
use crate::domain::{IntakeError, Result};
use std::sync::Arc;

/// Store and ledger handles over the same backend
pub type StoreHandles = (Arc<dyn IntakeStore>, Arc<dyn ImportLedger>);

/// Create the entity store and import ledger from configuration
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the pool cannot
/// be built. No connection is attempted here.
pub async fn create_store_and_ledger(config: &IntakeConfig) -> Result<StoreHandles> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                IntakeError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL store and import ledger");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let adapter = Arc::new(PostgreSQLAdapter::new(client));

            Ok((
                adapter.clone() as Arc<dyn IntakeStore>,
                adapter as Arc<dyn ImportLedger>,
            ))
        }
        DatabaseTarget::Memory => {
            tracing::warn!("Using in-memory store: nothing is persisted across restarts");
            let store = MemoryStore::new();

            Ok((
                Arc::new(store.clone()) as Arc<dyn IntakeStore>,
                Arc::new(store) as Arc<dyn ImportLedger>,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FoldersConfig;
    use std::path::PathBuf;

    fn memory_config() -> IntakeConfig {
        IntakeConfig {
            application: Default::default(),
            folders: FoldersConfig {
                inpatient: PathBuf::from("/in/inpatient"),
                outpatient: PathBuf::from("/in/outpatient"),
                lab: None,
                error: PathBuf::from("/out/error"),
                archive: PathBuf::from("/out/archive"),
            },
            receipt: Default::default(),
            schedule: Default::default(),
            database_target: DatabaseTarget::Memory,
            postgresql: None,
            health: Default::default(),
            logging: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_memory_handles_share_state() {
        let (store, ledger) = create_store_and_ledger(&memory_config()).await.unwrap();
        store.test_connection().await.unwrap();

        let mut session = store.begin().await.unwrap();
        session
            .insert_import_error(&crate::domain::NewImportError {
                import_id: crate::domain::ImportId::new(),
                code: crate::domain::ErrorCode::ParseError,
                message: "bad date".to_string(),
                row_number: 3,
                raw: Default::default(),
            })
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert!(ledger.recent_imports(5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_postgresql_without_section_is_configuration_error() {
        let mut config = memory_config();
        config.database_target = DatabaseTarget::PostgreSQL;
        assert!(matches!(
            create_store_and_ledger(&config).await,
            Err(IntakeError::Configuration(_))
        ));
    }
}
