//! Rejected-row persistence

use crate::adapters::database::IntakeSession;
use crate::domain::{ImportId, NewImportError, Result, RowError};

/// Writes one ImportError per rejected row, returning how many were written
pub async fn persist_errors(
    session: &mut dyn IntakeSession,
    import_id: ImportId,
    errors: &[RowError],
) -> Result<usize> {
    for error in errors {
        session
            .insert_import_error(&NewImportError {
                import_id,
                code: error.code,
                message: error.message(),
                row_number: error.row_number,
                raw: error.raw.clone(),
            })
            .await?;
    }

    if !errors.is_empty() {
        tracing::info!(
            import_id = %import_id,
            count = errors.len(),
            "Import errors recorded"
        );
    }
    Ok(errors.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::IntakeStore;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{ErrorCode, RawRow};
    use serde_json::json;

    #[tokio::test]
    async fn test_errors_keep_code_message_and_raw_payload() {
        let store = MemoryStore::new();
        let import_id = ImportId::new();
        let mut raw = RawRow::new();
        raw.insert("dob".to_string(), json!("not a date"));
        raw.insert("emrPatientId".to_string(), json!(10023));

        let errors = vec![RowError {
            row_number: 7,
            code: ErrorCode::ParseError,
            messages: vec!["dob is not a valid date: 'not a date'".to_string(), "sex is required".to_string()],
            raw,
        }];

        let mut session = store.begin().await.unwrap();
        assert_eq!(persist_errors(session.as_mut(), import_id, &errors).await.unwrap(), 1);
        session.commit().await.unwrap();

        let stored = &store.snapshot().unwrap().import_errors[0];
        assert_eq!(stored.import_id, import_id);
        assert_eq!(stored.row_number, 7);
        assert_eq!(stored.error_code, ErrorCode::ParseError);
        assert_eq!(
            stored.message,
            "dob is not a valid date: 'not a date'; sex is required"
        );
        assert_eq!(stored.raw_row_json, json!({"dob": "not a date", "emrPatientId": 10023}));
    }
}
