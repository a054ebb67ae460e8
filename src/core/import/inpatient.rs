//! Inpatient reconciliation
//!
//! The census is authoritative for who is admitted, but a changed name,
//! date of birth or sex on a known patient is far more often a registration
//! mistake than a real change. Such rows are recorded as identity conflicts
//! for a person to resolve and the stored patient is left as it was.

use crate::adapters::database::IntakeSession;
use crate::core::ledger::UpsertStats;
use crate::domain::{
    IdentitySnapshot, ImportId, InpatientRecord, NewIdentityConflict, NewPatient, Result,
    ValidRow,
};

/// Upserts valid census rows into Patient
///
/// Any storage error aborts the whole batch; the caller rolls the session
/// back.
pub async fn upsert_patients(
    session: &mut dyn IntakeSession,
    import_id: ImportId,
    rows: &[ValidRow<InpatientRecord>],
) -> Result<UpsertStats> {
    let mut stats = UpsertStats::default();

    for row in rows {
        let record = &row.record;
        let incoming = IdentitySnapshot {
            name: record.name.clone(),
            dob: record.dob,
            sex: record.sex.clone(),
        };

        let Some(existing) = session.find_patient(&record.emr_patient_id).await? else {
            session
                .insert_patient(&NewPatient {
                    emr_patient_id: record.emr_patient_id.clone(),
                    name: record.name.clone(),
                    dob: record.dob,
                    sex: record.sex.clone(),
                    phone: record.phone.clone(),
                })
                .await?;
            stats.created += 1;
            tracing::debug!(emr_patient_id = %record.emr_patient_id, "Patient created");
            continue;
        };

        let stored = existing.identity();
        if stored != incoming {
            tracing::warn!(
                emr_patient_id = %record.emr_patient_id,
                row = row.row_number,
                "Identity change detected, recording conflict"
            );
            session
                .insert_identity_conflict(&NewIdentityConflict {
                    import_id,
                    emr_patient_id: record.emr_patient_id.clone(),
                    before: stored,
                    after: incoming,
                })
                .await?;
            stats.conflicts += 1;
            continue;
        }

        match &record.phone {
            Some(phone) if existing.phone.as_ref() != Some(phone) => {
                session.update_patient_phone(existing.id, phone).await?;
                stats.updated += 1;
            }
            _ => stats.skipped += 1,
        }
    }

    tracing::info!(
        created = stats.created,
        updated = stats.updated,
        conflicts = stats.conflicts,
        skipped = stats.skipped,
        "Patient upsert complete"
    );
    Ok(stats)
}
