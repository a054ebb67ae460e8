//! Outpatient reconciliation
//!
//! Appointments can also be edited inside the hospital system. An edit made
//! there (`source = INTERNAL`) is authoritative: a later EMR row that
//! disagrees raises the conflict flag instead of overwriting it.
//!
//! Each row runs under its own savepoint so a failing row is undone, counted
//! as skipped and the file carries on.

use crate::adapters::database::IntakeSession;
use crate::core::ledger::UpsertStats;
use crate::domain::{
    AppointmentFields, NewPatient, OutpatientRecord, RecordSource, Result, ValidRow,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowResult {
    Created,
    Updated,
    Conflict,
    Skipped,
}

/// Upserts valid appointment rows
///
/// Row failures are isolated; only a failure to manage the savepoints
/// themselves is returned.
pub async fn upsert_appointments(
    session: &mut dyn IntakeSession,
    rows: &[ValidRow<OutpatientRecord>],
) -> Result<UpsertStats> {
    let mut stats = UpsertStats::default();

    for row in rows {
        session.savepoint().await?;
        let result = match upsert_one(session, &row.record).await {
            Ok(result) => {
                session.release_savepoint().await?;
                result
            }
            Err(e) => {
                tracing::warn!(row = row.row_number, error = %e, "Appointment upsert failed");
                session.rollback_to_savepoint().await?;
                RowResult::Skipped
            }
        };

        match result {
            RowResult::Created => stats.created += 1,
            RowResult::Updated => stats.updated += 1,
            RowResult::Conflict => stats.conflicts += 1,
            RowResult::Skipped => stats.skipped += 1,
        }
    }

    tracing::info!(
        created = stats.created,
        updated = stats.updated,
        conflicts = stats.conflicts,
        skipped = stats.skipped,
        "Appointment upsert complete"
    );
    Ok(stats)
}

async fn upsert_one(
    session: &mut dyn IntakeSession,
    record: &OutpatientRecord,
) -> Result<RowResult> {
    let patient_id = match session.find_patient(&record.emr_patient_id).await? {
        Some(patient) => patient.id,
        None => {
            session
                .insert_patient(&NewPatient::stub(
                    &record.emr_patient_id,
                    &record.patient_name,
                ))
                .await?
        }
    };

    let Some(doctor_id) = resolve_doctor(session, record).await? else {
        tracing::warn!(
            emr_patient_id = %record.emr_patient_id,
            "Doctor could not be resolved, skipping appointment"
        );
        return Ok(RowResult::Skipped);
    };

    let clinic_room_id = match &record.clinic_room_name {
        Some(name) => session.find_clinic_room(name).await?.map(|room| room.id),
        None => None,
    };

    let fields = AppointmentFields {
        patient_id,
        doctor_id: Some(doctor_id),
        clinic_room_id,
        start_at: record.start_at(),
        end_at: record.end_at(),
        status: record.status,
        notes: record.notes.clone(),
    };

    let existing = match &record.emr_appointment_id {
        Some(emr_id) => session.find_appointment(emr_id).await?,
        None => None,
    };

    let Some(existing) = existing else {
        session
            .insert_appointment(record.emr_appointment_id.as_deref(), &fields)
            .await?;
        return Ok(RowResult::Created);
    };

    if !existing.differs_from(&fields) {
        return Ok(RowResult::Skipped);
    }

    if existing.source == RecordSource::Internal {
        tracing::info!(
            emr_appointment_id = ?record.emr_appointment_id,
            "Internal edit disagrees with EMR, flagging conflict"
        );
        session.flag_appointment_conflict(existing.id).await?;
        Ok(RowResult::Conflict)
    } else {
        session.overwrite_appointment(existing.id, &fields).await?;
        Ok(RowResult::Updated)
    }
}

/// Doctor by EMR id, then by name, creating one when only a name is known
async fn resolve_doctor(
    session: &mut dyn IntakeSession,
    record: &OutpatientRecord,
) -> Result<Option<Uuid>> {
    if let Some(emr_doctor_id) = &record.emr_doctor_id {
        if let Some(doctor) = session.find_doctor_by_emr_id(emr_doctor_id).await? {
            return Ok(Some(doctor.id));
        }
    }

    let Some(name) = &record.doctor_name else {
        return Ok(None);
    };

    if let Some(doctor) = session.find_doctor_by_name(name).await? {
        return Ok(Some(doctor.id));
    }

    let id = session
        .insert_doctor(name, record.emr_doctor_id.as_deref())
        .await?;
    Ok(Some(id))
}
