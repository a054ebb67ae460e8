//! PostgreSQL adapter implementing the storage traits
//!
//! Entity work runs in explicit transactions on one pooled connection
//! ([`PgSession`]); ledger writes run in autocommit on whatever connection
//! the pool hands out.

use crate::adapters::database::traits::{ImportLedger, IntakeSession, IntakeStore};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    appointment_from_row, clinic_room_from_row, doctor_from_row, import_error_from_row,
    import_from_row, patient_from_row,
};
use crate::core::ledger::{ImportRecord, ImportStatus, NewImport};
use crate::domain::entities::{CONFLICT_OPEN, PATIENT_ACTIVE};
use crate::domain::{
    Appointment, AppointmentFields, ClinicRoom, Doctor, FileHash, ImportErrorRecord, ImportId,
    IntakeError, NewIdentityConflict, NewImportError, NewPatient, Patient, RecordSource, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Object;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// PostgreSQL implementation of [`IntakeStore`] and [`ImportLedger`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl IntakeStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn begin(&self) -> Result<Box<dyn IntakeSession>> {
        let conn = self.client.get_connection().await?;
        conn.batch_execute("BEGIN").await?;
        Ok(Box::new(PgSession {
            conn: Some(conn),
            depth: 0,
        }))
    }
}

/// One open transaction on a pooled connection
///
/// Dropping an uncommitted session detaches the connection from the pool and
/// closes it, which makes the server roll the transaction back.
pub struct PgSession {
    conn: Option<Object>,
    depth: usize,
}

impl PgSession {
    fn conn(&self) -> Result<&Object> {
        self.conn
            .as_ref()
            .ok_or_else(|| IntakeError::Database("transaction already finished".to_string()))
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> Result<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| IntakeError::Database("transaction already finished".to_string()))?;
        conn.batch_execute(statement).await?;
        Ok(())
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped without commit, discarding connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl IntakeSession for PgSession {
    async fn find_patient(&mut self, emr_patient_id: &str) -> Result<Option<Patient>> {
        let row = self
            .conn()?
            .query_opt(
                r#"SELECT "id", "emrPatientId", "name", "dob", "sex", "phone", "status", "deletedAt"
                   FROM "Patient"
                   WHERE "emrPatientId" = $1 AND "deletedAt" IS NULL"#,
                &[&emr_patient_id],
            )
            .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                r#"INSERT INTO "Patient"
                   ("id", "emrPatientId", "name", "dob", "sex", "phone", "status", "createdAt", "updatedAt")
                   VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())"#,
                &[
                    &id,
                    &patient.emr_patient_id,
                    &patient.name,
                    &patient.dob,
                    &patient.sex,
                    &patient.phone,
                    &PATIENT_ACTIVE,
                ],
            )
            .await?;
        Ok(id)
    }

    async fn update_patient_phone(&mut self, patient_id: Uuid, phone: &str) -> Result<()> {
        self.conn()?
            .execute(
                r#"UPDATE "Patient" SET "phone" = $2, "updatedAt" = now() WHERE "id" = $1"#,
                &[&patient_id, &phone],
            )
            .await?;
        Ok(())
    }

    async fn insert_identity_conflict(&mut self, conflict: &NewIdentityConflict) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let before = serde_json::to_value(&conflict.before)?;
        let after = serde_json::to_value(&conflict.after)?;
        self.conn()?
            .execute(
                r#"INSERT INTO "PatientIdentityConflict"
                   ("id", "importId", "emrPatientId", "beforeJson", "afterJson", "status", "detectedAt")
                   VALUES ($1, $2, $3, $4, $5, $6, now())"#,
                &[
                    &id,
                    &conflict.import_id.as_uuid(),
                    &conflict.emr_patient_id,
                    &before,
                    &after,
                    &CONFLICT_OPEN,
                ],
            )
            .await?;
        Ok(id)
    }

    async fn find_doctor_by_emr_id(&mut self, emr_doctor_id: &str) -> Result<Option<Doctor>> {
        let row = self
            .conn()?
            .query_opt(
                r#"SELECT "id", "name", "emrDoctorId", "isActive" FROM "Doctor"
                   WHERE "emrDoctorId" = $1 AND "deletedAt" IS NULL
                   LIMIT 1"#,
                &[&emr_doctor_id],
            )
            .await?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn find_doctor_by_name(&mut self, name: &str) -> Result<Option<Doctor>> {
        let row = self
            .conn()?
            .query_opt(
                r#"SELECT "id", "name", "emrDoctorId", "isActive" FROM "Doctor"
                   WHERE "name" = $1 AND "deletedAt" IS NULL
                   ORDER BY "createdAt"
                   LIMIT 1"#,
                &[&name],
            )
            .await?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn insert_doctor(&mut self, name: &str, emr_doctor_id: Option<&str>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                r#"INSERT INTO "Doctor" ("id", "name", "emrDoctorId", "isActive", "createdAt", "updatedAt")
                   VALUES ($1, $2, $3, TRUE, now(), now())"#,
                &[&id, &name, &emr_doctor_id],
            )
            .await?;
        Ok(id)
    }

    async fn find_clinic_room(&mut self, name: &str) -> Result<Option<ClinicRoom>> {
        let row = self
            .conn()?
            .query_opt(
                r#"SELECT "id", "name" FROM "ClinicRoom"
                   WHERE "name" = $1 AND "deletedAt" IS NULL
                   LIMIT 1"#,
                &[&name],
            )
            .await?;
        row.as_ref().map(clinic_room_from_row).transpose()
    }

    async fn find_appointment(
        &mut self,
        emr_appointment_id: &str,
    ) -> Result<Option<Appointment>> {
        let row = self
            .conn()?
            .query_opt(
                r#"SELECT "id", "emrAppointmentId", "patientId", "doctorId", "clinicRoomId",
                          "startAt", "endAt", "status", "source", "notes", "conflictFlag",
                          "version", "deletedAt"
                   FROM "Appointment"
                   WHERE "emrAppointmentId" = $1 AND "deletedAt" IS NULL
                   LIMIT 1"#,
                &[&emr_appointment_id],
            )
            .await?;
        row.as_ref().map(appointment_from_row).transpose()
    }

    async fn insert_appointment(
        &mut self,
        emr_appointment_id: Option<&str>,
        fields: &AppointmentFields,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                r#"INSERT INTO "Appointment"
                   ("id", "emrAppointmentId", "patientId", "doctorId", "clinicRoomId",
                    "startAt", "endAt", "status", "source", "notes", "conflictFlag", "version",
                    "createdAt", "updatedAt")
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, 0, now(), now())"#,
                &[
                    &id,
                    &emr_appointment_id,
                    &fields.patient_id,
                    &fields.doctor_id,
                    &fields.clinic_room_id,
                    &fields.start_at,
                    &fields.end_at,
                    &fields.status.as_str(),
                    &RecordSource::Emr.as_str(),
                    &fields.notes,
                ],
            )
            .await?;
        Ok(id)
    }

    async fn overwrite_appointment(
        &mut self,
        appointment_id: Uuid,
        fields: &AppointmentFields,
    ) -> Result<()> {
        self.conn()?
            .execute(
                r#"UPDATE "Appointment" SET
                     "startAt" = $2, "endAt" = $3, "doctorId" = $4, "clinicRoomId" = $5,
                     "status" = $6, "notes" = $7, "source" = $8,
                     "version" = "version" + 1, "updatedAt" = now()
                   WHERE "id" = $1"#,
                &[
                    &appointment_id,
                    &fields.start_at,
                    &fields.end_at,
                    &fields.doctor_id,
                    &fields.clinic_room_id,
                    &fields.status.as_str(),
                    &fields.notes,
                    &RecordSource::Emr.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn flag_appointment_conflict(&mut self, appointment_id: Uuid) -> Result<()> {
        self.conn()?
            .execute(
                r#"UPDATE "Appointment" SET
                     "conflictFlag" = TRUE, "version" = "version" + 1, "updatedAt" = now()
                   WHERE "id" = $1"#,
                &[&appointment_id],
            )
            .await?;
        Ok(())
    }

    async fn insert_import_error(&mut self, error: &NewImportError) -> Result<()> {
        let raw = serde_json::to_value(&error.raw)?;
        let row_number = i32::try_from(error.row_number).unwrap_or(i32::MAX);
        self.conn()?
            .execute(
                r#"INSERT INTO "ImportError"
                   ("id", "importId", "errorCode", "message", "rowNumber", "rawRowJson", "createdAt")
                   VALUES ($1, $2, $3, $4, $5, $6, now())"#,
                &[
                    &Uuid::new_v4(),
                    &error.import_id.as_uuid(),
                    &error.code.as_str(),
                    &error.message,
                    &row_number,
                    &raw,
                ],
            )
            .await?;
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<()> {
        self.depth += 1;
        let statement = format!("SAVEPOINT row_{}", self.depth);
        self.conn()?.batch_execute(&statement).await?;
        Ok(())
    }

    async fn release_savepoint(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(IntakeError::Database("no active savepoint".to_string()));
        }
        let statement = format!("RELEASE SAVEPOINT row_{}", self.depth);
        self.conn()?.batch_execute(&statement).await?;
        self.depth -= 1;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(IntakeError::Database("no active savepoint".to_string()));
        }
        let depth = self.depth;
        self.conn()?
            .batch_execute(&format!(
                "ROLLBACK TO SAVEPOINT row_{depth}; RELEASE SAVEPOINT row_{depth}"
            ))
            .await?;
        self.depth -= 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}

const IMPORT_COLUMNS: &str = r#""id", "filePath", "fileHash", "fileType", "status", "startedAt", "finishedAt", "statsJson""#;

#[async_trait]
impl ImportLedger for PostgreSQLAdapter {
    async fn is_duplicate(&self, hash: &FileHash) -> Result<bool> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_one(
                r#"SELECT EXISTS(
                     SELECT 1 FROM "Import"
                     WHERE "fileHash" = $1 AND "status" IN ('SUCCESS', 'PROCESSING'))"#,
                &[&hash.as_str()],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn create_import(&self, import: &NewImport) -> Result<ImportId> {
        let id = ImportId::new();
        let conn = self.client.get_connection().await?;
        conn.execute(
            r#"INSERT INTO "Import"
               ("id", "filePath", "fileHash", "fileType", "status", "startedAt", "createdAt")
               VALUES ($1, $2, $3, $4, $5, now(), now())"#,
            &[
                &id.as_uuid(),
                &import.file_path,
                &import.file_hash.as_str(),
                &import.kind.as_str(),
                &ImportStatus::Processing.as_str(),
            ],
        )
        .await?;
        Ok(id)
    }

    async fn finish_import(
        &self,
        id: ImportId,
        status: ImportStatus,
        stats: &Value,
    ) -> Result<()> {
        let conn = self.client.get_connection().await?;
        let updated = conn
            .execute(
                r#"UPDATE "Import" SET "status" = $2, "finishedAt" = now(), "statsJson" = $3
                   WHERE "id" = $1"#,
                &[&id.as_uuid(), &status.as_str(), stats],
            )
            .await?;
        if updated == 0 {
            return Err(IntakeError::Database(format!("import {id} not found")));
        }
        Ok(())
    }

    async fn recent_imports(
        &self,
        limit: usize,
        status: Option<ImportStatus>,
    ) -> Result<Vec<ImportRecord>> {
        let conn = self.client.get_connection().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let status = status.map(|s| s.as_str());
        let rows = conn
            .query(
                &format!(
                    r#"SELECT {IMPORT_COLUMNS} FROM "Import"
                       WHERE ($1::TEXT IS NULL OR "status" = $1)
                       ORDER BY "startedAt" DESC
                       LIMIT $2"#
                ),
                &[&status, &limit],
            )
            .await?;
        rows.iter().map(import_from_row).collect()
    }

    async fn import_errors(&self, id: ImportId) -> Result<Vec<ImportErrorRecord>> {
        let conn = self.client.get_connection().await?;
        let rows = conn
            .query(
                r#"SELECT "id", "importId", "errorCode", "message", "rowNumber", "rawRowJson"
                   FROM "ImportError"
                   WHERE "importId" = $1
                   ORDER BY "rowNumber""#,
                &[&id.as_uuid()],
            )
            .await?;
        rows.iter().map(import_error_from_row).collect()
    }

    async fn last_success_at(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_one(
                r#"SELECT MAX("finishedAt") FROM "Import" WHERE "status" = 'SUCCESS'"#,
                &[],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn count_failures_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_one(
                r#"SELECT COUNT(*) FROM "Import" WHERE "status" = 'FAIL' AND "startedAt" >= $1"#,
                &[&since],
            )
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
