//! Storage abstraction traits
//!
//! [`IntakeStore`] hands out transactional [`IntakeSession`]s for entity
//! reconciliation; [`ImportLedger`] owns the Import bookkeeping, which is
//! written outside those transactions so a status transition is durable even
//! when the entity work is rolled back.

use crate::core::ledger::{ImportRecord, ImportStatus, NewImport};
use crate::domain::{
    Appointment, AppointmentFields, ClinicRoom, Doctor, FileHash, ImportErrorRecord, ImportId,
    NewIdentityConflict, NewImportError, NewPatient, Patient, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Entity store
#[async_trait]
pub trait IntakeStore: Send + Sync {
    /// Test the database connection
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and indexes if they do not exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn IntakeSession>>;
}

/// One open transaction
///
/// Nothing is visible to other sessions until [`IntakeSession::commit`];
/// dropping a session without committing discards its writes.
#[async_trait]
pub trait IntakeSession: Send {
    /// Non-deleted patient by external id
    async fn find_patient(&mut self, emr_patient_id: &str) -> Result<Option<Patient>>;

    /// Insert an `ACTIVE` patient, returning its id
    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Uuid>;

    async fn update_patient_phone(&mut self, patient_id: Uuid, phone: &str) -> Result<()>;

    /// Record an `OPEN` identity conflict
    async fn insert_identity_conflict(&mut self, conflict: &NewIdentityConflict) -> Result<Uuid>;

    async fn find_doctor_by_emr_id(&mut self, emr_doctor_id: &str) -> Result<Option<Doctor>>;

    async fn find_doctor_by_name(&mut self, name: &str) -> Result<Option<Doctor>>;

    /// Insert an active doctor, returning its id
    async fn insert_doctor(&mut self, name: &str, emr_doctor_id: Option<&str>) -> Result<Uuid>;

    async fn find_clinic_room(&mut self, name: &str) -> Result<Option<ClinicRoom>>;

    /// Non-deleted appointment by external id
    async fn find_appointment(&mut self, emr_appointment_id: &str)
        -> Result<Option<Appointment>>;

    /// Insert an EMR-sourced appointment at version 0 with no conflict flag
    async fn insert_appointment(
        &mut self,
        emr_appointment_id: Option<&str>,
        fields: &AppointmentFields,
    ) -> Result<Uuid>;

    /// Replace the substantive fields, mark the row EMR-sourced and bump its version
    async fn overwrite_appointment(
        &mut self,
        appointment_id: Uuid,
        fields: &AppointmentFields,
    ) -> Result<()>;

    /// Raise the conflict flag and bump the version, leaving every other field alone
    async fn flag_appointment_conflict(&mut self, appointment_id: Uuid) -> Result<()>;

    async fn insert_import_error(&mut self, error: &NewImportError) -> Result<()>;

    /// Mark a point the current row can be rolled back to
    async fn savepoint(&mut self) -> Result<()>;

    async fn release_savepoint(&mut self) -> Result<()>;

    /// Undo everything since the last [`IntakeSession::savepoint`]
    async fn rollback_to_savepoint(&mut self) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Import ledger
#[async_trait]
pub trait ImportLedger: Send + Sync {
    /// True when an import with this fingerprint is `SUCCESS` or `PROCESSING`
    async fn is_duplicate(&self, hash: &FileHash) -> Result<bool>;

    /// Create a `PROCESSING` import, committed immediately
    async fn create_import(&self, import: &NewImport) -> Result<ImportId>;

    /// Move an import to its final status and record its statistics
    async fn finish_import(&self, id: ImportId, status: ImportStatus, stats: &Value)
        -> Result<()>;

    /// Most recent imports first
    async fn recent_imports(
        &self,
        limit: usize,
        status: Option<ImportStatus>,
    ) -> Result<Vec<ImportRecord>>;

    /// Error rows recorded against one import, in row order
    async fn import_errors(&self, id: ImportId) -> Result<Vec<ImportErrorRecord>>;

    /// Finish time of the most recent `SUCCESS` import of any kind
    async fn last_success_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Number of `FAIL` imports started at or after `since`
    async fn count_failures_since(&self, since: DateTime<Utc>) -> Result<u64>;
}
