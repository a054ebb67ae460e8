//! In-memory store
//!
//! Implements [`IntakeStore`] and [`ImportLedger`] over process memory with
//! the same transactional semantics as PostgreSQL: a session works on a copy
//! of the entity tables, savepoints are snapshots of that copy, and commit
//! swaps the copy back in. Used for `database_target = "memory"` and tests.

use crate::adapters::database::traits::{ImportLedger, IntakeSession, IntakeStore};
use crate::core::ledger::{ImportRecord, ImportStatus, NewImport};
use crate::domain::entities::{CONFLICT_OPEN, PATIENT_ACTIVE};
use crate::domain::{
    Appointment, AppointmentFields, ClinicRoom, Doctor, FileHash, IdentityConflict,
    ImportErrorRecord, ImportId, IntakeError, NewIdentityConflict, NewImportError, NewPatient,
    Patient, RecordSource, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Entity tables written inside sessions
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub patients: Vec<Patient>,
    pub identity_conflicts: Vec<IdentityConflict>,
    pub doctors: Vec<Doctor>,
    pub clinic_rooms: Vec<ClinicRoom>,
    pub appointments: Vec<Appointment>,
    pub import_errors: Vec<ImportErrorRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    imports: Vec<ImportRecord>,
}

/// Shared in-memory database
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| IntakeError::Database("memory store lock poisoned".to_string()))
    }

    /// Committed entity tables
    pub fn snapshot(&self) -> Result<Tables> {
        Ok(self.lock()?.tables.clone())
    }

    /// Every Import row in creation order
    pub fn imports(&self) -> Result<Vec<ImportRecord>> {
        Ok(self.lock()?.imports.clone())
    }

    /// Adds a clinic room; rooms are never created by the importers
    pub fn add_clinic_room(&self, name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock()?.tables.clinic_rooms.push(ClinicRoom {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Applies an edit to an appointment the way the hospital UI would,
    /// marking it `INTERNAL`
    pub fn apply_internal_edit<F>(&self, emr_appointment_id: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Appointment),
    {
        let mut inner = self.lock()?;
        let appointment = inner
            .tables
            .appointments
            .iter_mut()
            .find(|a| a.emr_appointment_id.as_deref() == Some(emr_appointment_id))
            .ok_or_else(|| {
                IntakeError::Database(format!("appointment {emr_appointment_id} not found"))
            })?;
        edit(appointment);
        appointment.source = RecordSource::Internal;
        appointment.version += 1;
        Ok(())
    }
}

#[async_trait]
impl IntakeStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn IntakeSession>> {
        let working = self.lock()?.tables.clone();
        Ok(Box::new(MemorySession {
            store: self.clone(),
            working,
            savepoints: Vec::new(),
        }))
    }
}

/// Transaction over a private copy of the tables
pub struct MemorySession {
    store: MemoryStore,
    working: Tables,
    savepoints: Vec<Tables>,
}

#[async_trait]
impl IntakeSession for MemorySession {
    async fn find_patient(&mut self, emr_patient_id: &str) -> Result<Option<Patient>> {
        Ok(self
            .working
            .patients
            .iter()
            .find(|p| p.emr_patient_id == emr_patient_id && p.deleted_at.is_none())
            .cloned())
    }

    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Uuid> {
        if self
            .working
            .patients
            .iter()
            .any(|p| p.emr_patient_id == patient.emr_patient_id && p.deleted_at.is_none())
        {
            return Err(IntakeError::Database(format!(
                "duplicate key: Patient.emrPatientId = {}",
                patient.emr_patient_id
            )));
        }
        let id = Uuid::new_v4();
        self.working.patients.push(Patient {
            id,
            emr_patient_id: patient.emr_patient_id.clone(),
            name: patient.name.clone(),
            dob: patient.dob,
            sex: patient.sex.clone(),
            phone: patient.phone.clone(),
            status: PATIENT_ACTIVE.to_string(),
            deleted_at: None,
        });
        Ok(id)
    }

    async fn update_patient_phone(&mut self, patient_id: Uuid, phone: &str) -> Result<()> {
        let patient = self
            .working
            .patients
            .iter_mut()
            .find(|p| p.id == patient_id)
            .ok_or_else(|| IntakeError::Database(format!("patient {patient_id} not found")))?;
        patient.phone = Some(phone.to_string());
        Ok(())
    }

    async fn insert_identity_conflict(&mut self, conflict: &NewIdentityConflict) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.working.identity_conflicts.push(IdentityConflict {
            id,
            import_id: conflict.import_id,
            emr_patient_id: conflict.emr_patient_id.clone(),
            before_json: serde_json::to_value(&conflict.before)?,
            after_json: serde_json::to_value(&conflict.after)?,
            status: CONFLICT_OPEN.to_string(),
            detected_at: Utc::now(),
        });
        Ok(id)
    }

    async fn find_doctor_by_emr_id(&mut self, emr_doctor_id: &str) -> Result<Option<Doctor>> {
        Ok(self
            .working
            .doctors
            .iter()
            .find(|d| d.emr_doctor_id.as_deref() == Some(emr_doctor_id))
            .cloned())
    }

    async fn find_doctor_by_name(&mut self, name: &str) -> Result<Option<Doctor>> {
        Ok(self
            .working
            .doctors
            .iter()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn insert_doctor(&mut self, name: &str, emr_doctor_id: Option<&str>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.working.doctors.push(Doctor {
            id,
            name: name.to_string(),
            emr_doctor_id: emr_doctor_id.map(str::to_string),
            is_active: true,
        });
        Ok(id)
    }

    async fn find_clinic_room(&mut self, name: &str) -> Result<Option<ClinicRoom>> {
        Ok(self
            .working
            .clinic_rooms
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn find_appointment(
        &mut self,
        emr_appointment_id: &str,
    ) -> Result<Option<Appointment>> {
        Ok(self
            .working
            .appointments
            .iter()
            .find(|a| {
                a.emr_appointment_id.as_deref() == Some(emr_appointment_id)
                    && a.deleted_at.is_none()
            })
            .cloned())
    }

    async fn insert_appointment(
        &mut self,
        emr_appointment_id: Option<&str>,
        fields: &AppointmentFields,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.working.appointments.push(Appointment {
            id,
            emr_appointment_id: emr_appointment_id.map(str::to_string),
            patient_id: fields.patient_id,
            doctor_id: fields.doctor_id,
            clinic_room_id: fields.clinic_room_id,
            start_at: fields.start_at,
            end_at: fields.end_at,
            status: fields.status,
            source: RecordSource::Emr,
            notes: fields.notes.clone(),
            conflict_flag: false,
            version: 0,
            deleted_at: None,
        });
        Ok(id)
    }

    async fn overwrite_appointment(
        &mut self,
        appointment_id: Uuid,
        fields: &AppointmentFields,
    ) -> Result<()> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.start_at = fields.start_at;
        appointment.end_at = fields.end_at;
        appointment.doctor_id = fields.doctor_id;
        appointment.clinic_room_id = fields.clinic_room_id;
        appointment.status = fields.status;
        appointment.notes = fields.notes.clone();
        appointment.source = RecordSource::Emr;
        appointment.version += 1;
        Ok(())
    }

    async fn flag_appointment_conflict(&mut self, appointment_id: Uuid) -> Result<()> {
        let appointment = self.appointment_mut(appointment_id)?;
        appointment.conflict_flag = true;
        appointment.version += 1;
        Ok(())
    }

    async fn insert_import_error(&mut self, error: &NewImportError) -> Result<()> {
        self.working.import_errors.push(ImportErrorRecord {
            id: Uuid::new_v4(),
            import_id: error.import_id,
            error_code: error.code,
            message: error.message.clone(),
            row_number: error.row_number,
            raw_row_json: serde_json::to_value(&error.raw)?,
        });
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<()> {
        self.savepoints.push(self.working.clone());
        Ok(())
    }

    async fn release_savepoint(&mut self) -> Result<()> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or_else(|| IntakeError::Database("no active savepoint".to_string()))
    }

    async fn rollback_to_savepoint(&mut self) -> Result<()> {
        let snapshot = self
            .savepoints
            .pop()
            .ok_or_else(|| IntakeError::Database("no active savepoint".to_string()))?;
        self.working = snapshot;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemorySession { store, working, .. } = *self;
        store.lock()?.tables = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl MemorySession {
    fn appointment_mut(&mut self, appointment_id: Uuid) -> Result<&mut Appointment> {
        self.working
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| {
                IntakeError::Database(format!("appointment {appointment_id} not found"))
            })
    }
}

#[async_trait]
impl ImportLedger for MemoryStore {
    async fn is_duplicate(&self, hash: &FileHash) -> Result<bool> {
        Ok(self
            .lock()?
            .imports
            .iter()
            .any(|i| &i.file_hash == hash && i.status.blocks_reprocessing()))
    }

    async fn create_import(&self, import: &NewImport) -> Result<ImportId> {
        let id = ImportId::new();
        self.lock()?.imports.push(ImportRecord {
            id,
            file_path: import.file_path.clone(),
            file_hash: import.file_hash.clone(),
            file_type: import.kind,
            status: ImportStatus::Processing,
            started_at: Utc::now(),
            finished_at: None,
            stats_json: None,
        });
        Ok(id)
    }

    async fn finish_import(
        &self,
        id: ImportId,
        status: ImportStatus,
        stats: &Value,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let import = inner
            .imports
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| IntakeError::Database(format!("import {id} not found")))?;
        import.status = status;
        import.finished_at = Some(Utc::now());
        import.stats_json = Some(stats.clone());
        Ok(())
    }

    async fn recent_imports(
        &self,
        limit: usize,
        status: Option<ImportStatus>,
    ) -> Result<Vec<ImportRecord>> {
        Ok(self
            .lock()?
            .imports
            .iter()
            .rev()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn import_errors(&self, id: ImportId) -> Result<Vec<ImportErrorRecord>> {
        let mut errors: Vec<ImportErrorRecord> = self
            .lock()?
            .tables
            .import_errors
            .iter()
            .filter(|e| e.import_id == id)
            .cloned()
            .collect();
        errors.sort_by_key(|e| e.row_number);
        Ok(errors)
    }

    async fn last_success_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .lock()?
            .imports
            .iter()
            .filter(|i| i.status == ImportStatus::Success)
            .filter_map(|i| i.finished_at)
            .max())
    }

    async fn count_failures_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .lock()?
            .imports
            .iter()
            .filter(|i| i.status == ImportStatus::Fail && i.started_at >= since)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentKind;
    use chrono::NaiveDate;

    fn new_patient(id: &str) -> NewPatient {
        NewPatient {
            emr_patient_id: id.to_string(),
            name: "Kim".to_string(),
            dob: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            sex: "M".to_string(),
            phone: None,
        }
    }

    fn hash(c: char) -> FileHash {
        FileHash::new(c.to_string().repeat(64)).unwrap()
    }

    #[tokio::test]
    async fn test_uncommitted_session_is_invisible() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.insert_patient(&new_patient("P1")).await.unwrap();
        assert!(store.snapshot().unwrap().patients.is_empty());

        session.rollback().await.unwrap();
        assert!(store.snapshot().unwrap().patients.is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.insert_patient(&new_patient("P1")).await.unwrap();
        session.commit().await.unwrap();

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.patients.len(), 1);
        assert_eq!(tables.patients[0].status, "ACTIVE");
    }

    #[tokio::test]
    async fn test_rollback_to_savepoint_undoes_row() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.insert_patient(&new_patient("P1")).await.unwrap();

        session.savepoint().await.unwrap();
        session.insert_patient(&new_patient("P2")).await.unwrap();
        session.rollback_to_savepoint().await.unwrap();

        session.commit().await.unwrap();
        let ids: Vec<_> = store
            .snapshot()
            .unwrap()
            .patients
            .into_iter()
            .map(|p| p.emr_patient_id)
            .collect();
        assert_eq!(ids, vec!["P1"]);
    }

    #[tokio::test]
    async fn test_duplicate_patient_insert_is_rejected() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.insert_patient(&new_patient("P1")).await.unwrap();
        assert!(session.insert_patient(&new_patient("P1")).await.is_err());
    }

    #[tokio::test]
    async fn test_ledger_duplicate_only_for_blocking_statuses() {
        let store = MemoryStore::new();
        let import = NewImport {
            file_path: "/in/a.xlsx".to_string(),
            file_hash: hash('a'),
            kind: DocumentKind::Inpatient,
        };

        let id = store.create_import(&import).await.unwrap();
        assert!(store.is_duplicate(&hash('a')).await.unwrap());
        assert!(!store.is_duplicate(&hash('b')).await.unwrap());

        store
            .finish_import(id, ImportStatus::Fail, &serde_json::json!({"error": "x"}))
            .await
            .unwrap();
        assert!(!store.is_duplicate(&hash('a')).await.unwrap());
        assert_eq!(
            store
                .count_failures_since(Utc::now() - chrono::Duration::hours(1))
                .await
                .unwrap(),
            1
        );
        assert!(store.last_success_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_imports_newest_first_with_filter() {
        let store = MemoryStore::new();
        for c in ['a', 'b', 'c'] {
            store
                .create_import(&NewImport {
                    file_path: format!("/in/{c}.xlsx"),
                    file_hash: hash(c),
                    kind: DocumentKind::Outpatient,
                })
                .await
                .unwrap();
        }
        let recent = store.recent_imports(2, None).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].file_path, "/in/c.xlsx");

        let succeeded = store
            .recent_imports(10, Some(ImportStatus::Success))
            .await
            .unwrap();
        assert!(succeeded.is_empty());
    }
}
