//! Persistent entities reconciled by the importers
//!
//! These mirror the tables in `migrations/001_initial_schema.sql`. Ids are
//! generated on the application side so the in-memory store and PostgreSQL
//! behave the same.

use super::ids::ImportId;
use super::rows::{ErrorCode, RawRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Placeholder date of birth for patients first seen in an outpatient feed
pub fn stub_dob() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Placeholder sex for patients first seen in an outpatient feed
pub const STUB_SEX: &str = "U";

/// Lifecycle status given to patients created by the importers
pub const PATIENT_ACTIVE: &str = "ACTIVE";

/// Status of a freshly detected identity conflict
pub const CONFLICT_OPEN: &str = "OPEN";

/// Stored patient row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub emr_patient_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub sex: String,
    pub phone: Option<String>,
    pub status: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn identity(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            name: self.name.clone(),
            dob: self.dob,
            sex: self.sex.clone(),
        }
    }
}

/// Values for a patient insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub emr_patient_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub sex: String,
    pub phone: Option<String>,
}

impl NewPatient {
    /// Minimal record for a patient the outpatient feed references first
    pub fn stub(emr_patient_id: &str, name: &str) -> Self {
        Self {
            emr_patient_id: emr_patient_id.to_string(),
            name: name.to_string(),
            dob: stub_dob(),
            sex: STUB_SEX.to_string(),
            phone: None,
        }
    }
}

/// The identity fields compared on every inpatient re-sighting
///
/// Serialized as `{"name", "dob": "YYYY-MM-DD", "sex"}` into the conflict's
/// before/after payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub name: String,
    pub dob: NaiveDate,
    pub sex: String,
}

/// Values for a PatientIdentityConflict insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentityConflict {
    pub import_id: ImportId,
    pub emr_patient_id: String,
    pub before: IdentitySnapshot,
    pub after: IdentitySnapshot,
}

/// Stored PatientIdentityConflict row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConflict {
    pub id: Uuid,
    pub import_id: ImportId,
    pub emr_patient_id: String,
    pub before_json: serde_json::Value,
    pub after_json: serde_json::Value,
    pub status: String,
    pub detected_at: DateTime<Utc>,
}

/// Stored doctor row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub emr_doctor_id: Option<String>,
    pub is_active: bool,
}

/// Stored clinic room row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicRoom {
    pub id: Uuid,
    pub name: String,
}

/// Canonical appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Booked,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
    Changed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::CheckedIn => "CHECKED_IN",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
            AppointmentStatus::Changed => "CHANGED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(AppointmentStatus::Booked),
            "CHECKED_IN" => Ok(AppointmentStatus::CheckedIn),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            "NO_SHOW" => Ok(AppointmentStatus::NoShow),
            "CHANGED" => Ok(AppointmentStatus::Changed),
            other => Err(format!("Unknown appointment status: {other}")),
        }
    }
}

/// Who last wrote an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordSource {
    /// Written by an EMR import
    Emr,
    /// Edited inside the hospital system; wins over later EMR changes
    Internal,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Emr => "EMR",
            RecordSource::Internal => "INTERNAL",
        }
    }
}

impl FromStr for RecordSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMR" => Ok(RecordSource::Emr),
            "INTERNAL" => Ok(RecordSource::Internal),
            other => Err(format!("Unknown record source: {other}")),
        }
    }
}

/// The substantive appointment fields an EMR row supplies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentFields {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub clinic_room_id: Option<Uuid>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// Stored appointment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub emr_appointment_id: Option<String>,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub clinic_room_id: Option<Uuid>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub source: RecordSource,
    pub notes: Option<String>,
    pub conflict_flag: bool,
    pub version: i32,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// True when the incoming fields disagree on time, doctor or status
    ///
    /// Instants are compared exactly; room and notes do not count as a change.
    pub fn differs_from(&self, incoming: &AppointmentFields) -> bool {
        self.start_at != incoming.start_at
            || self.end_at != incoming.end_at
            || self.doctor_id != incoming.doctor_id
            || self.status != incoming.status
    }
}

/// Values for an ImportError insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewImportError {
    pub import_id: ImportId,
    pub code: ErrorCode,
    pub message: String,
    pub row_number: u32,
    pub raw: RawRow,
}

/// Stored ImportError row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportErrorRecord {
    pub id: Uuid,
    pub import_id: ImportId,
    pub error_code: ErrorCode,
    pub message: String,
    pub row_number: u32,
    pub raw_row_json: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment() -> Appointment {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            emr_appointment_id: Some("A1".to_string()),
            patient_id: Uuid::new_v4(),
            doctor_id: Some(Uuid::new_v4()),
            clinic_room_id: None,
            start_at: day.and_hms_opt(9, 0, 0).unwrap(),
            end_at: day.and_hms_opt(9, 30, 0).unwrap(),
            status: AppointmentStatus::Booked,
            source: RecordSource::Emr,
            notes: None,
            conflict_flag: false,
            version: 0,
            deleted_at: None,
        }
    }

    fn fields_of(a: &Appointment) -> AppointmentFields {
        AppointmentFields {
            patient_id: a.patient_id,
            doctor_id: a.doctor_id,
            clinic_room_id: a.clinic_room_id,
            start_at: a.start_at,
            end_at: a.end_at,
            status: a.status,
            notes: a.notes.clone(),
        }
    }

    #[test]
    fn test_identical_fields_are_not_a_change() {
        let a = appointment();
        assert!(!a.differs_from(&fields_of(&a)));
    }

    #[test]
    fn test_notes_and_room_do_not_count_as_change() {
        let a = appointment();
        let mut incoming = fields_of(&a);
        incoming.notes = Some("moved".to_string());
        incoming.clinic_room_id = Some(Uuid::new_v4());
        assert!(!a.differs_from(&incoming));
    }

    #[test]
    fn test_time_doctor_or_status_change_detected() {
        let a = appointment();

        let mut moved = fields_of(&a);
        moved.start_at += chrono::Duration::minutes(15);
        assert!(a.differs_from(&moved));

        let mut other_doctor = fields_of(&a);
        other_doctor.doctor_id = Some(Uuid::new_v4());
        assert!(a.differs_from(&other_doctor));

        let mut cancelled = fields_of(&a);
        cancelled.status = AppointmentStatus::Cancelled;
        assert!(a.differs_from(&cancelled));
    }

    #[test]
    fn test_identity_snapshot_json_shape() {
        let snapshot = IdentitySnapshot {
            name: "Kim".to_string(),
            dob: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            sex: "M".to_string(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Kim", "dob": "1980-01-01", "sex": "M"})
        );
    }

    #[test]
    fn test_status_parses_stored_form() {
        assert_eq!(
            "NO_SHOW".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::NoShow
        );
        assert!("no_show".parse::<AppointmentStatus>().is_err());
        assert_eq!("INTERNAL".parse::<RecordSource>().unwrap(), RecordSource::Internal);
    }

    #[test]
    fn test_stub_patient_placeholders() {
        let stub = NewPatient::stub("P9", "Park");
        assert_eq!(stub.dob, NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(stub.sex, STUB_SEX);
        assert!(stub.phone.is_none());
    }
}
