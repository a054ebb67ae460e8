//! PostgreSQL row mapping
//!
//! Converts `tokio_postgres` rows into domain entities. Enumerations are
//! stored as TEXT and parsed back here; an unknown value is a database error
//! rather than a silent default.

use crate::core::ledger::{ImportRecord, ImportStatus};
use crate::domain::{
    Appointment, AppointmentStatus, ClinicRoom, Doctor, DocumentKind, ErrorCode, FileHash,
    ImportErrorRecord, ImportId, IntakeError, Patient, RecordSource, Result,
};
use std::str::FromStr;
use tokio_postgres::Row;

fn parse_text<T>(row: &Row, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let value: String = row.try_get(column)?;
    value
        .parse()
        .map_err(|e: String| IntakeError::Database(format!("column {column}: {e}")))
}

pub fn patient_from_row(row: &Row) -> Result<Patient> {
    Ok(Patient {
        id: row.try_get("id")?,
        emr_patient_id: row.try_get("emrPatientId")?,
        name: row.try_get("name")?,
        dob: row.try_get("dob")?,
        sex: row.try_get("sex")?,
        phone: row.try_get("phone")?,
        status: row.try_get("status")?,
        deleted_at: row.try_get("deletedAt")?,
    })
}

pub fn doctor_from_row(row: &Row) -> Result<Doctor> {
    Ok(Doctor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        emr_doctor_id: row.try_get("emrDoctorId")?,
        is_active: row.try_get("isActive")?,
    })
}

pub fn clinic_room_from_row(row: &Row) -> Result<ClinicRoom> {
    Ok(ClinicRoom {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

pub fn appointment_from_row(row: &Row) -> Result<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        emr_appointment_id: row.try_get("emrAppointmentId")?,
        patient_id: row.try_get("patientId")?,
        doctor_id: row.try_get("doctorId")?,
        clinic_room_id: row.try_get("clinicRoomId")?,
        start_at: row.try_get("startAt")?,
        end_at: row.try_get("endAt")?,
        status: parse_text::<AppointmentStatus>(row, "status")?,
        source: parse_text::<RecordSource>(row, "source")?,
        notes: row.try_get("notes")?,
        conflict_flag: row.try_get("conflictFlag")?,
        version: row.try_get("version")?,
        deleted_at: row.try_get("deletedAt")?,
    })
}

pub fn import_from_row(row: &Row) -> Result<ImportRecord> {
    let hash: String = row.try_get("fileHash")?;
    Ok(ImportRecord {
        id: ImportId::from_uuid(row.try_get("id")?),
        file_path: row.try_get("filePath")?,
        file_hash: FileHash::new(hash).map_err(IntakeError::Database)?,
        file_type: parse_text::<DocumentKind>(row, "fileType")?,
        status: parse_text::<ImportStatus>(row, "status")?,
        started_at: row.try_get("startedAt")?,
        finished_at: row.try_get("finishedAt")?,
        stats_json: row.try_get("statsJson")?,
    })
}

pub fn import_error_from_row(row: &Row) -> Result<ImportErrorRecord> {
    let code: String = row.try_get("errorCode")?;
    let error_code = match code.as_str() {
        "PARSE_ERROR" => ErrorCode::ParseError,
        "VALIDATION_ERROR" => ErrorCode::ValidationError,
        other => {
            return Err(IntakeError::Database(format!(
                "column errorCode: unknown value {other}"
            )))
        }
    };
    let row_number: i32 = row.try_get("rowNumber")?;
    Ok(ImportErrorRecord {
        id: row.try_get("id")?,
        import_id: ImportId::from_uuid(row.try_get("importId")?),
        error_code,
        message: row.try_get("message")?,
        row_number: u32::try_from(row_number).unwrap_or_default(),
        raw_row_json: row.try_get("rawRowJson")?,
    })
}
