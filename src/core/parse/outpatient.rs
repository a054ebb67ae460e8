//! Outpatient appointment parser

use super::normalize::normalize_status;
use super::{parse_sheet, Layout, RowReader};
use crate::adapters::spreadsheet::Sheet;
use crate::domain::{OutpatientRecord, ParseError, ParsedRow};
use chrono::{Duration, NaiveTime};

/// Visit length assumed when the export leaves the end time blank
pub const DEFAULT_VISIT_MINUTES: i64 = 30;

pub const OUTPATIENT_LAYOUT: Layout = Layout {
    headers: &[
        ("환자번호", "emrPatientId"),
        ("환자ID", "emrPatientId"),
        ("EMR_ID", "emrPatientId"),
        ("Patient ID", "emrPatientId"),
        ("환자명", "patientName"),
        ("이름", "patientName"),
        ("Patient Name", "patientName"),
        ("예약일", "appointmentDate"),
        ("예약일자", "appointmentDate"),
        ("진료일", "appointmentDate"),
        ("Appointment Date", "appointmentDate"),
        ("시작시간", "startTime"),
        ("예약시간", "startTime"),
        ("시작", "startTime"),
        ("Start Time", "startTime"),
        ("종료시간", "endTime"),
        ("종료", "endTime"),
        ("End Time", "endTime"),
        ("담당의", "doctorName"),
        ("담당의사", "doctorName"),
        ("의사", "doctorName"),
        ("Doctor", "doctorName"),
        ("의사ID", "emrDoctorId"),
        ("EMR의사ID", "emrDoctorId"),
        ("Doctor ID", "emrDoctorId"),
        ("진료실", "clinicRoomName"),
        ("진료실명", "clinicRoomName"),
        ("Clinic Room", "clinicRoomName"),
        ("예약상태", "status"),
        ("상태", "status"),
        ("Status", "status"),
        ("비고", "notes"),
        ("메모", "notes"),
        ("Notes", "notes"),
        ("EMR예약ID", "emrAppointmentId"),
        ("예약번호", "emrAppointmentId"),
        ("Appointment ID", "emrAppointmentId"),
    ],
    required: &["emrPatientId", "patientName", "appointmentDate", "startTime"],
};

/// Parses an outpatient appointment sheet
///
/// # Errors
///
/// Structural failures only; field problems flag the row.
pub fn parse_outpatient(sheet: &Sheet) -> Result<Vec<ParsedRow<OutpatientRecord>>, ParseError> {
    parse_sheet(sheet, &OUTPATIENT_LAYOUT, read_row)
}

/// Start plus the default visit length, wrapping past midnight
pub fn default_end_time(start: NaiveTime) -> NaiveTime {
    start + Duration::minutes(DEFAULT_VISIT_MINUTES)
}

fn read_row(reader: &mut RowReader<'_>) -> Option<OutpatientRecord> {
    let emr_patient_id = reader.required_text("emrPatientId");
    let patient_name = reader.required_text("patientName");
    let appointment_date = reader.required_date("appointmentDate");
    let start_time = reader.required_time("startTime");
    let end_time = reader.optional_time("endTime");
    let start_time = start_time?;

    // Only a synthesized end may wrap past midnight
    if let Some(end) = end_time.filter(|end| *end < start_time) {
        reader.error(format!(
            "endTime {} is earlier than startTime {}",
            end.format("%H:%M"),
            start_time.format("%H:%M")
        ));
    }

    Some(OutpatientRecord {
        emr_patient_id: emr_patient_id?,
        patient_name: patient_name?,
        appointment_date: appointment_date?,
        start_time,
        end_time: end_time.unwrap_or_else(|| default_end_time(start_time)),
        doctor_name: reader.optional_text("doctorName"),
        emr_doctor_id: reader.optional_text("emrDoctorId"),
        clinic_room_name: reader.optional_text("clinicRoomName"),
        status: normalize_status(reader.optional_text("status").as_deref()),
        notes: reader.optional_text("notes"),
        emr_appointment_id: reader.optional_text("emrAppointmentId"),
    })
}
