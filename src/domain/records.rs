//! Typed records produced by the parsers

use super::entities::AppointmentStatus;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One normalized inpatient census row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InpatientRecord {
    pub emr_patient_id: String,
    pub name: String,
    pub dob: NaiveDate,
    /// `M`/`F` when recognized, otherwise the trimmed source value
    pub sex: String,
    pub phone: Option<String>,
    pub admit_date: NaiveDate,
    pub planned_discharge_date: Option<NaiveDate>,
    pub attending_doctor: Option<String>,
    pub ward_name: Option<String>,
    pub room_name: Option<String>,
    pub bed_label: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// One normalized outpatient appointment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutpatientRecord {
    pub emr_patient_id: String,
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Source end time, or start + 30 minutes when the file left it blank
    pub end_time: NaiveTime,
    pub doctor_name: Option<String>,
    pub emr_doctor_id: Option<String>,
    pub clinic_room_name: Option<String>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub emr_appointment_id: Option<String>,
}

impl OutpatientRecord {
    pub fn start_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.start_time)
    }

    /// End instant; an end time earlier than the start rolls into the next day
    ///
    /// The parser only lets that happen for a synthesized end time. An explicit
    /// end earlier than the start flags the row instead.
    pub fn end_at(&self) -> NaiveDateTime {
        let end = self.appointment_date.and_time(self.end_time);
        if self.end_time < self.start_time {
            end + Duration::days(1)
        } else {
            end
        }
    }
}
