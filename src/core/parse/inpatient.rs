//! Inpatient census parser

use super::normalize::{normalize_phone, normalize_sex};
use super::{parse_sheet, Layout, RowReader};
use crate::adapters::spreadsheet::Sheet;
use crate::domain::{InpatientRecord, ParseError, ParsedRow};

pub const INPATIENT_LAYOUT: Layout = Layout {
    headers: &[
        ("환자번호", "emrPatientId"),
        ("환자ID", "emrPatientId"),
        ("EMR_ID", "emrPatientId"),
        ("Patient ID", "emrPatientId"),
        ("환자명", "name"),
        ("이름", "name"),
        ("Name", "name"),
        ("Patient Name", "name"),
        ("생년월일", "dob"),
        ("DOB", "dob"),
        ("Date of Birth", "dob"),
        ("성별", "sex"),
        ("Sex", "sex"),
        ("Gender", "sex"),
        ("연락처", "phone"),
        ("전화번호", "phone"),
        ("Phone", "phone"),
        ("입원일", "admitDate"),
        ("입원일자", "admitDate"),
        ("Admit Date", "admitDate"),
        ("퇴원예정일", "plannedDischargeDate"),
        ("Planned Discharge", "plannedDischargeDate"),
        ("담당의", "attendingDoctor"),
        ("담당의사", "attendingDoctor"),
        ("Attending", "attendingDoctor"),
        ("병동", "wardName"),
        ("Ward", "wardName"),
        ("호실", "roomName"),
        ("Room", "roomName"),
        ("베드", "bedLabel"),
        ("침상", "bedLabel"),
        ("Bed", "bedLabel"),
        ("상태", "status"),
        ("Status", "status"),
        ("비고", "notes"),
        ("Notes", "notes"),
    ],
    required: &["emrPatientId", "name", "dob", "sex", "admitDate"],
};

/// Parses an inpatient census sheet
///
/// # Errors
///
/// Structural failures only; field problems flag the row.
pub fn parse_inpatient(sheet: &Sheet) -> Result<Vec<ParsedRow<InpatientRecord>>, ParseError> {
    parse_sheet(sheet, &INPATIENT_LAYOUT, read_row)
}

fn read_row(reader: &mut RowReader<'_>) -> Option<InpatientRecord> {
    let emr_patient_id = reader.required_text("emrPatientId");
    let name = reader.required_text("name");
    let dob = reader.required_date("dob");
    let sex = reader.required_text("sex").map(|s| normalize_sex(&s));
    let admit_date = reader.required_date("admitDate");
    let planned_discharge_date = reader.optional_date("plannedDischargeDate");

    Some(InpatientRecord {
        emr_patient_id: emr_patient_id?,
        name: name?,
        dob: dob?,
        sex: sex?,
        phone: reader
            .optional_text("phone")
            .and_then(|p| normalize_phone(&p)),
        admit_date: admit_date?,
        planned_discharge_date,
        attending_doctor: reader.optional_text("attendingDoctor"),
        ward_name: reader.optional_text("wardName"),
        room_name: reader.optional_text("roomName"),
        bed_label: reader.optional_text("bedLabel"),
        status: reader.optional_text("status"),
        notes: reader.optional_text("notes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse::testing::sheet;
    use crate::domain::RowOutcome;
    use chrono::NaiveDate;

    #[test]
    fn test_parses_korean_census() {
        let sheet = sheet(&[
            &["입원환자 현황", "", "", "", "", ""],
            &["환자번호", "환자명", "생년월일", "성별", "연락처", "입원일"],
            &["P1", " 김민수 ", "1980-01-01", "남", "010-1234-5678", "2024.01.02"],
        ]);
        let rows = parse_inpatient(&sheet).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 3);

        let record = rows[0].record().unwrap();
        assert_eq!(record.emr_patient_id, "P1");
        assert_eq!(record.name, "김민수");
        assert_eq!(record.sex, "M");
        assert_eq!(record.phone.as_deref(), Some("01012345678"));
        assert_eq!(record.admit_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(record.planned_discharge_date, None);
    }

    #[test]
    fn test_collects_every_field_error() {
        let sheet = sheet(&[
            &["Patient ID", "Name", "DOB", "Sex", "Admit Date", "Planned Discharge"],
            &["P2", "", "not a date", "F", "2024-01-02", "soon"],
        ]);
        let rows = parse_inpatient(&sheet).unwrap();
        match &rows[0].outcome {
            RowOutcome::Flagged(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].contains("name"));
                assert!(errors[1].contains("dob"));
                assert!(errors[2].contains("plannedDischargeDate"));
            }
            RowOutcome::Clean(_) => panic!("row should be flagged"),
        }
    }

    #[test]
    fn test_unknown_sex_passes_through() {
        let sheet = sheet(&[
            &["환자번호", "환자명", "생년월일", "성별", "입원일"],
            &["P3", "Lee", "19900101", "X", "2024-01-02"],
        ]);
        let rows = parse_inpatient(&sheet).unwrap();
        assert_eq!(rows[0].record().unwrap().sex, "X");
    }

    #[test]
    fn test_missing_admit_column_fails() {
        let sheet = sheet(&[
            &["환자번호", "환자명", "생년월일", "성별"],
            &["P1", "Kim", "1980-01-01", "M"],
        ]);
        assert!(matches!(
            parse_inpatient(&sheet),
            Err(ParseError::MissingRequiredColumns { missing }) if missing == vec!["admitDate"]
        ));
    }

    #[test]
    fn test_blank_ward_keeps_row() {
        let sheet = sheet(&[
            &["병동", "환자번호", "환자명", "생년월일", "성별", "입원일"],
            &["7W", "P1", "Kim", "1980-01-01", "M", "2024-01-02"],
            &["", "P2", "Lee", "1990-02-03", "F", "2024-01-03"],
        ]);
        let rows = parse_inpatient(&sheet).unwrap();
        let numbers: Vec<u32> = rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![2, 3]);
        let record = rows[1].record().unwrap();
        assert_eq!(record.emr_patient_id, "P2");
        assert_eq!(record.ward_name, None);
    }
}
