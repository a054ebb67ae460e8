//! Row validation
//!
//! Splits parsed rows into rows eligible for upsert and rows for the audit
//! trail. Inpatient rows get the business rules below; outpatient rows pass
//! on the parser's verdict alone.

use crate::domain::{
    ErrorCode, InpatientRecord, ParsedRow, Partition, RowError, RowOutcome, ValidRow,
};
use crate::log_row_rejected;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Oldest plausible patient
pub const MAX_AGE_YEARS: f64 = 150.0;

/// Admissions further ahead than this are treated as entry mistakes
pub const MAX_ADMIT_DAYS_AHEAD: i64 = 30;

const DAYS_PER_YEAR: f64 = 365.25;

/// Applies the inpatient business rules
///
/// Rows are taken in file order. For a repeated `emrPatientId` the first
/// clean occurrence is kept and later ones are rejected without further
/// checks.
pub fn validate_inpatient(
    rows: Vec<ParsedRow<InpatientRecord>>,
    today: NaiveDate,
) -> Partition<InpatientRecord> {
    let mut partition = Partition::default();
    let mut seen: HashSet<String> = HashSet::new();

    for row in rows {
        let record = match row.outcome {
            RowOutcome::Flagged(messages) => {
                reject(&mut partition, row.row_number, ErrorCode::ParseError, messages, row.raw);
                continue;
            }
            RowOutcome::Clean(record) => record,
        };

        if !seen.insert(record.emr_patient_id.clone()) {
            let message = format!("duplicate emrPatientId in file: {}", record.emr_patient_id);
            reject(
                &mut partition,
                row.row_number,
                ErrorCode::ValidationError,
                vec![message],
                row.raw,
            );
            continue;
        }

        let messages = business_rule_errors(&record, today);
        if messages.is_empty() {
            partition.valid.push(ValidRow {
                row_number: row.row_number,
                record,
            });
        } else {
            reject(
                &mut partition,
                row.row_number,
                ErrorCode::ValidationError,
                messages,
                row.raw,
            );
        }
    }

    partition
}

/// Keeps clean rows and rejects flagged ones, with no further rules
pub fn pass_through<T>(rows: Vec<ParsedRow<T>>) -> Partition<T> {
    let mut partition = Partition::default();
    for row in rows {
        match row.outcome {
            RowOutcome::Clean(record) => partition.valid.push(ValidRow {
                row_number: row.row_number,
                record,
            }),
            RowOutcome::Flagged(messages) => {
                reject(&mut partition, row.row_number, ErrorCode::ParseError, messages, row.raw)
            }
        }
    }
    partition
}

fn business_rule_errors(record: &InpatientRecord, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();

    let age = (today - record.dob).num_days() as f64 / DAYS_PER_YEAR;
    if !(0.0..=MAX_AGE_YEARS).contains(&age) {
        errors.push(format!("dob out of range: {}", record.dob));
    }

    if (record.admit_date - today).num_days() > MAX_ADMIT_DAYS_AHEAD {
        errors.push(format!(
            "admitDate more than {MAX_ADMIT_DAYS_AHEAD} days in the future: {}",
            record.admit_date
        ));
    }

    if let Some(planned) = record.planned_discharge_date {
        if planned < record.admit_date {
            errors.push(format!(
                "plannedDischargeDate {planned} is before admitDate {}",
                record.admit_date
            ));
        }
    }

    if !record.sex.is_empty() && record.sex != "M" && record.sex != "F" {
        errors.push(format!("sex must be M or F: {}", record.sex));
    }

    errors
}

fn reject<T>(
    partition: &mut Partition<T>,
    row_number: u32,
    code: ErrorCode,
    messages: Vec<String>,
    raw: crate::domain::RawRow,
) {
    let error = RowError {
        row_number,
        code,
        messages,
        raw,
    };
    log_row_rejected!(row_number, code, error.message());
    partition.errors.push(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRow;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(id: &str) -> InpatientRecord {
        InpatientRecord {
            emr_patient_id: id.to_string(),
            name: "Kim".to_string(),
            dob: date("1980-01-01"),
            sex: "M".to_string(),
            phone: None,
            admit_date: date("2024-01-01"),
            planned_discharge_date: None,
            attending_doctor: None,
            ward_name: None,
            room_name: None,
            bed_label: None,
            status: None,
            notes: None,
        }
    }

    fn clean(row_number: u32, record: InpatientRecord) -> ParsedRow<InpatientRecord> {
        ParsedRow::clean(row_number, RawRow::new(), record)
    }

    #[test]
    fn test_intra_file_duplicate_keeps_first() {
        let mut second = record("P1");
        second.admit_date = date("2024-01-02");
        let partition = validate_inpatient(vec![clean(2, record("P1")), clean(3, second)], today());

        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.valid[0].row_number, 2);
        assert_eq!(partition.errors.len(), 1);
        assert_eq!(partition.errors[0].row_number, 3);
        assert_eq!(partition.errors[0].code, ErrorCode::ValidationError);
        assert!(partition.errors[0].message().contains("P1"));
    }

    #[test]
    fn test_flagged_rows_do_not_claim_an_id() {
        let flagged = ParsedRow::flagged(2, RawRow::new(), vec!["dob is required".to_string()]);
        let partition = validate_inpatient(vec![flagged, clean(3, record("P1"))], today());

        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.errors[0].code, ErrorCode::ParseError);
    }

    #[test]
    fn test_business_rules_accumulate() {
        let mut bad = record("P1");
        bad.dob = date("1850-01-01");
        bad.admit_date = date("2024-08-01");
        bad.planned_discharge_date = Some(date("2024-07-01"));
        bad.sex = "X".to_string();

        let partition = validate_inpatient(vec![clean(2, bad)], today());
        assert!(partition.all_rejected());
        assert_eq!(partition.errors[0].messages.len(), 4);
    }

    #[test]
    fn test_admission_boundary_is_thirty_days() {
        let mut at_limit = record("P1");
        at_limit.admit_date = today() + chrono::Duration::days(30);
        let mut past_limit = record("P2");
        past_limit.admit_date = today() + chrono::Duration::days(31);

        let partition =
            validate_inpatient(vec![clean(2, at_limit), clean(3, past_limit)], today());
        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.errors[0].row_number, 3);
    }

    #[test]
    fn test_future_dob_is_rejected() {
        let mut unborn = record("P1");
        unborn.dob = date("2024-07-01");
        let partition = validate_inpatient(vec![clean(2, unborn)], today());
        assert!(partition.errors[0].message().contains("dob"));
    }

    #[test]
    fn test_pass_through_keeps_parser_verdict() {
        let rows = vec![
            ParsedRow::clean(2, RawRow::new(), "a"),
            ParsedRow::flagged(3, RawRow::new(), vec!["startTime is required".to_string()]),
        ];
        let partition = pass_through(rows);
        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.errors[0].code, ErrorCode::ParseError);
        assert_eq!(partition.total(), 2);
    }
}
