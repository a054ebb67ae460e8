//! Field normalization
//!
//! Turns raw cells into typed values. Exported workbooks mix native date
//! cells, text dates in several layouts and numbers that lost their leading
//! zeros, so every rule accepts all of those forms.

use crate::adapters::spreadsheet::Cell;
use crate::domain::AppointmentStatus;
use chrono::{NaiveDate, NaiveTime};

/// Text date layouts tried in order
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

/// Text time layouts tried in order
pub const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%H%M"];

/// Result of normalizing one optional or required cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized<T> {
    /// Empty cell or whitespace
    Blank,
    Value(T),
    /// Present but not in any accepted form; carries the raw text
    Invalid(String),
}

impl<T> Normalized<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Normalized::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Trimmed text, `None` when blank
pub fn text(cell: &Cell) -> Option<String> {
    cell.as_text()
}

pub fn parse_date(cell: &Cell) -> Normalized<NaiveDate> {
    if let Cell::DateTime(dt) = cell {
        return Normalized::Value(dt.date());
    }
    let Some(raw) = cell.as_text() else {
        return Normalized::Blank;
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok())
        .map(Normalized::Value)
        .unwrap_or(Normalized::Invalid(raw))
}

pub fn parse_time(cell: &Cell) -> Normalized<NaiveTime> {
    if let Cell::DateTime(dt) = cell {
        return Normalized::Value(dt.time());
    }
    let Some(raw) = cell.as_text() else {
        return Normalized::Blank;
    };
    // 930 stored as a number means 09:30
    let candidate = if raw.len() == 3 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("0{raw}")
    } else {
        raw.clone()
    };
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&candidate, fmt).ok())
        .map(Normalized::Value)
        .unwrap_or(Normalized::Invalid(raw))
}

/// Maps sex synonyms to `M`/`F`; anything else passes through trimmed
pub fn normalize_sex(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "m" | "male" | "남" | "남자" => "M".to_string(),
        "f" | "female" | "여" | "여자" => "F".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Maps status synonyms to the canonical status, defaulting to `BOOKED`
pub fn normalize_status(raw: Option<&str>) -> AppointmentStatus {
    let Some(raw) = raw else {
        return AppointmentStatus::Booked;
    };
    match raw.trim().to_uppercase().as_str() {
        "예약" | "BOOKED" => AppointmentStatus::Booked,
        "접수" | "CHECKED_IN" => AppointmentStatus::CheckedIn,
        "완료" | "COMPLETED" => AppointmentStatus::Completed,
        "취소" | "CANCELLED" => AppointmentStatus::Cancelled,
        "미방문" | "NO_SHOW" => AppointmentStatus::NoShow,
        "변경" | "CHANGED" => AppointmentStatus::Changed,
        _ => AppointmentStatus::Booked,
    }
}

/// Strips hyphens; `None` when nothing is left
pub fn normalize_phone(raw: &str) -> Option<String> {
    let phone: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if phone.is_empty() {
        None
    } else {
        Some(phone)
    }
}
