//! Row-level types shared by parsers, validators and importers
//!
//! A parsed row keeps its sheet row number, the raw cell values it was
//! built from and either a clean typed record or the field errors that
//! prevented building one. Bookkeeping never lives inside the raw map.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Raw cell values of one row keyed by internal field name
pub type RawRow = BTreeMap<String, Value>;

/// Outcome of normalizing one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    /// Every field normalized; the typed record is ready for validation
    Clean(T),
    /// One or more field-level errors; the row goes to the audit trail
    Flagged(Vec<String>),
}

/// One data row produced by a parser
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow<T> {
    /// 1-based spreadsheet row number
    pub row_number: u32,
    pub raw: RawRow,
    pub outcome: RowOutcome<T>,
}

impl<T> ParsedRow<T> {
    pub fn clean(row_number: u32, raw: RawRow, record: T) -> Self {
        Self {
            row_number,
            raw,
            outcome: RowOutcome::Clean(record),
        }
    }

    pub fn flagged(row_number: u32, raw: RawRow, errors: Vec<String>) -> Self {
        Self {
            row_number,
            raw,
            outcome: RowOutcome::Flagged(errors),
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self.outcome, RowOutcome::Clean(_))
    }

    pub fn record(&self) -> Option<&T> {
        match &self.outcome {
            RowOutcome::Clean(record) => Some(record),
            RowOutcome::Flagged(_) => None,
        }
    }
}

/// Error code stored on each ImportError row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A field could not be normalized
    ParseError,
    /// A business rule rejected an otherwise well-formed row
    ValidationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row rejected by parsing or validation
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row_number: u32,
    pub code: ErrorCode,
    pub messages: Vec<String>,
    pub raw: RawRow,
}

impl RowError {
    /// Messages joined the way they are stored in `ImportError.message`
    pub fn message(&self) -> String {
        self.messages.join("; ")
    }
}

/// A row that passed validation and may be upserted
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRow<T> {
    pub row_number: u32,
    pub record: T,
}

/// Result of validating a file's rows
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    pub valid: Vec<ValidRow<T>>,
    pub errors: Vec<RowError>,
}

impl<T> Partition<T> {
    pub fn total(&self) -> usize {
        self.valid.len() + self.errors.len()
    }

    /// True when the file produced rows and every one of them was rejected
    pub fn all_rejected(&self) -> bool {
        self.valid.is_empty() && !self.errors.is_empty()
    }
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_error_joins_messages() {
        let err = RowError {
            row_number: 4,
            code: ErrorCode::ValidationError,
            messages: vec!["first".to_string(), "second".to_string()],
            raw: RawRow::new(),
        };
        assert_eq!(err.message(), "first; second");
    }

    #[test]
    fn test_partition_all_rejected() {
        let mut partition: Partition<()> = Partition::default();
        assert!(!partition.all_rejected());

        partition.errors.push(RowError {
            row_number: 2,
            code: ErrorCode::ParseError,
            messages: vec!["bad".to_string()],
            raw: RawRow::new(),
        });
        assert!(partition.all_rejected());

        partition.valid.push(ValidRow {
            row_number: 3,
            record: (),
        });
        assert!(!partition.all_rejected());
        assert_eq!(partition.total(), 2);
    }

    #[test]
    fn test_parsed_row_accessors() {
        let mut raw = RawRow::new();
        raw.insert("name".to_string(), json!("Kim"));

        let clean = ParsedRow::clean(2, raw.clone(), 7);
        assert!(clean.is_clean());
        assert_eq!(clean.record(), Some(&7));

        let flagged: ParsedRow<i32> = ParsedRow::flagged(3, raw, vec!["x".to_string()]);
        assert!(!flagged.is_clean());
        assert_eq!(flagged.record(), None);
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::ParseError.as_str(), "PARSE_ERROR");
        assert_eq!(ErrorCode::ValidationError.to_string(), "VALIDATION_ERROR");
    }
}
