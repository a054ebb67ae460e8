//! Spreadsheet parsing
//!
//! One algorithm for both document kinds, parameterized by a [`Layout`]:
//!
//! 1. find the header row ([`header::detect_header`])
//! 2. check the required columns ([`header::require_fields`])
//! 3. read every data row below the header, skipping rows whose mapped cells
//!    are all blank, normalizing each mapped field through a [`RowReader`]
//!
//! Field problems never drop a row; they flag it so it reaches the audit
//! trail with its raw values.

pub mod header;
pub mod inpatient;
pub mod normalize;
pub mod outpatient;

use crate::adapters::spreadsheet::{Cell, Sheet};
use crate::domain::{ParseError, ParsedRow, RawRow};
use chrono::{NaiveDate, NaiveTime};
use header::{detect_header, require_fields, HeaderMap, HeaderTable};
use normalize::{parse_date, parse_time, Normalized};

pub use inpatient::parse_inpatient;
pub use outpatient::parse_outpatient;

/// Header spellings and required fields of one document kind
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub headers: &'static HeaderTable,
    pub required: &'static [&'static str],
}

static BLANK: Cell = Cell::Empty;

/// Reads the fields of one data row, collecting field errors
pub struct RowReader<'a> {
    sheet: &'a Sheet,
    header: &'a HeaderMap,
    row_number: u32,
    errors: Vec<String>,
}

impl<'a> RowReader<'a> {
    fn new(sheet: &'a Sheet, header: &'a HeaderMap, row_number: u32) -> Self {
        Self {
            sheet,
            header,
            row_number,
            errors: Vec::new(),
        }
    }

    /// Cell under a field's column; blank when the column is absent
    pub fn cell(&self, field: &str) -> &'a Cell {
        match self.header.column(field) {
            Some(col) => self.sheet.cell(self.row_number, col),
            None => &BLANK,
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn optional_text(&self, field: &str) -> Option<String> {
        normalize::text(self.cell(field))
    }

    pub fn required_text(&mut self, field: &str) -> Option<String> {
        let value = self.optional_text(field);
        if value.is_none() {
            self.error(format!("{field} is required"));
        }
        value
    }

    pub fn required_date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = parse_date(self.cell(field));
        self.required(field, value, "date")
    }

    /// Blank is fine; present but unparseable is a field error
    pub fn optional_date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = parse_date(self.cell(field));
        self.optional(field, value, "date")
    }

    pub fn required_time(&mut self, field: &str) -> Option<NaiveTime> {
        let value = parse_time(self.cell(field));
        self.required(field, value, "time")
    }

    pub fn optional_time(&mut self, field: &str) -> Option<NaiveTime> {
        let value = parse_time(self.cell(field));
        self.optional(field, value, "time")
    }

    fn required<T>(&mut self, field: &str, value: Normalized<T>, kind: &str) -> Option<T> {
        match value {
            Normalized::Value(v) => Some(v),
            Normalized::Blank => {
                self.error(format!("{field} is required"));
                None
            }
            Normalized::Invalid(raw) => {
                self.error(format!("{field} is not a valid {kind}: '{raw}'"));
                None
            }
        }
    }

    fn optional<T>(&mut self, field: &str, value: Normalized<T>, kind: &str) -> Option<T> {
        match value {
            Normalized::Invalid(raw) => {
                self.error(format!("{field} is not a valid {kind}: '{raw}'"));
                None
            }
            other => other.value(),
        }
    }

    fn raw(&self) -> RawRow {
        self.header
            .fields()
            .map(|(field, col)| (field.to_string(), self.sheet.cell(self.row_number, col).to_json()))
            .collect()
    }
}

/// Parses a sheet with a layout and a per-row builder
///
/// `build` reads fields through the [`RowReader`] and returns the record when
/// it could assemble one. A row is clean only when the builder produced a
/// record and recorded no error.
///
/// # Errors
///
/// Structural failures: no header row, or a required column missing.
pub fn parse_sheet<T, F>(
    sheet: &Sheet,
    layout: &Layout,
    build: F,
) -> Result<Vec<ParsedRow<T>>, ParseError>
where
    F: Fn(&mut RowReader<'_>) -> Option<T>,
{
    let header = detect_header(sheet, layout.headers)?;
    require_fields(&header, layout.required)?;

    tracing::debug!(
        header_row = header.row(),
        mapped_columns = header.len(),
        "Header row detected"
    );

    let mut rows = Vec::new();

    for row_number in (header.row() + 1)..=sheet.height() {
        if header.row_is_blank(sheet, row_number) {
            continue;
        }

        let mut reader = RowReader::new(sheet, &header, row_number);
        let record = build(&mut reader);
        let raw = reader.raw();

        let parsed = match (record, reader.errors) {
            (Some(record), errors) if errors.is_empty() => {
                ParsedRow::clean(row_number, raw, record)
            }
            (_, errors) if !errors.is_empty() => ParsedRow::flagged(row_number, raw, errors),
            _ => ParsedRow::flagged(row_number, raw, vec!["row could not be read".to_string()]),
        };
        rows.push(parsed);
    }

    Ok(rows)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::adapters::spreadsheet::{Cell, Sheet};

    /// Sheet from string rows; empty strings become empty cells
    pub fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|c| {
                            if c.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(c.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }
}
