//! Spreadsheet reading
//!
//! Loads the first visible worksheet of an `.xlsx`/`.xls` workbook into a dense
//! [`Sheet`] grid. Row numbers are kept 1-based and aligned with what a user
//! sees in Excel even when the used range does not start at `A1`, so error
//! records point at the right row.

use crate::domain::{IntakeError, ParseError, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader, SheetType, SheetVisible};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::path::Path;

/// One cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Formula error such as `#N/A`
    Error(String),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form; `None` when blank
    ///
    /// Integral floats render without a fractional part so numeric ids such
    /// as `10023.0` come back as `10023`.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format_float(*f),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Cell::Error(e) => e.clone(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// JSON form kept in the raw row payload
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Cell::Error(e) => Value::String(e.clone()),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(dt) => Cell::DateTime(dt),
                None => Cell::Text(data.to_string()),
            },
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(e.to_string()),
        }
    }
}

/// Dense grid of the first worksheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Builds a sheet whose first row is spreadsheet row 1
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Highest populated row number (0 for an empty sheet)
    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Cells of a 1-based row; empty slice past the end
    pub fn row(&self, row_number: u32) -> &[Cell] {
        row_number
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cell at a 1-based row and 0-based column
    pub fn cell(&self, row_number: u32, column: usize) -> &Cell {
        self.row(row_number).get(column).unwrap_or(&EMPTY)
    }
}

/// Reads the first visible worksheet of a workbook
///
/// `calamine` does not expose the workbook's active tab. Excel never lets a
/// hidden sheet be active, so the first visible worksheet is used; it is the
/// active one for every single-sheet export and for multi-sheet exports whose
/// active tab is the leftmost visible one. Hidden helper sheets and chart
/// sheets are skipped. A workbook whose sheets are all hidden falls back to
/// the sheet at index 0.
///
/// # Errors
///
/// [`ParseError::Unreadable`] when the file is not a readable workbook and
/// [`ParseError::EmptySheet`] when it has no worksheet at all.
pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IntakeError::Parse(ParseError::Unreadable(e.to_string())))?;

    let visible = workbook
        .sheets_metadata()
        .iter()
        .find(|s| s.visible == SheetVisible::Visible && s.typ == SheetType::WorkSheet)
        .map(|s| s.name.clone());

    let range = match visible {
        Some(name) => workbook.worksheet_range(&name).map_err(|e| e.to_string()),
        None => match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| e.to_string()),
            None => return Err(ParseError::EmptySheet.into()),
        },
    }
    .map_err(ParseError::Unreadable)?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Sheet::default());
    };

    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for source_row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(source_row.iter().map(Cell::from));
        rows.push(cells);
    }

    while rows.last().is_some_and(|r| r.iter().all(Cell::is_blank)) {
        rows.pop();
    }

    Ok(Sheet::from_rows(rows))
}
