//! Header row detection
//!
//! Exports often carry a title block or print date above the column headers,
//! so the header row is found by content: the first of the top rows whose
//! cells name at least [`MIN_HEADER_MATCHES`] known fields.

use crate::adapters::spreadsheet::Sheet;
use crate::domain::ParseError;
use std::collections::BTreeMap;

/// Rows scanned for a header
pub const HEADER_SCAN_ROWS: u32 = 10;

/// Known header cells a row needs to count as the header
pub const MIN_HEADER_MATCHES: usize = 3;

/// Header spellings mapped to internal field names
pub type HeaderTable = [(&'static str, &'static str)];

/// Field name to 0-based column, for the detected header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    row: u32,
    columns: BTreeMap<&'static str, usize>,
}

impl HeaderMap {
    /// 1-based row number of the header
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.columns.iter().map(|(field, col)| (*field, *col))
    }

    /// True when every mapped cell of a row is blank
    pub fn row_is_blank(&self, sheet: &Sheet, row_number: u32) -> bool {
        self.columns
            .values()
            .all(|col| sheet.cell(row_number, *col).is_blank())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Field for a header cell; trimmed, case-insensitive
pub fn lookup(table: &HeaderTable, header: &str) -> Option<&'static str> {
    let needle = header.trim().to_lowercase();
    table
        .iter()
        .find(|(spelling, _)| spelling.to_lowercase() == needle)
        .map(|(_, field)| *field)
}

/// Finds the header row
///
/// When a field's header appears twice in the row, the leftmost column wins.
///
/// # Errors
///
/// [`ParseError::HeaderNotFound`] when none of the scanned rows qualifies.
pub fn detect_header(sheet: &Sheet, table: &HeaderTable) -> Result<HeaderMap, ParseError> {
    let last = sheet.height().min(HEADER_SCAN_ROWS);

    for row in 1..=last {
        let mut columns = BTreeMap::new();
        for (col, cell) in sheet.row(row).iter().enumerate() {
            if let Some(field) = cell.as_text().and_then(|text| lookup(table, &text)) {
                columns.entry(field).or_insert(col);
            }
        }
        if columns.len() >= MIN_HEADER_MATCHES {
            return Ok(HeaderMap { row, columns });
        }
    }

    Err(ParseError::HeaderNotFound {
        scanned_rows: last as usize,
    })
}

/// Checks that every required field has a column
///
/// # Errors
///
/// [`ParseError::MissingRequiredColumns`] listing the absent fields.
pub fn require_fields(header: &HeaderMap, required: &[&str]) -> Result<(), ParseError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| header.column(field).is_none())
        .map(|field| field.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ParseError::MissingRequiredColumns { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::spreadsheet::Cell;

    const TABLE: &HeaderTable = &[
        ("환자번호", "emrPatientId"),
        ("Patient ID", "emrPatientId"),
        ("환자명", "name"),
        ("생년월일", "dob"),
        ("성별", "sex"),
    ];

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(c.to_string())
                }
            })
            .collect()
    }

    #[test]
    fn test_lookup_is_trimmed_and_case_insensitive() {
        assert_eq!(lookup(TABLE, " patient id "), Some("emrPatientId"));
        assert_eq!(lookup(TABLE, "환자명"), Some("name"));
        assert_eq!(lookup(TABLE, "병동"), None);
    }

    #[test]
    fn test_header_below_title_block() {
        let sheet = Sheet::from_rows(vec![
            row(&["입원현황"]),
            row(&["출력일 2024-01-01", "", ""]),
            row(&["", "환자번호", "환자명", "생년월일"]),
            row(&["", "P1", "Kim", "1980-01-01"]),
        ]);
        let header = detect_header(&sheet, TABLE).unwrap();
        assert_eq!(header.row(), 3);
        assert_eq!(header.column("emrPatientId"), Some(1));
        assert!(header.row_is_blank(&sheet, 2));
        assert!(!header.row_is_blank(&sheet, 4));
        assert_eq!(header.len(), 3);
    }

    #[test]
    fn test_two_matches_do_not_qualify() {
        let sheet = Sheet::from_rows(vec![row(&["환자번호", "환자명", "비고"]), row(&["P1", "Kim", ""])]);
        assert_eq!(
            detect_header(&sheet, TABLE),
            Err(ParseError::HeaderNotFound { scanned_rows: 2 })
        );
    }

    #[test]
    fn test_header_past_scan_window_is_not_found() {
        let mut rows: Vec<Vec<Cell>> = (0..10).map(|_| row(&["note"])).collect();
        rows.push(row(&["환자번호", "환자명", "생년월일"]));
        let sheet = Sheet::from_rows(rows);
        assert_eq!(
            detect_header(&sheet, TABLE),
            Err(ParseError::HeaderNotFound { scanned_rows: 10 })
        );
    }

    #[test]
    fn test_first_duplicate_header_wins() {
        let sheet = Sheet::from_rows(vec![row(&["환자번호", "환자명", "Patient ID", "성별"])]);
        let header = detect_header(&sheet, TABLE).unwrap();
        assert_eq!(header.column("emrPatientId"), Some(0));
    }

    #[test]
    fn test_require_fields_lists_missing() {
        let sheet = Sheet::from_rows(vec![row(&["환자번호", "환자명", "성별"])]);
        let header = detect_header(&sheet, TABLE).unwrap();
        assert_eq!(
            require_fields(&header, &["emrPatientId", "dob", "admitDate"]),
            Err(ParseError::MissingRequiredColumns {
                missing: vec!["dob".to_string(), "admitDate".to_string()]
            })
        );
        assert!(require_fields(&header, &["name"]).is_ok());
    }
}
