//! Per-kind document handling
//!
//! The coordinator is written once against [`DocumentHandler`]; each
//! [`DocumentKind`] supplies its own parser, validator and importer behind it.

use crate::adapters::database::IntakeSession;
use crate::adapters::spreadsheet::Sheet;
use crate::core::import::{upsert_appointments, upsert_patients};
use crate::core::ledger::UpsertStats;
use crate::core::parse::{parse_inpatient, parse_outpatient};
use crate::core::validate::{pass_through, validate_inpatient};
use crate::domain::{
    DocumentKind, ImportId, InpatientRecord, OutpatientRecord, ParseError, ParsedRow, Partition,
    Result, ValidRow,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Parse, validate and upsert for one document kind
#[async_trait]
pub trait DocumentHandler: Send + Sync {
    type Record: Send + Sync;

    fn kind(&self) -> DocumentKind;

    /// Structural failures (no header row, missing columns) fail the file
    fn parse(&self, sheet: &Sheet) -> std::result::Result<Vec<ParsedRow<Self::Record>>, ParseError>;

    fn validate(
        &self,
        rows: Vec<ParsedRow<Self::Record>>,
        today: NaiveDate,
    ) -> Partition<Self::Record>;

    async fn upsert(
        &self,
        session: &mut dyn IntakeSession,
        import_id: ImportId,
        rows: &[ValidRow<Self::Record>],
    ) -> Result<UpsertStats>;
}

/// Inpatient census
#[derive(Debug, Clone, Copy, Default)]
pub struct InpatientHandler;

#[async_trait]
impl DocumentHandler for InpatientHandler {
    type Record = InpatientRecord;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Inpatient
    }

    fn parse(&self, sheet: &Sheet) -> std::result::Result<Vec<ParsedRow<InpatientRecord>>, ParseError> {
        parse_inpatient(sheet)
    }

    fn validate(
        &self,
        rows: Vec<ParsedRow<InpatientRecord>>,
        today: NaiveDate,
    ) -> Partition<InpatientRecord> {
        validate_inpatient(rows, today)
    }

    async fn upsert(
        &self,
        session: &mut dyn IntakeSession,
        import_id: ImportId,
        rows: &[ValidRow<InpatientRecord>],
    ) -> Result<UpsertStats> {
        upsert_patients(session, import_id, rows).await
    }
}

/// Outpatient appointment list
///
/// No business-rule stage: the parser's verdict is the only gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutpatientHandler;

#[async_trait]
impl DocumentHandler for OutpatientHandler {
    type Record = OutpatientRecord;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Outpatient
    }

    fn parse(&self, sheet: &Sheet) -> std::result::Result<Vec<ParsedRow<OutpatientRecord>>, ParseError> {
        parse_outpatient(sheet)
    }

    fn validate(
        &self,
        rows: Vec<ParsedRow<OutpatientRecord>>,
        _today: NaiveDate,
    ) -> Partition<OutpatientRecord> {
        pass_through(rows)
    }

    async fn upsert(
        &self,
        session: &mut dyn IntakeSession,
        _import_id: ImportId,
        rows: &[ValidRow<OutpatientRecord>],
    ) -> Result<UpsertStats> {
        upsert_appointments(session, rows).await
    }
}
