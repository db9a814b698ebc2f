//! Spreadsheet ingestion - workbook bytes to normalized notes
//!
//! Reading (`read_workbook`) and the row transform (`ingest_table`) are kept
//! apart so the transform can run on hand-built tables with a fixed clock.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::normalize::{normalize_date, parse_money, parse_quantity};
use crate::domain::result::{Error, Result, StructureError};
use crate::domain::sheet::REQUIRED_HEADERS;
use crate::domain::{CellValue, DropReason, Note, RawLine, RowDrop, RowOutcome, SheetRow, SheetTable};

/// Outcome of ingesting one workbook
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Valid notes, in sheet order
    pub notes: Vec<Note>,
    /// Non-blank data lines seen
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub drops: Vec<RowDrop>,
    /// Keys that occur more than once among `notes` (each listed once)
    pub duplicate_keys: Vec<String>,
}

/// Ingest workbook bytes, stamping notes with the current UTC time
pub fn ingest(buffer: &[u8]) -> Result<IngestReport> {
    let table = read_workbook(buffer)?;
    let now = Utc::now().naive_utc();
    let uploaded_at = now.with_nanosecond(0).unwrap_or(now);
    ingest_table(&table, uploaded_at)
}

/// Ingest workbook bytes and keep only the valid notes
pub fn parse_workbook(buffer: &[u8]) -> Result<Vec<Note>> {
    ingest(buffer).map(|report| report.notes)
}

/// Read the first sheet of a workbook into a header row plus data lines
///
/// Fully blank lines are skipped. Line numbers are 1-based sheet rows.
pub fn read_workbook(buffer: &[u8]) -> Result<SheetTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer))
        .map_err(|e| Error::parse(format!("not a readable workbook: {}", e)))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| Error::parse(format!("failed to read first sheet: {}", e)))?,
        None => return Err(StructureError::MissingSheet.into()),
    };

    let first_row = match range.start() {
        Some((row, _)) => row as usize,
        None => return Err(StructureError::EmptySheet.into()),
    };

    let mut lines = range.rows().enumerate();
    let headers = match lines.next() {
        Some((_, cells)) => cells.iter().map(|c| cell_value(c).to_text()).collect(),
        None => return Err(StructureError::EmptySheet.into()),
    };

    let rows = lines
        .map(|(offset, cells)| RawLine {
            line: first_row + offset + 1,
            cells: cells.iter().map(cell_value).collect(),
        })
        .filter(|line| !line.is_blank())
        .collect();

    Ok(SheetTable { headers, rows })
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Transform an already-read sheet into notes
///
/// Fails on missing headers or a sheet without data lines; bad rows are
/// dropped and reported.
pub fn ingest_table(table: &SheetTable, uploaded_at: NaiveDateTime) -> Result<IngestReport> {
    let columns = ColumnIndex::resolve(&table.headers)?;

    if table.rows.is_empty() {
        return Err(Error::parse("sheet has a header row but no data rows"));
    }

    let mut report = IngestReport {
        rows_read: table.rows.len(),
        ..Default::default()
    };

    for raw in &table.rows {
        match columns.row(raw).validate(uploaded_at) {
            RowOutcome::Valid(note) => report.notes.push(*note),
            RowOutcome::Dropped(drop) => {
                tracing::debug!(line = drop.line, reason = %drop.reason, "dropping row");
                report.drops.push(drop);
            }
        }
    }

    report.rows_dropped = report.drops.len();
    report.duplicate_keys = repeated_keys(&report.notes);

    tracing::info!(
        rows = report.rows_read,
        valid = report.notes.len(),
        dropped = report.rows_dropped,
        repeated_keys = report.duplicate_keys.len(),
        "ingested sheet"
    );

    Ok(report)
}

fn repeated_keys(notes: &[Note]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut repeated = Vec::new();

    for note in notes {
        let count = seen.entry(note.dedup_key.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            repeated.push(note.dedup_key.clone());
        }
    }

    repeated
}

/// Position of every required column in the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: [usize; REQUIRED_HEADERS.len()],
}

impl ColumnIndex {
    /// Locate the required headers (trimmed, first occurrence wins)
    pub fn resolve(headers: &[String]) -> std::result::Result<Self, StructureError> {
        let mut positions = [0usize; REQUIRED_HEADERS.len()];
        let mut missing = Vec::new();

        for (slot, name) in REQUIRED_HEADERS.iter().enumerate() {
            match headers.iter().position(|h| h.trim() == *name) {
                Some(index) => positions[slot] = index,
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(StructureError::MissingHeaders(missing));
        }

        Ok(Self { positions })
    }

    fn cell(&self, raw: &RawLine, slot: usize) -> CellValue {
        raw.cells
            .get(self.positions[slot])
            .cloned()
            .unwrap_or(CellValue::Empty)
    }

    /// Map a raw line onto named fields (slots follow `REQUIRED_HEADERS`)
    pub fn row(&self, raw: &RawLine) -> SheetRow {
        SheetRow {
            line: raw.line,
            destination: self.cell(raw, 0),
            supply_date: self.cell(raw, 1),
            invoice_number: self.cell(raw, 2),
            origin: self.cell(raw, 3),
            origin_description: self.cell(raw, 4),
            material_code: self.cell(raw, 5),
            material_description: self.cell(raw, 6),
            order_number: self.cell(raw, 7),
            quantity: self.cell(raw, 8),
            unit: self.cell(raw, 9),
            value: self.cell(raw, 10),
            supply_reference: self.cell(raw, 11),
            message: self.cell(raw, 12),
        }
    }
}

impl SheetRow {
    /// Validate and normalize this row into a note
    pub fn validate(self, uploaded_at: NaiveDateTime) -> RowOutcome {
        let line = self.line;
        let dropped = |reason| RowOutcome::Dropped(RowDrop { line, reason });

        if let Some((column, _)) = self.mandatory_fields().into_iter().find(|(_, cell)| !cell.is_present()) {
            return dropped(DropReason::MissingField(column));
        }

        let Some(supply_date) = normalize_date(&self.supply_date) else {
            return dropped(DropReason::InvalidDate);
        };

        let mut note = Note::new(
            Uuid::new_v4(),
            supply_date,
            self.invoice_number.to_text(),
            self.origin.to_text(),
            self.material_code.to_text(),
            uploaded_at,
        );
        note.destination = self.destination.to_text();
        note.origin_description = self.origin_description.to_text();
        note.material_description = self.material_description.to_text();
        note.order_number = self.order_number.to_text();
        note.quantity = parse_quantity(&self.quantity);
        note.unit = self.unit.to_text();
        note.value = parse_money(&self.value);
        note.supply_reference = self.supply_reference.to_text();
        note.message = self.message.to_text();

        RowOutcome::Valid(Box::new(note))
    }
}
