//! Upload service - spreadsheet to stored notes

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use super::dedup::filter_new;
use super::ingest::ingest;
use crate::config::Config;
use crate::domain::result::Error;
use crate::domain::{Note, RowDrop};
use crate::ports::NoteStore;

/// Accepted upload extension
const XLSX_EXTENSION: &str = "xlsx";

/// Outcome of one upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub file_name: String,
    /// Valid notes found in the sheet
    pub processed: usize,
    /// Notes not already stored (inserted unless previewing)
    pub new_records: usize,
    /// Notes whose key was already stored
    pub duplicates: usize,
    pub dropped_rows: usize,
    pub drops: Vec<RowDrop>,
    /// Keys repeated inside this sheet; all copies are kept
    pub in_batch_duplicate_keys: Vec<String>,
    pub preview: bool,
    /// The notes counted in `new_records`
    #[serde(skip)]
    pub new_notes: Vec<Note>,
}

pub struct UploadService {
    store: Arc<dyn NoteStore>,
    config: Config,
}

impl UploadService {
    pub fn new(store: Arc<dyn NoteStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Ingest an .xlsx buffer and store the notes not seen before
    ///
    /// With `preview` nothing is written.
    pub fn upload(&self, file_name: &str, bytes: &[u8], preview: bool) -> Result<UploadResult> {
        self.check_file(file_name, bytes)?;

        let report = ingest(bytes)?;
        if report.notes.is_empty() {
            return Err(Error::validation(format!(
                "no valid records found in {} ({} rows dropped)",
                file_name, report.rows_dropped
            ))
            .into());
        }

        let mut keys: Vec<String> = report.notes.iter().map(|n| n.dedup_key.clone()).collect();
        keys.sort();
        keys.dedup();
        let existing = self.store.existing_keys(&keys)?;

        let processed = report.notes.len();
        let new_notes = filter_new(report.notes, &existing);
        let duplicates = processed - new_notes.len();

        if !preview && !new_notes.is_empty() {
            self.store.insert_notes(&new_notes)?;
        }

        tracing::info!(
            file = file_name,
            processed,
            new = new_notes.len(),
            duplicates,
            preview,
            "upload processed"
        );

        Ok(UploadResult {
            file_name: file_name.to_string(),
            processed,
            new_records: new_notes.len(),
            duplicates,
            dropped_rows: report.rows_dropped,
            drops: report.drops,
            in_batch_duplicate_keys: report.duplicate_keys,
            preview,
            new_notes,
        })
    }

    fn check_file(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let is_xlsx = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(XLSX_EXTENSION));
        if !is_xlsx {
            return Err(Error::validation(format!("only .xlsx files are accepted: {}", file_name)).into());
        }

        if bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(Error::validation(format!(
                "{} is {} bytes; the limit is {} bytes",
                file_name,
                bytes.len(),
                self.config.max_upload_bytes
            ))
            .into());
        }

        Ok(())
    }
}
