//! DuckDB note store

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::types::Type;
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Category, Note, UPLOAD_TIMESTAMP_FORMAT};
use crate::migrations::MIGRATIONS;
use crate::ports::{CategoryCounts, NoteFilter, NotePage, NoteStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Keys per `IN (...)` lookup
const KEY_LOOKUP_CHUNK: usize = 500;

/// Column list shared by every note query, in `row_to_note` order
const NOTE_COLUMNS: &str = "id, destination, supply_date::VARCHAR, invoice_number, origin,
    origin_description, material_code, material_description, order_number,
    quantity, unit, value, supply_reference, message,
    uploaded_at::VARCHAR, dedup_key, treated, category";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed `NoteStore`
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the notes database at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;

        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) if is_retryable_error(&e.to_string()) && attempt + 1 < MAX_RETRIES => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "database busy, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// In-memory store, mostly for tests
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // No extension autoloading: cached extensions can fail code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("connection lock poisoned: {}", e)))
    }

    /// Apply pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure the schema is current
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "database migrated");
        }
        Ok(())
    }

    /// Database file, if not in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn query_notes(
        &self,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
    ) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let notes = stmt
            .query_map(params, row_to_note)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(notes)
    }
}

impl NoteStore for DuckDbRepository {
    fn existing_keys(&self, keys: &[String]) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut found = HashSet::new();

        for chunk in keys.chunks(KEY_LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT DISTINCT dedup_key FROM notes WHERE dedup_key IN ({})",
                placeholders
            );
            let param_refs: Vec<&dyn duckdb::ToSql> =
                chunk.iter().map(|k| k as &dyn duckdb::ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))?;
            for key in rows {
                found.insert(key?);
            }
        }

        Ok(found)
    }

    /// Insert all notes in one transaction; any failed row rolls back the batch
    fn insert_notes(&self, notes: &[Note]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notes (id, destination, supply_date, invoice_number, origin,
                                    origin_description, material_code, material_description,
                                    order_number, quantity, unit, value, supply_reference,
                                    message, uploaded_at, dedup_key, treated, category)
                 VALUES (?, ?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                         CAST(? AS TIMESTAMP), ?, ?, ?)",
            )?;

            for note in notes {
                inserted += stmt.execute(params![
                    note.id.to_string(),
                    note.destination,
                    note.supply_date.to_string(),
                    note.invoice_number,
                    note.origin,
                    note.origin_description,
                    note.material_code,
                    note.material_description,
                    note.order_number,
                    note.quantity.to_string(),
                    note.unit,
                    note.value.to_string(),
                    note.supply_reference,
                    note.message,
                    note.uploaded_at_string(),
                    note.dedup_key,
                    note.treated,
                    note.category.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn untreated_notes(&self) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE treated = FALSE ORDER BY invoice_number, material_code",
            NOTE_COLUMNS
        );
        self.query_notes(&sql, &[])
    }

    fn count_untreated(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE treated = FALSE",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn apply_categorization(&self, note: &Note) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notes
             SET message = ?, category = ?, treated = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            params![
                note.message,
                note.category.as_str(),
                note.treated,
                note.id.to_string()
            ],
        )?;

        if updated == 0 {
            return Err(Error::database(format!("note {} not found", note.id)));
        }
        Ok(())
    }

    fn list_notes(&self, filter: &NoteFilter) -> Result<NotePage> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn duckdb::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            conditions.push("category = ?".to_string());
            params.push(Box::new(category.as_str().to_string()));
        }
        if let Some(until) = filter.until {
            conditions.push("supply_date <= CAST(? AS DATE)".to_string());
            params.push(Box::new(until.to_string()));
        }
        if let Some(treated) = filter.treated {
            conditions.push("treated = ?".to_string());
            params.push(Box::new(treated));
        }
        if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(text));
            let ors: Vec<String> = TEXT_SEARCH_COLUMNS
                .iter()
                .map(|column| format!("{} ILIKE ? ESCAPE '\\'", column))
                .collect();
            conditions.push(format!("({})", ors.join(" OR ")));
            for _ in TEXT_SEARCH_COLUMNS {
                params.push(Box::new(pattern.clone()));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let param_refs: Vec<&dyn duckdb::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let total: i64 = {
            let conn = self.conn()?;
            conn.query_row(
                &format!("SELECT COUNT(*) FROM notes {}", where_clause),
                param_refs.as_slice(),
                |row| row.get(0),
            )?
        };

        let sql = format!(
            "SELECT {} FROM notes {}
             ORDER BY supply_date DESC, uploaded_at DESC, invoice_number, material_code
             LIMIT {} OFFSET {}",
            NOTE_COLUMNS, where_clause, filter.limit, filter.offset
        );
        let notes = self.query_notes(&sql, param_refs.as_slice())?;

        Ok(NotePage {
            notes,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    fn category_counts(&self) -> Result<CategoryCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM notes GROUP BY category")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;

        let mut counts = CategoryCounts::default();
        for (code, count) in rows {
            counts.add(Category::from_str(&code)?, count);
        }
        Ok(counts)
    }
}

/// Columns matched by the listing text search
const TEXT_SEARCH_COLUMNS: [&str; 9] = [
    "destination",
    "invoice_number",
    "origin",
    "origin_description",
    "material_code",
    "material_description",
    "order_number",
    "supply_reference",
    "message",
];

/// Escape LIKE wildcards so the search text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn row_to_note(row: &duckdb::Row) -> duckdb::Result<Note> {
    // Columns as in NOTE_COLUMNS
    let id: String = row.get(0)?;
    let supply_date: String = row.get(2)?;
    let quantity: String = row.get(9)?;
    let value: String = row.get(11)?;
    let uploaded_at: String = row.get(14)?;
    let category: String = row.get(17)?;

    Ok(Note {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        destination: row.get(1)?,
        supply_date: NaiveDate::parse_from_str(&supply_date, "%Y-%m-%d")
            .map_err(|e| conversion_error(2, e))?,
        invoice_number: row.get(3)?,
        origin: row.get(4)?,
        origin_description: row.get(5)?,
        material_code: row.get(6)?,
        material_description: row.get(7)?,
        order_number: row.get(8)?,
        quantity: parse_decimal(&quantity).map_err(|e| conversion_error(9, e))?,
        unit: row.get(10)?,
        value: parse_decimal(&value).map_err(|e| conversion_error(11, e))?,
        supply_reference: row.get(12)?,
        message: row.get(13)?,
        uploaded_at: parse_timestamp(&uploaded_at).map_err(|e| conversion_error(14, e))?,
        dedup_key: row.get(15)?,
        treated: row.get(16)?,
        category: Category::from_str(&category).map_err(|e| conversion_error(17, e))?,
    })
}

fn parse_decimal(s: &str) -> std::result::Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s)
}

fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, UPLOAD_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
}
