//! In-memory `NoteStore` for service tests

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::sheet::REQUIRED_HEADERS;
use crate::domain::{CellValue, Note};
use crate::ports::{CategoryCounts, NoteFilter, NotePage, NoteStore};

#[derive(Default)]
pub struct MemoryStore {
    notes: Mutex<Vec<Note>>,
    /// Updates to this note fail
    pub fail_update_of: Option<Uuid>,
}

impl MemoryStore {
    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Mutex::new(notes),
            fail_update_of: None,
        }
    }

    pub fn all(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }
}

impl NoteStore for MemoryStore {
    fn existing_keys(&self, keys: &[String]) -> Result<HashSet<String>> {
        let notes = self.notes.lock().unwrap();
        Ok(notes
            .iter()
            .filter(|n| keys.contains(&n.dedup_key))
            .map(|n| n.dedup_key.clone())
            .collect())
    }

    fn insert_notes(&self, new: &[Note]) -> Result<usize> {
        self.notes.lock().unwrap().extend_from_slice(new);
        Ok(new.len())
    }

    fn untreated_notes(&self) -> Result<Vec<Note>> {
        let mut untreated: Vec<Note> = self.all().into_iter().filter(|n| !n.treated).collect();
        untreated.sort_by(|a, b| {
            (a.invoice_number.as_str(), a.material_code.as_str())
                .cmp(&(b.invoice_number.as_str(), b.material_code.as_str()))
        });
        Ok(untreated)
    }

    fn count_untreated(&self) -> Result<i64> {
        Ok(self.all().iter().filter(|n| !n.treated).count() as i64)
    }

    fn apply_categorization(&self, note: &Note) -> Result<()> {
        if self.fail_update_of == Some(note.id) {
            return Err(Error::database("simulated failure"));
        }
        let mut notes = self.notes.lock().unwrap();
        let stored = notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| Error::database("not found"))?;
        stored.message = note.message.clone();
        stored.category = note.category;
        stored.treated = note.treated;
        Ok(())
    }

    fn list_notes(&self, filter: &NoteFilter) -> Result<NotePage> {
        let mut matching: Vec<Note> = self.all().into_iter().filter(|n| filter.matches(n)).collect();
        matching.sort_by(|a, b| {
            b.supply_date
                .cmp(&a.supply_date)
                .then(b.uploaded_at.cmp(&a.uploaded_at))
        });
        let total = matching.len() as i64;
        Ok(NotePage {
            notes: matching.into_iter().skip(filter.offset).take(filter.limit).collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    fn category_counts(&self) -> Result<CategoryCounts> {
        let mut counts = CategoryCounts::default();
        for note in self.all() {
            counts.add(note.category, 1);
        }
        Ok(counts)
    }
}

/// Untreated note with the given grouping fields and message
pub fn note(invoice: &str, material: &str, message: &str) -> Note {
    let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    let mut note = Note::new(
        Uuid::new_v4(),
        date,
        invoice,
        "L01",
        material,
        date.and_hms_opt(8, 0, 0).unwrap(),
    );
    note.message = message.to_string();
    note
}

/// Header row with every required column
pub fn header_row() -> Vec<CellValue> {
    REQUIRED_HEADERS
        .iter()
        .map(|h| CellValue::from(*h))
        .collect()
}

/// Data row in header order; the supply date is the serial 45000 (2023-03-15)
pub fn data_row(invoice: &str, material: &str, message: &str) -> Vec<CellValue> {
    vec![
        CellValue::from("CD01"),
        CellValue::Number(45000.0),
        CellValue::from(invoice),
        CellValue::from("L042"),
        CellValue::from("Loja Centro"),
        CellValue::from(material),
        CellValue::from("Caixa"),
        CellValue::from("PED-1"),
        CellValue::from("2,5"),
        CellValue::from("UN"),
        CellValue::from("R$ 1.234,56"),
        CellValue::from("12345"),
        CellValue::from(message),
    ]
}

/// Build an .xlsx buffer with one sheet holding `rows`
pub fn workbook(rows: &[Vec<CellValue>]) -> Vec<u8> {
    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                CellValue::Text(s) => {
                    sheet.write_string(r as u32, c as u16, s.as_str()).unwrap();
                }
                CellValue::Number(n) => {
                    sheet.write_number(r as u32, c as u16, *n).unwrap();
                }
                CellValue::Empty => {}
            }
        }
    }
    book.save_to_buffer().unwrap()
}
