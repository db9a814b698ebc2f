//! Note store port - persistence abstraction for notes

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::{Category, Note};

/// Page size used when a filter does not set one
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Every storage call the services make
///
/// Implementations (adapters) provide the actual database access. Updates
/// are per record; nothing here is transactional across a batch.
pub trait NoteStore: Send + Sync {
    // === Ingestion ===

    /// Which of `keys` are already stored
    fn existing_keys(&self, keys: &[String]) -> Result<HashSet<String>>;

    /// Insert new notes, returning how many were written
    fn insert_notes(&self, notes: &[Note]) -> Result<usize>;

    // === Categorization ===

    /// Untreated notes ordered by invoice number, then material code
    fn untreated_notes(&self) -> Result<Vec<Note>>;

    fn count_untreated(&self) -> Result<i64>;

    /// Persist message, category and treated flag of one note
    fn apply_categorization(&self, note: &Note) -> Result<()>;

    // === Listing ===

    fn list_notes(&self, filter: &NoteFilter) -> Result<NotePage>;

    fn category_counts(&self) -> Result<CategoryCounts>;
}

/// Listing filter; unset fields do not restrict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFilter {
    pub category: Option<Category>,
    /// Supply date upper bound (inclusive)
    pub until: Option<NaiveDate>,
    /// Case-insensitive substring over the note's text fields
    pub text: Option<String>,
    pub treated: Option<bool>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for NoteFilter {
    fn default() -> Self {
        Self {
            category: None,
            until: None,
            text: None,
            treated: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl NoteFilter {
    /// Whether a note passes every set criterion (paging aside)
    pub fn matches(&self, note: &Note) -> bool {
        if self.category.is_some_and(|c| c != note.category) {
            return false;
        }
        if self.until.is_some_and(|d| note.supply_date > d) {
            return false;
        }
        if self.treated.is_some_and(|t| t != note.treated) {
            return false;
        }
        match self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => {
                let needle = text.to_lowercase();
                searchable_fields(note)
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Fields covered by the text filter
pub fn searchable_fields(note: &Note) -> [&str; 9] {
    [
        note.destination.as_str(),
        note.invoice_number.as_str(),
        note.origin.as_str(),
        note.origin_description.as_str(),
        note.material_code.as_str(),
        note.material_description.as_str(),
        note.order_number.as_str(),
        note.supply_reference.as_str(),
        note.message.as_str(),
    ]
}

/// One page of a listing plus the total number of matches
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
}

/// Stored notes per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub standard: i64,
    pub quality: i64,
    #[serde(rename = "return")]
    pub returned: i64,
    pub unidentified: i64,
}

impl CategoryCounts {
    pub fn add(&mut self, category: Category, count: i64) {
        match category {
            Category::Standard => self.standard += count,
            Category::Quality => self.quality += count,
            Category::Return => self.returned += count,
            Category::Unidentified => self.unidentified += count,
        }
    }

    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Standard => self.standard,
            Category::Quality => self.quality,
            Category::Return => self.returned,
            Category::Unidentified => self.unidentified,
        }
    }

    pub fn total(&self) -> i64 {
        self.standard + self.quality + self.returned + self.unidentified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn note() -> Note {
        let date = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let mut note = Note::new(
            Uuid::new_v4(),
            date,
            "4455",
            "L07",
            "MAT-3",
            date.and_hms_opt(9, 0, 0).unwrap(),
        );
        note.material_description = "Caixa Térmica".to_string();
        note
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let filter = NoteFilter::default();
        assert_eq!(filter.limit, DEFAULT_LIST_LIMIT);
        assert!(filter.matches(&note()));
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let filter = NoteFilter {
            text: Some("caixa térmica".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&note()));

        let filter = NoteFilter {
            text: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&note()));
    }

    #[test]
    fn test_until_is_inclusive() {
        let day = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let filter = NoteFilter {
            until: Some(day),
            ..Default::default()
        };
        assert!(filter.matches(&note()));

        let filter = NoteFilter {
            until: day.pred_opt(),
            ..Default::default()
        };
        assert!(!filter.matches(&note()));
    }

    #[test]
    fn test_category_and_treated() {
        let filter = NoteFilter {
            category: Some(Category::Quality),
            ..Default::default()
        };
        assert!(!filter.matches(&note()));

        let filter = NoteFilter {
            treated: Some(false),
            category: Some(Category::Standard),
            ..Default::default()
        };
        assert!(filter.matches(&note()));
    }

    #[test]
    fn test_category_counts() {
        let mut counts = CategoryCounts::default();
        counts.add(Category::Return, 2);
        counts.add(Category::Standard, 5);
        assert_eq!(counts.get(Category::Return), 2);
        assert_eq!(counts.total(), 7);
    }
}
