//! Categorization results

use serde::{Deserialize, Serialize};

use super::{Category, Note};

/// A note paired with the category and message computed for it
///
/// The wrapped note is left untouched; `apply` produces the updated record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedNote {
    pub note: Note,
    pub new_category: Category,
    pub new_message: String,
}

impl CategorizedNote {
    pub fn new(note: &Note, new_category: Category, new_message: impl Into<String>) -> Self {
        Self {
            note: note.clone(),
            new_category,
            new_message: new_message.into(),
        }
    }

    /// Whether the computed message differs from the stored one
    pub fn message_changed(&self) -> bool {
        self.new_message != self.note.message
    }

    /// Final record: new category and message, marked as treated
    pub fn apply(self) -> Note {
        let mut note = self.note;
        note.category = self.new_category;
        note.message = self.new_message;
        note.treated = true;
        note
    }
}

/// Counts produced by one categorization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizationSummary {
    pub processed: usize,
    pub standard: usize,
    pub quality: usize,
    #[serde(rename = "return")]
    pub returned: usize,
    pub unidentified: usize,
    /// Notes rewritten under the one-id-per-note rule
    pub reorganized: usize,
}

impl CategorizationSummary {
    /// Tally one categorized note
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Standard => self.standard += 1,
            Category::Quality => self.quality += 1,
            Category::Return => self.returned += 1,
            Category::Unidentified => self.unidentified += 1,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Standard => self.standard,
            Category::Quality => self.quality,
            Category::Return => self.returned,
            Category::Unidentified => self.unidentified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn note(message: &str) -> Note {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut note = Note::new(
            Uuid::new_v4(),
            date,
            "1001",
            "L01",
            "M01",
            date.and_hms_opt(9, 0, 0).unwrap(),
        );
        note.message = message.to_string();
        note
    }

    #[test]
    fn test_apply_marks_treated_without_touching_input() {
        let original = note("Remessa: 0055; 12345");
        let categorized = CategorizedNote::new(&original, Category::Quality, "12345");
        assert!(categorized.message_changed());

        let applied = categorized.apply();
        assert!(applied.treated);
        assert_eq!(applied.category, Category::Quality);
        assert_eq!(applied.message, "12345");
        assert_eq!(applied.id, original.id);

        assert!(!original.treated);
        assert_eq!(original.message, "Remessa: 0055; 12345");
    }

    #[test]
    fn test_summary_record() {
        let mut summary = CategorizationSummary::default();
        summary.record(Category::Quality);
        summary.record(Category::Quality);
        summary.record(Category::Return);

        assert_eq!(summary.count(Category::Quality), 2);
        assert_eq!(summary.count(Category::Return), 1);
        assert_eq!(summary.count(Category::Standard), 0);

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["return"], 1);
    }
}
