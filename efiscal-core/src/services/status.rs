//! Status service - store-wide counts

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::ports::{CategoryCounts, NoteStore};

pub struct StatusService {
    store: Arc<dyn NoteStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    pub fn summary(&self) -> Result<StatusSummary> {
        let categories = self.store.category_counts()?;
        let untreated = self.store.count_untreated()?;
        let total_notes = categories.total();

        Ok(StatusSummary {
            total_notes,
            untreated,
            treated: total_notes - untreated,
            categories,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total_notes: i64,
    pub untreated: i64,
    pub treated: i64,
    /// Untreated notes count as standard until categorized
    pub categories: CategoryCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use crate::services::test_support::{note, MemoryStore};

    #[test]
    fn test_summary() {
        let mut treated = note("2", "M", "12345");
        treated.category = Category::Quality;
        treated.treated = true;
        let store = Arc::new(MemoryStore::with_notes(vec![note("1", "M", ""), treated]));

        let summary = StatusService::new(store).summary().unwrap();
        assert_eq!(summary.total_notes, 2);
        assert_eq!(summary.untreated, 1);
        assert_eq!(summary.treated, 1);
        assert_eq!(summary.categories.quality, 1);
        assert_eq!(summary.categories.standard, 1);
    }
}
