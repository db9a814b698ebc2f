//! Note query service - filtered listings

use std::sync::Arc;

use anyhow::Result;

use crate::domain::result::Error;
use crate::ports::{NoteFilter, NotePage, NoteStore};

pub struct NoteQueryService {
    store: Arc<dyn NoteStore>,
}

impl NoteQueryService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// One page of notes matching `filter`, newest supply date first
    pub fn list(&self, filter: &NoteFilter) -> Result<NotePage> {
        if filter.limit == 0 {
            return Err(Error::validation("limit must be greater than zero").into());
        }
        Ok(self.store.list_notes(filter)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{note, MemoryStore};

    #[test]
    fn test_list_pages_through_store() {
        let store = Arc::new(MemoryStore::with_notes(vec![
            note("1", "M", "a"),
            note("2", "M", "b"),
            note("3", "M", "c"),
        ]));
        let service = NoteQueryService::new(store);

        let page = service
            .list(&NoteFilter {
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.notes.len(), 2);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let service = NoteQueryService::new(Arc::new(MemoryStore::default()));
        let filter = NoteFilter {
            limit: 0,
            ..Default::default()
        };
        assert!(service.list(&filter).is_err());
    }
}
