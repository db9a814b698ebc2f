//! Categorization service - runs the engine over untreated notes

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use super::categorize::{categorize, CategorizationResult};
use crate::config::Config;
use crate::domain::result::Error;
use crate::domain::{CategorizationSummary, CategorizedNote, Note};
use crate::ports::NoteStore;

/// Outcome of one categorization run
#[derive(Debug, Clone, Serialize)]
pub struct CategorizationOutcome {
    pub summary: CategorizationSummary,
    /// Notes written back to the store
    pub updated: usize,
    pub elapsed_ms: u64,
}

/// Whether there is anything to categorize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingStatus {
    pub has_untreated: bool,
    pub count: i64,
}

pub struct CategorizationService {
    store: Arc<dyn NoteStore>,
    config: Config,
}

impl CategorizationService {
    pub fn new(store: Arc<dyn NoteStore>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn pending(&self) -> Result<PendingStatus> {
        let count = self.store.count_untreated()?;
        Ok(PendingStatus {
            has_untreated: count > 0,
            count,
        })
    }

    /// Categorize untreated notes without writing anything
    pub fn preview(&self) -> Result<CategorizationResult> {
        let notes = self.store.untreated_notes()?;
        Ok(categorize(&notes))
    }

    /// Categorize every untreated note and persist the results
    ///
    /// Updates go out in batches of `update_batch_size`. The first failed
    /// update stops the run; notes written before it stay written.
    pub fn run(&self) -> Result<CategorizationOutcome> {
        let started = Instant::now();
        let untreated = self.store.untreated_notes()?;

        if untreated.is_empty() {
            tracing::info!("no untreated notes");
            return Ok(CategorizationOutcome {
                summary: CategorizationSummary::default(),
                updated: 0,
                elapsed_ms: elapsed_ms(started),
            });
        }

        let CategorizationResult { notes, summary } = categorize(&untreated);
        let updates: Vec<Note> = notes.into_iter().map(CategorizedNote::apply).collect();
        let batch_size = self.config.update_batch_size.max(1);

        let mut updated = 0;
        for (index, batch) in updates.chunks(batch_size).enumerate() {
            for note in batch {
                self.store.apply_categorization(note).map_err(|e| {
                    tracing::error!(note = %note.id, error = %e, "update failed");
                    Error::database(format!("failed to update note {}: {}", note.id, e))
                })?;
                updated += 1;
            }
            tracing::debug!(batch = index + 1, updated, total = updates.len(), "batch written");
        }

        let outcome = CategorizationOutcome {
            summary,
            updated,
            elapsed_ms: elapsed_ms(started),
        };
        tracing::info!(
            processed = summary.processed,
            reorganized = summary.reorganized,
            elapsed_ms = outcome.elapsed_ms,
            "categorization finished"
        );

        Ok(outcome)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use crate::services::test_support::{note, MemoryStore};

    fn service(store: Arc<MemoryStore>, batch: usize) -> CategorizationService {
        CategorizationService::new(
            store,
            Config {
                update_batch_size: batch,
                ..Config::default()
            },
        )
    }

    #[test]
    fn test_run_marks_everything_treated() {
        let store = Arc::new(MemoryStore::with_notes(vec![
            note("1", "M1", "11111 22222"),
            note("1", "M2", "11111 22222"),
            note("2", "M1", "Produto avariado"),
            note("3", "M1", ""),
        ]));
        let service = service(store.clone(), 2);
        assert_eq!(service.pending().unwrap().count, 4);

        let outcome = service.run().unwrap();
        assert_eq!(outcome.updated, 4);
        assert_eq!(outcome.summary.processed, 4);
        assert_eq!(outcome.summary.quality, 2);
        assert_eq!(outcome.summary.returned, 1);
        assert_eq!(outcome.summary.standard, 1);
        assert_eq!(outcome.summary.reorganized, 2);

        let pending = service.pending().unwrap();
        assert!(!pending.has_untreated);
        assert_eq!(pending.count, 0);

        let stored = store.all();
        assert!(stored.iter().all(|n| n.treated));
        let quality: Vec<&str> = stored
            .iter()
            .filter(|n| n.category == Category::Quality)
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(quality, vec!["11111", "22222"]);
    }

    #[test]
    fn test_run_with_nothing_pending() {
        let store = Arc::new(MemoryStore::default());
        let outcome = service(store, 50).run().unwrap();
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.summary, CategorizationSummary::default());
    }

    #[test]
    fn test_failed_update_stops_the_run() {
        let notes = vec![note("1", "M", ""), note("2", "M", ""), note("3", "M", "")];
        let failing = notes[1].id;
        let mut store = MemoryStore::with_notes(notes);
        store.fail_update_of = Some(failing);
        let store = Arc::new(store);

        let err = service(store.clone(), 50).run().unwrap_err();
        assert!(err.to_string().contains(&failing.to_string()));

        let treated: Vec<bool> = store.all().iter().map(|n| n.treated).collect();
        assert_eq!(treated, vec![true, false, false]);
    }

    #[test]
    fn test_preview_writes_nothing() {
        let store = Arc::new(MemoryStore::with_notes(vec![note("1", "M", "Algo diferente")]));
        let result = service(store.clone(), 50).preview().unwrap();

        assert_eq!(result.notes[0].new_category, Category::Return);
        assert!(!store.all()[0].treated);
    }
}
