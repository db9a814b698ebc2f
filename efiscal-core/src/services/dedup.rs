//! Deduplication gate

use std::collections::HashSet;

use crate::domain::Note;

/// Keep the notes whose dedup key is not already stored, in input order
///
/// Notes sharing a key inside the same batch are not filtered against each
/// other.
pub fn filter_new(notes: Vec<Note>, existing_keys: &HashSet<String>) -> Vec<Note> {
    notes
        .into_iter()
        .filter(|note| !existing_keys.contains(&note.dedup_key))
        .collect()
}
