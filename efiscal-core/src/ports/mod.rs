//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod note_store;

pub use note_store::{CategoryCounts, NoteFilter, NotePage, NoteStore, DEFAULT_LIST_LIMIT};
