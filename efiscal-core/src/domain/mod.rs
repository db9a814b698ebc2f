//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod categorization;
mod category;
mod note;
pub mod result;
pub mod sheet;

pub use categorization::{CategorizationSummary, CategorizedNote};
pub use category::Category;
pub use note::{dedup_key, Note, UPLOAD_TIMESTAMP_FORMAT};
pub use sheet::{CellValue, DropReason, RawLine, RowDrop, RowOutcome, SheetRow, SheetTable};
