//! Service layer - business logic orchestration
//!
//! The pure pipeline (`normalize`, `ingest`, `dedup`, `categorize`) never
//! touches storage. The services around it wire the pipeline to a
//! `NoteStore`.

pub mod categorize;
mod categorization;
pub mod dedup;
pub mod ingest;
pub mod logging;
pub mod migration;
pub mod normalize;
mod query;
mod status;
mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use categorization::{CategorizationOutcome, CategorizationService, PendingStatus};
pub use categorize::{categorize, extract_ids, CategorizationResult};
pub use dedup::filter_new;
pub use ingest::{ingest, ingest_table, parse_workbook, read_workbook, ColumnIndex, IngestReport};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use query::NoteQueryService;
pub use status::{StatusService, StatusSummary};
pub use upload::{UploadResult, UploadService};
