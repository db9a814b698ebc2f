//! efiscal Core - Invoice note ingestion and categorization
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Note, Category, sheet rows)
//! - **ports**: Trait definitions for external dependencies (NoteStore)
//! - **services**: Business logic orchestration (upload, categorization, queries)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::NoteStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{CategorizationSummary, Category, Note};
pub use domain::result::{Error, StructureError};
pub use ports::{CategoryCounts, NoteFilter, NotePage};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Database file inside the data directory
pub const DB_FILE: &str = "efiscal.duckdb";

/// Main context for efiscal operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct EfiscalContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub upload_service: UploadService,
    pub categorization_service: CategorizationService,
    pub query_service: NoteQueryService,
    pub status_service: StatusService,
}

impl EfiscalContext {
    /// Create a new context over the data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DB_FILE);
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);

        // Initialize schema
        repository.ensure_schema()?;

        let store: Arc<dyn NoteStore> = repository.clone();
        let upload_service = UploadService::new(Arc::clone(&store), config.clone());
        let categorization_service = CategorizationService::new(Arc::clone(&store), config.clone());
        let query_service = NoteQueryService::new(Arc::clone(&store));
        let status_service = StatusService::new(store);

        Ok(Self {
            config,
            repository,
            upload_service,
            categorization_service,
            query_service,
            status_service,
        })
    }

    /// Filter using the configured default page size
    pub fn default_filter(&self) -> NoteFilter {
        NoteFilter {
            limit: self.config.list_limit,
            ..Default::default()
        }
    }
}
