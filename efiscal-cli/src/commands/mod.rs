//! CLI command implementations

pub mod categorize;
pub mod list;
pub mod logs;
pub mod status;
pub mod upload;

use std::path::PathBuf;

use anyhow::{Context, Result};
use efiscal_core::{EfiscalContext, EntryPoint, LogEvent, LoggingService};

/// Default data directory name under the home directory
const DATA_DIR_NAME: &str = ".efiscal";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "event log write failed");
        }
    }
}

/// Get the data directory from `EFISCAL_DIR` or `~/.efiscal`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("EFISCAL_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set EFISCAL_DIR")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Get or create the efiscal context
pub fn get_context() -> Result<EfiscalContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    EfiscalContext::new(&data_dir).context("Failed to initialize efiscal context")
}
