//! Upload command - ingest an .xlsx export

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use efiscal_core::services::UploadResult;
use efiscal_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

/// Drops listed before the rest are summarized
const MAX_DROPS_SHOWN: usize = 10;

pub fn run(file: &Path, preview: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let result = read_and_upload(file, &file_name, preview);

    match &result {
        Ok(r) if !r.preview => log_event(
            &logger,
            LogEvent::new("upload_completed")
                .with_command("upload")
                .with_file_name(&file_name)
                .with_count(r.new_records),
        ),
        Ok(_) => {}
        Err(e) => log_event(
            &logger,
            LogEvent::new("upload_failed")
                .with_command("upload")
                .with_file_name(&file_name)
                .with_error(e.to_string())
                .with_error_details(format!("{:#}", e)),
        ),
    }

    let result = result?;
    if json {
        return output::json(&result);
    }
    print_result(&result);
    Ok(())
}

fn read_and_upload(file: &Path, file_name: &str, preview: bool) -> Result<UploadResult> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let ctx = get_context()?;
    ctx.upload_service.upload(file_name, &bytes, preview)
}

fn print_result(result: &UploadResult) {
    if result.preview {
        output::info(&format!("Preview of {} (nothing saved)", result.file_name));
    } else {
        output::success(&format!("Uploaded {}", result.file_name));
    }
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Valid rows", &result.processed.to_string()]);
    table.add_row(vec![
        if result.preview { "Would be stored" } else { "Stored" },
        &result.new_records.to_string(),
    ]);
    table.add_row(vec!["Already stored", &result.duplicates.to_string()]);
    table.add_row(vec!["Dropped rows", &result.dropped_rows.to_string()]);
    println!("{}", table);

    if !result.drops.is_empty() {
        println!();
        println!("{}", "Dropped rows".bold());
        for drop in result.drops.iter().take(MAX_DROPS_SHOWN) {
            println!("  line {}: {}", drop.line, drop.reason);
        }
        if result.drops.len() > MAX_DROPS_SHOWN {
            println!("  ... and {} more", result.drops.len() - MAX_DROPS_SHOWN);
        }
    }

    if !result.in_batch_duplicate_keys.is_empty() {
        println!();
        output::warning(&format!(
            "{} key(s) appear more than once in this file; every copy was kept",
            result.in_batch_duplicate_keys.len()
        ));
    }
}
