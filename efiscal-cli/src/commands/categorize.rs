//! Categorize command - run the categorization engine

use anyhow::Result;
use colored::Colorize;
use efiscal_core::{CategorizationSummary, Category, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(check: bool, dry_run: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if check {
        let pending = ctx.categorization_service.pending()?;
        if json {
            return output::json(&pending);
        }
        if pending.has_untreated {
            output::info(&format!("{} note(s) waiting for categorization", pending.count));
        } else {
            output::success("Every note is categorized");
        }
        return Ok(());
    }

    if dry_run {
        let preview = ctx.categorization_service.preview()?;
        if json {
            return output::json(&preview);
        }
        output::info("Dry run (nothing saved)");
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Invoice", "Material", "Category", "Message"]);
        for item in &preview.notes {
            table.add_row(vec![
                item.note.invoice_number.clone(),
                item.note.material_code.clone(),
                item.new_category.to_string(),
                output::truncate(&item.new_message, 60),
            ]);
        }
        println!("{}", table);
        println!();
        print_summary(&preview.summary);
        return Ok(());
    }

    let logger = get_logger();
    let outcome = match ctx.categorization_service.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("categorization_failed")
                    .with_command("categorize")
                    .with_error(e.to_string()),
            );
            return Err(e);
        }
    };
    log_event(
        &logger,
        LogEvent::new("categorization_completed")
            .with_command("categorize")
            .with_count(outcome.updated),
    );

    if json {
        return output::json(&outcome);
    }

    if outcome.updated == 0 {
        output::success("Nothing to categorize");
        return Ok(());
    }

    output::success(&format!(
        "Categorized {} note(s) in {} ms",
        outcome.updated, outcome.elapsed_ms
    ));
    println!();
    print_summary(&outcome.summary);
    Ok(())
}

fn print_summary(summary: &CategorizationSummary) {
    let mut table = output::create_table();
    table.set_header(vec!["Category", "Notes"]);
    for category in Category::ALL {
        table.add_row(vec![category.label().to_string(), summary.count(category).to_string()]);
    }
    println!("{}", table);

    if summary.reorganized > 0 {
        println!(
            "{}",
            format!("{} quality note(s) reorganized to one id each", summary.reorganized).dimmed()
        );
    }
}
