//! Status command - note counts by state and category

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use efiscal_core::Category;

use super::get_context;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Invoice Notes Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Notes", &status.total_notes.to_string()]);
    table.add_row(vec!["Treated", &status.treated.to_string()]);
    table.add_row(vec!["Untreated", &status.untreated.to_string()]);

    println!("{}", table);
    println!();

    println!("{}", "By Category".bold());
    for category in Category::ALL {
        println!(
            "  {:<18} {:<14} {}",
            category.as_str(),
            category.label().dimmed(),
            status.categories.get(category)
        );
    }

    if status.untreated > 0 {
        println!();
        println!("Run `efiscal categorize` to categorize pending notes.");
    }

    Ok(())
}
