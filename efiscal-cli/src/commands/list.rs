//! List command - browse stored notes

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use efiscal_core::{Category, NoteFilter};

use super::get_context;
use crate::output;

pub struct ListArgs {
    pub category: Option<String>,
    pub until: Option<NaiveDate>,
    pub text: Option<String>,
    pub treated: Option<bool>,
    pub limit: Option<usize>,
    pub offset: usize,
}

pub fn run(args: ListArgs, json: bool) -> Result<()> {
    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let ctx = get_context()?;
    let filter = NoteFilter {
        category,
        until: args.until,
        text: args.text.filter(|t| !t.trim().is_empty()),
        treated: args.treated,
        limit: args.limit.unwrap_or(ctx.config.list_limit),
        offset: args.offset,
    };
    let page = ctx.query_service.list(&filter)?;

    if json {
        return output::json(&page);
    }

    if page.notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Supply date",
        "Invoice",
        "Origin",
        "Material",
        "Qty",
        "Value",
        "Category",
        "Message",
    ]);
    for note in &page.notes {
        let category = if note.treated {
            note.category.to_string()
        } else {
            "untreated".dimmed().to_string()
        };
        table.add_row(vec![
            note.supply_date.format("%d/%m/%Y").to_string(),
            note.invoice_number.clone(),
            note.origin.clone(),
            note.material_code.clone(),
            note.quantity.normalize().to_string(),
            note.value.round_dp(2).to_string(),
            category,
            output::truncate(&note.message, 40),
        ]);
    }
    println!("{}", table);

    let shown_to = page.offset + page.notes.len();
    println!("Showing {}-{} of {}", page.offset + 1, shown_to, page.total);
    Ok(())
}
