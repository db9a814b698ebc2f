//! Categorization engine
//!
//! Classifies untreated notes by their invoice message:
//!
//! - notes whose message carries 5-digit ids are grouped by
//!   (invoice, origin) and become quality notes, with the ids spread one per
//!   note when the counts line up
//! - everything else is checked against the fiscal boilerplate for its
//!   supply reference: exact boilerplate is unidentified, extra clauses make
//!   a return, and an empty remainder is a standard shipment
//!
//! The engine is pure: it never mutates its input and never fails.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::domain::{CategorizationSummary, CategorizedNote, Category, Note};

/// Length of a claim id inside a message
const ID_LENGTH: usize = 5;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("static regex"));

/// Message clauses that carry no business meaning
static BOILERPLATE_CLAUSES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^Remessa:\s*[0-9]+$",
        r"^Sujeito a ICMS e Sub\.Trib\.$",
        r"^Isento ou não sujeito a ICMS$",
        r"^Outras Saídas$",
        r"^Outras Operações de Saída$",
        r"^Redução da base$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

const TAXED_CLAUSE: &str = "Sujeito a ICMS e Sub.Trib.";
const EXEMPT_CLAUSE: &str = "Isento ou não sujeito a ICMS";

/// Categorized notes plus their counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorizationResult {
    /// Id groups first (first-appearance order), then the remaining notes
    pub notes: Vec<CategorizedNote>,
    pub summary: CategorizationSummary,
}

/// Categorize a batch of untreated notes
pub fn categorize(notes: &[Note]) -> CategorizationResult {
    let mut group_index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<Vec<&Note>> = Vec::new();
    let mut plain: Vec<&Note> = Vec::new();

    for note in notes {
        if extract_ids(&note.message).is_empty() {
            plain.push(note);
            continue;
        }

        let key = (note.invoice_number.as_str(), note.origin.as_str());
        let slot = *group_index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(note);
    }

    let mut result = CategorizationResult {
        notes: Vec::with_capacity(notes.len()),
        summary: CategorizationSummary {
            processed: notes.len(),
            ..Default::default()
        },
    };

    for group in &groups {
        let (categorized, reorganized) = categorize_group(group);
        result.summary.reorganized += reorganized;
        result.notes.extend(categorized);
    }

    result
        .notes
        .extend(plain.into_iter().map(categorize_individual));

    for categorized in &result.notes {
        result.summary.record(categorized.new_category);
    }

    result
}

/// Categorize one (invoice, origin) group; returns the notes and how many
/// of them count as reorganized
fn categorize_group(group: &[&Note]) -> (Vec<CategorizedNote>, usize) {
    let Some(reference) = group.first() else {
        return (Vec::new(), 0);
    };
    let ids = extract_ids(&reference.message);

    if ids.is_empty() {
        let categorized = group.iter().map(|note| categorize_individual(note)).collect();
        return (categorized, 0);
    }

    if ids.len() == group.len() {
        let categorized: Vec<CategorizedNote> = group
            .iter()
            .zip(&ids)
            .map(|(note, id)| CategorizedNote::new(note, Category::Quality, id.as_str()))
            .collect();

        // Notes already holding their single id are not reorganized
        let reorganized = if categorized.iter().all(CategorizedNote::message_changed) {
            categorized.len()
        } else {
            0
        };
        return (categorized, reorganized);
    }

    let joined = ids.join("-");
    let categorized = group
        .iter()
        .map(|note| CategorizedNote::new(note, Category::Quality, joined.as_str()))
        .collect();
    (categorized, 0)
}

/// Categorize a note on its own message and supply reference
pub fn categorize_individual(note: &Note) -> CategorizedNote {
    if is_boilerplate(&note.message, &note.supply_reference) {
        return CategorizedNote::new(note, Category::Unidentified, note.message.as_str());
    }

    let clauses = meaningful_clauses(&note.message);
    if clauses.is_empty() {
        CategorizedNote::new(note, Category::Standard, note.message.as_str())
    } else {
        CategorizedNote::new(note, Category::Return, clauses.join("; "))
    }
}

/// Fiscal boilerplate printed on a plain shipment with this supply reference
pub fn boilerplate_message(supply_reference: &str) -> String {
    format!(
        "Remessa: 00{}; {}; Outras Saídas; Outras Operações de Saída;",
        supply_reference, TAXED_CLAUSE
    )
}

fn is_boilerplate(message: &str, supply_reference: &str) -> bool {
    let message = message.trim();
    let taxed = boilerplate_message(supply_reference);
    let exempt = taxed.replacen(TAXED_CLAUSE, EXEMPT_CLAUSE, 1);
    message == taxed || message == exempt
}

/// Message clauses (split on `;`) that are neither empty nor boilerplate
fn meaningful_clauses(message: &str) -> Vec<&str> {
    message
        .split(';')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .filter(|clause| !BOILERPLATE_CLAUSES.iter().any(|re| re.is_match(clause)))
        .collect()
}

/// Every standalone 5-digit id in `text`, deduplicated and sorted
///
/// A run of digits counts only when it is exactly five long and not touching
/// an ASCII letter, digit or underscore.
pub fn extract_ids(text: &str) -> Vec<String> {
    let ids: BTreeSet<&str> = DIGIT_RUN
        .find_iter(text)
        .filter(|m| m.len() == ID_LENGTH)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .map(|m| m.as_str())
        .collect();

    ids.into_iter().map(str::to_string).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
