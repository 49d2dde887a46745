//! Small text helpers shared by the search engine and the resolver.

use lazy_static::lazy_static;
use regex::Regex;

use crate::record::Record;
use crate::schema::TableSchema;

/// The apostrophe variants found (inconsistently) in the source data.
pub const APOSTROPHES: [char; 4] = ['\'', '\u{2018}', '\u{2019}', '\u{02BC}'];

/// Column names most likely to identify a row to a reader, best first.
pub const DISPLAY_PRIORITY: [&str; 15] = [
    "Term",
    "Name",
    "Full_Name",
    "Title",
    "Nickname",
    "Label",
    "Acronym",
    "Location_Name_Latin",
    "Location_Name_Colonial",
    "Name_English",
    "Author",
    "Role",
    "Translation",
    "Definition",
    "Description",
];

/// Columns holding free prose that makes for noisy matches.
pub const NOTES_FIELDS: [&str; 3] = ["Notes", "Description", "Comments"];

lazy_static! {
    static ref TAG_SEPARATOR: Regex = Regex::new(r"[,;|]").unwrap();
}

fn apostrophe_class() -> String {
    let mut class = String::from("[");
    for apostrophe in APOSTROPHES {
        class.push(apostrophe);
    }
    class.push(']');
    class
}

/// Turn free text into a literal pattern in which any apostrophe variant
/// matches any other.
pub fn normalize_pattern(term: &str) -> String {
    let class = apostrophe_class();
    let mut pattern = String::with_capacity(term.len() * 2);
    let mut literal = String::new();
    for c in term.trim().chars() {
        if APOSTROPHES.contains(&c) {
            pattern.push_str(&regex::escape(&literal));
            literal.clear();
            pattern.push_str(&class);
        } else {
            literal.push(c);
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

pub fn is_notes_field(name: &str) -> bool {
    NOTES_FIELDS.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// Pick the column to label a row with: the first populated column from
/// [`DISPLAY_PRIORITY`], then the first populated non-system text column.
pub fn display_column<'s>(schema: &'s TableSchema, record: &Record) -> Option<&'s str> {
    let present = |name: &str| record.text(name).is_some();
    DISPLAY_PRIORITY
        .iter()
        .filter_map(|name| schema.column(name))
        .filter(|c| !c.is_system())
        .map(|c| c.name.as_str())
        .find(|name| present(name))
        .or_else(|| {
            schema
                .text_columns()
                .map(|c| c.name.as_str())
                .find(|name| present(name))
        })
}

/// A row's label followed by up to three other populated fields.
pub fn describe(schema: &TableSchema, record: &Record, max: usize) -> (String, Vec<(String, String)>) {
    let uid = record.text(schema.primary_key()).unwrap_or_default();
    let label_column = display_column(schema, record);
    let label = label_column
        .and_then(|c| record.text(c))
        .map(|t| truncate(&t, max))
        .unwrap_or_else(|| format!("#{uid}"));
    let details = schema
        .columns
        .iter()
        .filter(|c| !c.is_system() && Some(c.name.as_str()) != label_column)
        .filter_map(|c| record.text(&c.name).map(|v| (c.name.clone(), truncate(&v, max))))
        .take(3)
        .collect();
    (label, details)
}

/// Split stored tag lists, trim, drop blanks and duplicates, and sort.
pub fn collect_tags<I, S>(stored: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for value in stored {
        for tag in TAG_SEPARATOR.split(value.as_ref()) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.to_string());
            }
        }
    }
    tags.sort_by_key(|t| t.to_lowercase());
    tags
}

/// Inputs that abandon the current operation.
pub fn is_cancel(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "q" | "quit" | "cancel"
    )
}
