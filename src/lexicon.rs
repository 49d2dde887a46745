//! Creating a lexicon term together with its definitions.
//!
//! The term and every definition are collected first and then written in a
//! single transaction: either all of them are saved or none is.

use rusqlite::types::Value;

use crate::console::Console;
use crate::error::Result;
use crate::mutate::{Mutator, Outcome, insert_row};
use crate::record::render_value;
use crate::resolver::Resolution;
use crate::schema::{self, TableSchema};
use crate::text::{collect_tags, is_cancel, truncate};

/// Table and column names the composite flow writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconLayout {
    pub lexicon: String,
    pub definitions: String,
    /// Definition column pointing at the lexicon row.
    pub parent_column: String,
    pub definition: String,
    pub type_column: String,
    /// Foreign key to a searched source.
    pub source_column: String,
    /// Free-text source reference.
    pub source_note: String,
    pub specificity: String,
    pub sources: String,
}

impl Default for LexiconLayout {
    fn default() -> Self {
        Self {
            lexicon: "lexicon".to_string(),
            definitions: "definitions".to_string(),
            parent_column: "Lexicon_ID".to_string(),
            definition: "Definition".to_string(),
            type_column: "Definition_Type".to_string(),
            source_column: "Source_ID".to_string(),
            source_note: "Source_Note".to_string(),
            specificity: "Specificity".to_string(),
            sources: "bibliography".to_string(),
        }
    }
}

impl LexiconLayout {
    fn handles(&self, column: &str) -> bool {
        [
            &self.parent_column,
            &self.definition,
            &self.type_column,
            &self.source_column,
            &self.source_note,
            &self.specificity,
        ]
        .iter()
        .any(|c| c.eq_ignore_ascii_case(column))
    }
}

type Fields = Vec<(String, Value)>;

/// Distinct, non-blank values of a column in display order.
fn choices(values: Vec<Value>) -> Vec<String> {
    let mut choices: Vec<String> = values.iter().filter_map(render_value).collect();
    choices.sort_by_key(|c| c.to_lowercase());
    choices.dedup();
    choices
}

/// Turn a picker answer into tags: numbers pick from `known`, anything else
/// is taken as a new tag.
pub fn pick_tags(answer: &str, known: &[String]) -> Vec<String> {
    let mut picked: Vec<String> = Vec::new();
    for token in answer.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let tag = match token.parse::<usize>() {
            Ok(n) if (1..=known.len()).contains(&n) => known[n - 1].clone(),
            _ => token.to_string(),
        };
        if !picked.iter().any(|p| p.eq_ignore_ascii_case(&tag)) {
            picked.push(tag);
        }
    }
    picked
}

impl<'a, C: Console> Mutator<'a, C> {
    /// Create a lexicon entry and one or more definitions for it.
    pub fn new_lexicon_entry(&mut self, layout: &LexiconLayout) -> Result<Outcome> {
        let Some(lexicon) = self.select_table(Some(&layout.lexicon))? else {
            return Ok(Outcome::Cancelled);
        };
        let Some(definitions) = self.select_table(Some(&layout.definitions))? else {
            return Ok(Outcome::Cancelled);
        };
        self.console().write_line("📖 New lexicon entry (q to cancel)");
        let mut entry = Fields::new();
        for column in lexicon.editable_columns() {
            match self.collect_field(&lexicon, column)? {
                Some(value) => entry.push((column.name.clone(), value)),
                None => return Ok(self.abandon()),
            }
        }
        let mut drafts: Vec<Fields> = Vec::new();
        loop {
            self.console()
                .write_line(&format!("Definition {}:", drafts.len() + 1));
            match self.draft_definition(&definitions, layout)? {
                Some(draft) => drafts.push(draft),
                None => return Ok(self.abandon()),
            }
            if !self.console().confirm("Add another definition?")? {
                break;
            }
        }

        self.console().write_line("Preview:");
        for (column, value) in &entry {
            if let Some(shown) = render_value(value) {
                self.console().write_line(&format!("   {column}: {shown}"));
            }
        }
        for (i, draft) in drafts.iter().enumerate() {
            let summary: Vec<String> = draft
                .iter()
                .filter_map(|(c, v)| render_value(v).map(|v| format!("{c}: {}", truncate(&v, 60))))
                .collect();
            self.console()
                .write_line(&format!("   {}. {}", i + 1, summary.join(" | ")));
        }
        let question = format!("Save this entry with {} definition(s)?", drafts.len());
        if !self.console().confirm(&question)? {
            return Ok(self.abandon());
        }

        let parent = layout.parent_column.clone();
        let applied = self.store().with_connection(|conn| {
            let tx = conn.transaction()?;
            let uid = insert_row(&tx, &lexicon, &entry)?;
            for draft in &drafts {
                let mut values = draft.clone();
                values.push((parent.clone(), Value::Integer(uid)));
                insert_row(&tx, &definitions, &values)?;
            }
            // dropping the transaction before this point rolls everything back
            tx.commit()?;
            Ok(uid)
        });
        Ok(self.settle(&lexicon.name, applied))
    }

    fn abandon(&mut self) -> Outcome {
        self.console().write_line("Cancelled, nothing saved.");
        Outcome::Cancelled
    }

    fn draft_definition(&mut self, definitions: &TableSchema, layout: &LexiconLayout) -> Result<Option<Fields>> {
        let mut draft = Fields::new();

        let text = loop {
            match self.console().read_line(&format!("{}*: ", layout.definition))? {
                None => return Ok(None),
                Some(text) if is_cancel(&text) => return Ok(None),
                Some(text) if text.trim().is_empty() => {
                    self.console().write_line("⚠️ A definition needs some text");
                }
                Some(text) => break text.trim().to_string(),
            }
        };
        draft.push((layout.definition.clone(), Value::Text(text)));

        if definitions.has_column(&layout.type_column) {
            match self.pick_type(definitions, layout)? {
                Some(value) => draft.push((layout.type_column.clone(), value)),
                None => return Ok(None),
            }
        }

        match self.pick_source(definitions, layout)? {
            Some(Some(source)) => draft.push(source),
            Some(None) => {}
            None => return Ok(None),
        }

        if definitions.has_column(&layout.specificity) {
            match self.pick_specificity(definitions, layout)? {
                Some(value) => draft.push((layout.specificity.clone(), value)),
                None => return Ok(None),
            }
        }

        let others: Vec<_> = definitions
            .editable_columns()
            .filter(|c| !layout.handles(&c.name))
            .cloned()
            .collect();
        for column in &others {
            match self.collect_field(definitions, column)? {
                Some(value) => draft.push((column.name.clone(), value)),
                None => return Ok(None),
            }
        }
        Ok(Some(draft))
    }

    fn pick_type(&mut self, definitions: &TableSchema, layout: &LexiconLayout) -> Result<Option<Value>> {
        let known = choices(self.store().with_connection(|conn| {
            schema::unique_values(conn, &definitions.name, &layout.type_column)
        })?);
        for (i, kind) in known.iter().enumerate() {
            self.console().write_line(&format!("  {}. {}", i + 1, kind));
        }
        let answer = match self
            .console()
            .read_line("Type (number or new type, Enter for none): ")?
        {
            None => return Ok(None),
            Some(answer) if is_cancel(&answer) => return Ok(None),
            Some(answer) => answer.trim().to_string(),
        };
        Ok(Some(match answer.parse::<usize>() {
            _ if answer.is_empty() => Value::Null,
            Ok(n) if (1..=known.len()).contains(&n) => Value::Text(known[n - 1].clone()),
            _ => Value::Text(answer),
        }))
    }

    /// `Some(None)` when no source is given, `None` when cancelled.
    fn pick_source(
        &mut self,
        definitions: &TableSchema,
        layout: &LexiconLayout,
    ) -> Result<Option<Option<(String, Value)>>> {
        let searchable = definitions.foreign_key(&layout.source_column).is_some();
        let free_text = definitions.has_column(&layout.source_note);
        if !searchable && !free_text {
            return Ok(Some(None));
        }
        let prompt = match (searchable, free_text) {
            (true, true) => format!("Source ('s' to search {}, or free text, Enter for none): ", layout.sources),
            (true, false) => format!("Source ('s' to search {}, Enter for none): ", layout.sources),
            _ => "Source (free text, Enter for none): ".to_string(),
        };
        let answer = match self.console().read_line(&prompt)? {
            None => return Ok(None),
            Some(answer) if is_cancel(&answer) => return Ok(None),
            Some(answer) => answer.trim().to_string(),
        };
        if answer.is_empty() {
            return Ok(Some(None));
        }
        if searchable && answer.eq_ignore_ascii_case("s") {
            let resolution = self
                .resolver()
                .resolve(&definitions.name, &layout.source_column)?;
            return Ok(Some(match resolution {
                Resolution::Resolved(id) => Some((layout.source_column.clone(), Value::Integer(id))),
                Resolution::Skipped => None,
            }));
        }
        if free_text {
            return Ok(Some(Some((layout.source_note.clone(), Value::Text(answer)))));
        }
        Ok(Some(None))
    }

    fn pick_specificity(&mut self, definitions: &TableSchema, layout: &LexiconLayout) -> Result<Option<Value>> {
        let stored = choices(self.store().with_connection(|conn| {
            schema::unique_values(conn, &definitions.name, &layout.specificity)
        })?);
        let known = collect_tags(&stored);
        for (i, tag) in known.iter().enumerate() {
            self.console().write_line(&format!("  {}. {}", i + 1, tag));
        }
        let answer = match self
            .console()
            .read_line("Specificity (numbers and/or new tags, comma separated, Enter for none): ")?
        {
            None => return Ok(None),
            Some(answer) if is_cancel(&answer) => return Ok(None),
            Some(answer) => answer,
        };
        let tags = pick_tags(&answer, &known);
        Ok(Some(if tags.is_empty() {
            Value::Null
        } else {
            Value::Text(tags.join(", "))
        }))
    }
}
