//! Interactive foreign-key resolution.
//!
//! Resolving walks a small state machine: search the referenced table,
//! disambiguate among the hits, and end either with an identifier or with
//! nothing selected. Searching again from the disambiguation step is always
//! possible; nothing carries over from one resolution to the next.

use rusqlite::{Connection, params};
use tracing::debug;

use crate::console::Console;
use crate::error::{EurasiaError, Result};
use crate::record::query_records;
use crate::schema::{self, TableSchema, quote_ident};
use crate::store::Store;
use crate::text::{describe, is_cancel, normalize_pattern};

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(i64),
    Skipped,
}

impl Resolution {
    pub fn id(self) -> Option<i64> {
        match self {
            Resolution::Resolved(id) => Some(id),
            Resolution::Skipped => None,
        }
    }
}

/// A row offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub uid: i64,
    pub label: String,
    pub details: Vec<(String, String)>,
}

enum State {
    Searching,
    Disambiguating(Vec<Candidate>),
    Done(Resolution),
}

/// Rows of `schema` whose text columns match `term`, literally and with
/// apostrophe variants treated as equal. `key` names the column whose
/// value identifies a candidate.
pub fn find_candidates(
    conn: &Connection,
    schema: &TableSchema,
    key: &str,
    term: &str,
    limit: usize,
    truncate_at: usize,
) -> Result<Vec<Candidate>> {
    let columns: Vec<String> = schema.text_columns().map(|c| quote_ident(&c.name)).collect();
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let predicate = columns
        .iter()
        .map(|c| format!("{c} regexp ?1"))
        .collect::<Vec<_>>()
        .join(" or ");
    let sql = format!(
        "select {} from {} where {} limit ?2",
        schema.projection(),
        quote_ident(&schema.name),
        predicate
    );
    let pattern = normalize_pattern(term);
    let records = query_records(conn, &sql, params![pattern, limit as i64])?;
    debug!(table = %schema.name, term, hits = records.len(), "candidate search");
    Ok(records
        .iter()
        .filter_map(|record| {
            let uid = record.integer(key)?;
            let (label, details) = describe(schema, record, truncate_at);
            Some(Candidate { uid, label, details })
        })
        .collect())
}

pub struct Resolver<'a, C: Console> {
    store: &'a Store,
    console: &'a mut C,
    limit: usize,
    truncate_at: usize,
}

impl<'a, C: Console> Resolver<'a, C> {
    pub fn new(store: &'a Store, console: &'a mut C, limit: usize) -> Self {
        Self {
            store,
            console,
            limit,
            truncate_at: 80,
        }
    }

    pub fn truncate_at(mut self, max: usize) -> Self {
        self.truncate_at = max;
        self
    }

    /// Pick the row `table.column` should point at.
    pub fn resolve(&mut self, table: &str, column: &str) -> Result<Resolution> {
        let (key, target) = self.store.with_connection(|conn| {
            let source = schema::table_schema(conn, table)?;
            let fk = source
                .foreign_key(column)
                .cloned()
                .ok_or_else(|| EurasiaError::NotForeignKey {
                    table: table.to_string(),
                    column: column.to_string(),
                })?;
            let target = schema::table_schema(conn, &fk.table)?;
            Ok((fk.to, target))
        })?;
        self.console
            .write_line(&format!("🔗 {table}.{column} → {}", target.name));
        self.run(&target, &key)
    }

    /// Pick any row of `table` by searching it.
    pub fn choose(&mut self, table: &str) -> Result<Resolution> {
        let target = self
            .store
            .with_connection(|conn| schema::table_schema(conn, table))?;
        let key = target.primary_key().to_string();
        self.run(&target, &key)
    }

    fn run(&mut self, target: &TableSchema, key: &str) -> Result<Resolution> {
        if target.text_columns().next().is_none() {
            self.console
                .write_line(&format!("⚠️ {} has no searchable text columns", target.name));
            return Ok(Resolution::Skipped);
        }
        let mut state = State::Searching;
        loop {
            state = match state {
                State::Searching => self.search(target, key)?,
                State::Disambiguating(candidates) => self.pick(candidates)?,
                State::Done(resolution) => return Ok(resolution),
            };
        }
    }

    fn search(&mut self, target: &TableSchema, key: &str) -> Result<State> {
        let prompt = format!("🔍 Search {} (Enter to skip): ", target.name);
        let term = match self.console.read_line(&prompt)? {
            Some(term) if !term.trim().is_empty() && !is_cancel(&term) => term,
            _ => return Ok(State::Done(Resolution::Skipped)),
        };
        let (limit, truncate_at) = (self.limit, self.truncate_at);
        let candidates = self.store.with_connection(|conn| {
            find_candidates(conn, target, key, &term, limit, truncate_at)
        })?;
        if !candidates.is_empty() {
            return Ok(State::Disambiguating(candidates));
        }
        self.console
            .write_line(&format!("❌ No matches for '{}' in {}", term.trim(), target.name));
        let retry = self.console.read_line("[r]etry or Enter to skip: ")?;
        Ok(
            match retry.as_deref().map(|a| a.trim().to_ascii_lowercase()).as_deref() {
                Some("r") | Some("retry") | Some("y") => State::Searching,
                _ => State::Done(Resolution::Skipped),
            },
        )
    }

    fn pick(&mut self, candidates: Vec<Candidate>) -> Result<State> {
        for (i, candidate) in candidates.iter().enumerate() {
            self.console
                .write_line(&format!("  {}. {} (#{})", i + 1, candidate.label, candidate.uid));
            if !candidate.details.is_empty() {
                let details: Vec<String> = candidate
                    .details
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect();
                self.console.write_line(&format!("       {}", details.join(" | ")));
            }
        }
        let answer = self
            .console
            .read_line("Number to select, 's' to search again, Enter to skip: ")?;
        let answer = match answer {
            Some(answer) => answer.trim().to_string(),
            None => return Ok(State::Done(Resolution::Skipped)),
        };
        if answer.is_empty() || is_cancel(&answer) {
            return Ok(State::Done(Resolution::Skipped));
        }
        if answer.eq_ignore_ascii_case("s") {
            return Ok(State::Searching);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => {
                let chosen = &candidates[n - 1];
                self.console
                    .write_line(&format!("✅ Selected {} (#{})", chosen.label, chosen.uid));
                Ok(State::Done(Resolution::Resolved(chosen.uid)))
            }
            _ => {
                self.console
                    .write_line(&format!("Please enter a number between 1 and {}", candidates.len()));
                Ok(State::Disambiguating(candidates))
            }
        }
    }
}
