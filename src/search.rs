//! Configuration-driven search across one or more tables.
//!
//! A search runs in two passes. The first only counts matches, leaving the
//! notes-like prose columns out; when that finds very little the caller is
//! offered one rerun with those columns included. The second pass fetches a
//! bounded number of rows per table and annotates each with its resolved
//! foreign keys, its related rows through junction tables and its nested
//! child rows.
//!
//! Annotation lookups are best effort: a failing lookup only drops that
//! annotation. A failing table query marks that table as failed and the
//! remaining tables are still searched.

use std::fmt;

use rusqlite::types::Value;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::catalog::{Nested, NestedKind, Reference, Relationship, SearchCatalog, SearchConfig};
use crate::console::Console;
use crate::error::{EurasiaError, Result};
use crate::record::{Record, query_records, render_value};
use crate::schema::{self, TableSchema, quote_ident};
use crate::settings::Settings;
use crate::store::Store;
use crate::text::{display_column, truncate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tables {
    All,
    Named(Vec<String>),
}

impl Tables {
    pub fn one(table: &str) -> Self {
        Tables::Named(vec![table.to_string()])
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub pattern: String,
    pub tables: Tables,
    pub max_results: usize,
    /// Search notes fields from the start, without asking.
    pub include_notes: bool,
}

impl SearchRequest {
    pub fn new(pattern: &str, tables: Tables) -> Self {
        Self {
            pattern: pattern.to_string(),
            tables,
            max_results: 25,
            include_notes: false,
        }
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn include_notes(mut self, include: bool) -> Self {
        self.include_notes = include;
        self
    }
}

/// Fixed bounds applied by the engine.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub notes_threshold: usize,
    pub relation_limit: usize,
    pub truncate_at: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            notes_threshold: 5,
            relation_limit: 10,
            truncate_at: 120,
        }
    }
}

impl From<&Settings> for Limits {
    fn from(settings: &Settings) -> Self {
        Self {
            notes_threshold: settings.notes_threshold,
            relation_limit: settings.relation_limit,
            truncate_at: settings.truncate_at,
        }
    }
}

/// A labelled list of values attached to a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub label: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub uid: Option<i64>,
    pub primary: String,
    pub secondary: Vec<(String, String)>,
    /// Foreign key column and the label of the row it points at.
    pub references: Vec<(String, String)>,
    pub related: Vec<Annotation>,
    pub nested: Option<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResult {
    pub table: String,
    pub label: String,
    pub auto_detected: bool,
    pub total: usize,
    pub hits: Vec<Hit>,
    pub error: Option<String>,
}

impl TableResult {
    fn failed(table: &str, error: String) -> Self {
        Self {
            table: table.to_string(),
            label: format!("📄 {table}"),
            auto_detected: false,
            total: 0,
            hits: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub pattern: String,
    pub notes_included: bool,
    pub tables: Vec<TableResult>,
}

impl SearchReport {
    /// Matches found, whether displayed or not.
    pub fn total_matches(&self) -> usize {
        self.tables.iter().map(|t| t.total).sum()
    }

    pub fn total_displayed(&self) -> usize {
        self.tables.iter().map(|t| t.hits.len()).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableResult> {
        self.tables.iter().find(|t| t.table == name)
    }
}

struct Plan {
    schema: TableSchema,
    config: SearchConfig,
}

impl Plan {
    fn fields(&self, include_notes: bool) -> Vec<String> {
        self.config
            .active_search_fields(include_notes)
            .into_iter()
            .filter_map(|f| self.schema.column(f))
            .map(|c| c.name.clone())
            .collect()
    }

    fn has_notes(&self) -> bool {
        self.config
            .notes_fields
            .iter()
            .any(|f| self.schema.has_column(f))
    }

    fn predicate(&self, include_notes: bool) -> Option<String> {
        let fields = self.fields(include_notes);
        if fields.is_empty() {
            return None;
        }
        Some(
            fields
                .iter()
                .map(|f| format!("{} regexp ?1", quote_ident(f)))
                .collect::<Vec<_>>()
                .join(" or "),
        )
    }

    fn count(&self, conn: &Connection, pattern: &str, include_notes: bool) -> Result<usize> {
        let Some(predicate) = self.predicate(include_notes) else {
            return Ok(0);
        };
        let sql = format!(
            "select count(*) from {} where {}",
            quote_ident(&self.schema.name),
            predicate
        );
        let count: i64 = conn.query_row(&sql, params![pattern], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn fetch(&self, conn: &Connection, pattern: &str, include_notes: bool, max: usize) -> Result<Vec<Record>> {
        let Some(predicate) = self.predicate(include_notes) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "select {} from {} where {} order by {} limit ?2",
            self.schema.projection(),
            quote_ident(&self.schema.name),
            predicate,
            quote_ident(self.schema.primary_key())
        );
        query_records(conn, &sql, params![pattern, max as i64])
    }
}

pub struct SearchEngine<'a> {
    store: &'a Store,
    catalog: &'a SearchCatalog,
    limits: Limits,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a Store, catalog: &'a SearchCatalog) -> Self {
        Self {
            store,
            catalog,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn search<C: Console>(&self, request: &SearchRequest, console: &mut C) -> Result<SearchReport> {
        let pattern = request.pattern.trim();
        if pattern.is_empty() {
            return Err(EurasiaError::Pattern("empty search pattern".to_string()));
        }
        // reject a broken pattern before any table is scanned
        self.store.case().compile(pattern)?;
        self.store.with_connection(|conn| {
            let conn: &Connection = conn;
            let names = match &request.tables {
                Tables::All => schema::list_tables(conn)?,
                Tables::Named(names) => names.clone(),
            };
            let plans: Vec<(String, std::result::Result<Plan, String>)> = names
                .into_iter()
                .map(|name| {
                    let plan = schema::table_schema(conn, &name)
                        .map(|schema| Plan {
                            config: self.catalog.config_for(&schema),
                            schema,
                        })
                        .map_err(|e| e.to_string());
                    (name, plan)
                })
                .collect();

            let mut include_notes = request.include_notes;
            let mut counts = count_all(conn, &plans, pattern, include_notes);
            let found: usize = counts.iter().filter_map(|c| c.as_ref().ok()).sum();
            info!(pattern, found, include_notes, "first pass");
            let has_notes = plans
                .iter()
                .any(|(_, plan)| plan.as_ref().is_ok_and(Plan::has_notes));
            if !include_notes && found < self.limits.notes_threshold && has_notes {
                let question = format!(
                    "Only {found} matches found. Search notes/description fields too?"
                );
                if console.confirm(&question)? {
                    include_notes = true;
                    counts = count_all(conn, &plans, pattern, include_notes);
                }
            }

            let tables = plans
                .iter()
                .zip(counts)
                .map(|((name, plan), count)| match (plan, count) {
                    (Err(e), _) => TableResult::failed(name, e.clone()),
                    (Ok(_), Err(e)) => TableResult::failed(name, e),
                    (Ok(plan), Ok(total)) => {
                        self.list(conn, plan, pattern, include_notes, request.max_results, total)
                    }
                })
                .collect();
            Ok(SearchReport {
                pattern: pattern.to_string(),
                notes_included: include_notes,
                tables,
            })
        })
    }

    fn list(
        &self,
        conn: &Connection,
        plan: &Plan,
        pattern: &str,
        include_notes: bool,
        max: usize,
        total: usize,
    ) -> TableResult {
        let mut result = TableResult {
            table: plan.schema.name.clone(),
            label: plan.config.label.clone(),
            auto_detected: plan.config.auto_detected,
            total,
            hits: Vec::new(),
            error: None,
        };
        if total == 0 {
            return result;
        }
        match plan.fetch(conn, pattern, include_notes, max) {
            Ok(records) => {
                result.hits = records.iter().map(|r| self.hit(conn, plan, r)).collect();
            }
            Err(e) => result.error = Some(e.to_string()),
        }
        result
    }

    fn hit(&self, conn: &Connection, plan: &Plan, record: &Record) -> Hit {
        let max = self.limits.truncate_at;
        let config = &plan.config;
        let uid = record.integer(&config.key);
        let primary = record
            .text(config.primary_display())
            .or_else(|| display_column(&plan.schema, record).and_then(|c| record.text(c)))
            .map(|t| truncate(&t, max))
            .unwrap_or_else(|| format!("#{}", uid.unwrap_or_default()));
        let secondary = config
            .display_fields
            .iter()
            .skip(1)
            .filter_map(|f| record.text(f).map(|v| (f.clone(), truncate(&v, max))))
            .collect();
        let references = config
            .references
            .iter()
            .filter_map(|reference| {
                let value = record.get(&reference.column)?.clone();
                if value == Value::Null {
                    return None;
                }
                let label = best_effort(
                    "reference",
                    &reference.table,
                    reference_label(conn, reference, value),
                )?;
                Some((reference.column.clone(), truncate(&label, max)))
            })
            .collect();
        let (related, nested) = match uid {
            Some(uid) => (
                config
                    .relationships
                    .iter()
                    .filter_map(|r| {
                        best_effort("relationship", &r.junction, self.related(conn, r, uid))
                    })
                    .filter(|a| !a.values.is_empty())
                    .collect(),
                config
                    .nested
                    .as_ref()
                    .and_then(|n| best_effort("nested", &n.table, self.nested(conn, n, uid)))
                    .filter(|a| !a.values.is_empty()),
            ),
            None => (Vec::new(), None),
        };
        Hit {
            uid,
            primary,
            secondary,
            references,
            related,
            nested,
        }
    }

    fn related(&self, conn: &Connection, relationship: &Relationship, uid: i64) -> Result<Annotation> {
        let extra = relationship
            .junction_field
            .as_deref()
            .map(|f| format!("j.{}", quote_ident(f)))
            .unwrap_or_else(|| "null".to_string());
        let sql = format!(
            "select t.{display}, {extra}
                from {junction} j
                join {target} t
                on t.{key} = j.{to}
                where j.{from} = ?1
                limit ?2",
            display = quote_ident(&relationship.display_field),
            junction = quote_ident(&relationship.junction),
            target = quote_ident(&relationship.target),
            key = quote_ident(&relationship.target_key),
            to = quote_ident(&relationship.to_column),
            from = quote_ident(&relationship.from_column),
        );
        let mut statement = conn.prepare(&sql)?;
        let rows = statement.query_map(params![uid, self.limits.relation_limit as i64], |row| {
            Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?))
        })?;
        let mut values = Vec::new();
        for row in rows {
            let (shown, extra) = row?;
            if let Some(shown) = render_value(&shown) {
                values.push(match render_value(&extra) {
                    Some(extra) => format!("{shown} ({extra})"),
                    None => shown,
                });
            }
        }
        Ok(Annotation {
            label: relationship.label.clone(),
            values,
        })
    }

    fn nested(&self, conn: &Connection, nested: &Nested, uid: i64) -> Result<Annotation> {
        let fields = nested
            .fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "select {} from {} where {} = ?1 limit ?2",
            fields,
            quote_ident(&nested.table),
            quote_ident(&nested.parent_column)
        );
        let records = query_records(conn, &sql, params![uid, self.limits.relation_limit as i64])?;
        let values = records
            .iter()
            .filter_map(|r| nested_line(nested, r, self.limits.truncate_at))
            .collect();
        Ok(Annotation {
            label: nested.label.clone(),
            values,
        })
    }
}

fn count_all(
    conn: &Connection,
    plans: &[(String, std::result::Result<Plan, String>)],
    pattern: &str,
    include_notes: bool,
) -> Vec<std::result::Result<usize, String>> {
    plans
        .iter()
        .map(|(name, plan)| {
            let plan = plan.as_ref().map_err(|e| e.clone())?;
            let count = plan
                .count(conn, pattern, include_notes)
                .map_err(|e| e.to_string())?;
            debug!(table = %name, count, include_notes, "counted");
            Ok(count)
        })
        .collect()
}

fn best_effort<T>(what: &str, table: &str, outcome: Result<T>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(what, table, error = %e, "annotation skipped");
            None
        }
    }
}

fn reference_label(conn: &Connection, reference: &Reference, value: Value) -> Result<String> {
    let target = schema::table_schema(conn, &reference.table)?;
    let sql = format!(
        "select * from {} where {} = ?1 limit 1",
        quote_ident(&target.name),
        quote_ident(&reference.key)
    );
    let record = query_records(conn, &sql, params![value])?
        .into_iter()
        .next()
        .ok_or_else(|| EurasiaError::Storage(format!("no row in {}", reference.table)))?;
    let label = match &reference.display_field {
        Some(field) => record.text(field),
        None => display_column(&target, &record).and_then(|c| record.text(c)),
    };
    Ok(label.unwrap_or_else(|| format!("#{}", record.text(&reference.key).unwrap_or_default())))
}

fn nested_line(nested: &Nested, record: &Record, max: usize) -> Option<String> {
    let values: Vec<String> = nested.fields.iter().filter_map(|f| record.text(f)).collect();
    let (first, rest) = values.split_first()?;
    Some(match nested.kind {
        NestedKind::Definitions if rest.is_empty() => truncate(first, max),
        NestedKind::Definitions => format!("{} [{}]", truncate(first, max), rest.join("; ")),
        NestedKind::LocationAttributes => {
            let mut line = first.clone();
            if let Some((value, rest)) = rest.split_first() {
                line = format!("{line}: {}", truncate(value, max));
                if !rest.is_empty() {
                    line = format!("{line} ({})", rest.join(", "));
                }
            }
            line
        }
    })
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notes = if self.notes_included { " (including notes)" } else { "" };
        writeln!(f, "🔍 Search results for '{}'{}", self.pattern, notes)?;
        writeln!(f, "{}", "=".repeat(60))?;
        for table in &self.tables {
            let guessed = if table.auto_detected { ", auto-detected" } else { "" };
            writeln!(f, "\n{} ({}{})", table.label, table.table, guessed)?;
            if let Some(error) = &table.error {
                writeln!(f, "  ❌ Error searching {}: {}", table.table, error)?;
                continue;
            }
            for (i, hit) in table.hits.iter().enumerate() {
                match hit.uid {
                    Some(uid) => writeln!(f, "  {}. {} [#{}]", i + 1, hit.primary, uid)?,
                    None => writeln!(f, "  {}. {}", i + 1, hit.primary)?,
                }
                for (field, value) in &hit.secondary {
                    writeln!(f, "       {field}: {value}")?;
                }
                for (column, label) in &hit.references {
                    writeln!(f, "       → {column}: {label}")?;
                }
                for annotation in &hit.related {
                    writeln!(f, "       ↳ {}: {}", annotation.label, annotation.values.join(", "))?;
                }
                if let Some(nested) = &hit.nested {
                    writeln!(f, "       • {}:", nested.label)?;
                    for value in &nested.values {
                        writeln!(f, "           - {value}")?;
                    }
                }
            }
            writeln!(f, "  Showing {} of {} matches in {}", table.hits.len(), table.total, table.table)?;
        }
        writeln!(f, "{}", "=".repeat(60))?;
        write!(
            f,
            "📊 Total: {} displayed of {} matches across {} tables",
            self.total_displayed(),
            self.total_matches(),
            self.tables.len()
        )
    }
}
