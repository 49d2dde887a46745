//! Interactive add, update and delete.
//!
//! Each operation selects a table and (except for add) a row, collects
//! values column by column, shows what is about to happen and only writes
//! after explicit confirmation. Writes run in a transaction on a connection
//! with foreign keys enforced; whatever the storage engine rejects is rolled
//! back and reported as [`Outcome::Rejected`].

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use tracing::{info, warn};

use crate::console::Console;
use crate::error::{EurasiaError, Result};
use crate::record::{Record, query_records, render_value};
use crate::resolver::{Resolution, Resolver};
use crate::schema::{self, Column, TableSchema, quote_ident};
use crate::settings::Settings;
use crate::store::Store;
use crate::text::{is_cancel, truncate};

/// Timestamp columns refreshed on every update, not only on insert.
const MODIFIED_FIELDS: [&str; 2] = ["Updated_At", "Last_Modified"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied { uid: i64 },
    Cancelled,
    /// The storage engine refused the statement; nothing was written.
    Rejected(String),
}

/// Convert typed input to a value fitting the column's declared type.
pub fn parse_value(column: &Column, input: &str) -> std::result::Result<Value, String> {
    let input = input.trim();
    if column.is_integer() {
        input
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("{} expects a whole number", column.name))
    } else if column.is_real() {
        input
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| format!("{} expects a number", column.name))
    } else {
        Ok(Value::Text(input.to_string()))
    }
}

pub fn fetch_record(conn: &Connection, schema: &TableSchema, uid: i64) -> Result<Option<Record>> {
    let sql = format!(
        "select {} from {} where {} = ?1",
        schema.projection(),
        quote_ident(&schema.name),
        quote_ident(schema.primary_key())
    );
    Ok(query_records(conn, &sql, params![uid])?.into_iter().next())
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn shown(value: &Value) -> String {
    render_value(value).unwrap_or_else(|| "∅".to_string())
}

/// Insert one row, stamping timestamp columns. Tables with an identifier
/// get the next one; any other table keeps the rowid SQLite hands out.
/// Returns the new row's key.
pub(crate) fn insert_row(conn: &Connection, schema: &TableSchema, values: &[(String, Value)]) -> Result<i64> {
    let stamp = now();
    let mut columns = Vec::new();
    let mut bound = Vec::new();
    let assigned = match schema.identifier() {
        Some(identifier) => {
            let uid = schema::next_identifier(conn, &schema.name)?;
            columns.push(identifier.name.clone());
            bound.push(Value::Integer(uid));
            Some(uid)
        }
        None => None,
    };
    for column in schema.columns.iter().filter(|c| c.is_timestamp()) {
        columns.push(column.name.clone());
        bound.push(Value::Text(stamp.clone()));
    }
    for (column, value) in values {
        columns.push(column.clone());
        bound.push(value.clone());
    }
    let placeholders: Vec<String> = (1..=bound.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "insert into {} ({}) values ({})",
        quote_ident(&schema.name),
        columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, params_from_iter(bound))?;
    let uid = assigned.unwrap_or_else(|| conn.last_insert_rowid());
    info!(table = %schema.name, uid, "inserted");
    Ok(uid)
}

pub struct Mutator<'a, C: Console> {
    store: Store,
    console: &'a mut C,
    resolver_limit: usize,
    truncate_at: usize,
}

impl<'a, C: Console> Mutator<'a, C> {
    pub fn new(store: &Store, console: &'a mut C) -> Self {
        Self {
            store: store.enforcing(),
            console,
            resolver_limit: 20,
            truncate_at: 80,
        }
    }

    /// A mutator using the configured case mode and limits.
    pub fn from_settings(store: &Store, console: &'a mut C, settings: &Settings) -> Self {
        Self {
            store: store.with_case(settings.mutation_case).enforcing(),
            console,
            resolver_limit: settings.resolver_limit,
            truncate_at: settings.truncate_at,
        }
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn console(&mut self) -> &mut C {
        &mut *self.console
    }

    pub(crate) fn resolver(&mut self) -> Resolver<'_, C> {
        Resolver::new(&self.store, &mut *self.console, self.resolver_limit)
            .truncate_at(self.truncate_at)
    }

    /// The named table, or one picked from a numbered menu.
    pub fn select_table(&mut self, table: Option<&str>) -> Result<Option<TableSchema>> {
        if let Some(table) = table {
            return self
                .store
                .with_connection(|conn| schema::table_schema(conn, table))
                .map(Some);
        }
        let tables = self.store.with_connection(|conn| schema::list_tables(conn))?;
        for (i, table) in tables.iter().enumerate() {
            self.console.write_line(&format!("  {}. {}", i + 1, table));
        }
        loop {
            let answer = match self.console.read_line("Table (number or name, Enter to cancel): ")? {
                Some(answer) if !answer.trim().is_empty() && !is_cancel(&answer) => answer,
                _ => return Ok(None),
            };
            let answer = answer.trim();
            let chosen = match answer.parse::<usize>() {
                Ok(n) if (1..=tables.len()).contains(&n) => Some(&tables[n - 1]),
                _ => tables.iter().find(|t| t.eq_ignore_ascii_case(answer)),
            };
            match chosen {
                Some(table) => {
                    return self
                        .store
                        .with_connection(|conn| schema::table_schema(conn, table))
                        .map(Some);
                }
                None => self.console.write_line(&format!("No table '{answer}'")),
            }
        }
    }

    /// The row with identifier `uid`, or one found by searching the table.
    pub fn select_row(&mut self, schema: &TableSchema, uid: Option<i64>) -> Result<Option<Record>> {
        let uid = match uid {
            Some(uid) => uid,
            None => match self.resolver().choose(&schema.name)? {
                Resolution::Resolved(uid) => uid,
                Resolution::Skipped => return Ok(None),
            },
        };
        let record = self
            .store
            .with_connection(|conn| fetch_record(conn, schema, uid))?;
        if record.is_none() {
            self.console
                .write_line(&format!("❌ No record #{uid} in {}", schema.name));
        }
        Ok(record)
    }

    /// Ask for one column's value. `None` means the user cancelled.
    pub(crate) fn collect_field(&mut self, schema: &TableSchema, column: &Column) -> Result<Option<Value>> {
        if schema.foreign_key(&column.name).is_some() {
            let resolution = self.resolver().resolve(&schema.name, &column.name)?;
            return Ok(Some(resolution.id().map(Value::Integer).unwrap_or(Value::Null)));
        }
        let marker = if column.required { "*" } else { "" };
        let prompt = format!("{} ({}){}: ", column.name, column.data_type, marker);
        loop {
            let input = match self.console.read_line(&prompt)? {
                Some(input) if is_cancel(&input) => return Ok(None),
                Some(input) => input,
                None => return Ok(None),
            };
            if input.trim().is_empty() {
                if column.required {
                    self.console.write_line(&format!("⚠️ {} is required", column.name));
                    continue;
                }
                return Ok(Some(Value::Null));
            }
            match parse_value(column, &input) {
                Ok(value) => return Ok(Some(value)),
                Err(problem) => self.console.write_line(&format!("⚠️ {problem}")),
            }
        }
    }

    fn show_record(&mut self, schema: &TableSchema, record: &Record) {
        for column in &schema.columns {
            let value = record.get(&column.name).map(shown).unwrap_or_default();
            self.console
                .write_line(&format!("   {}: {}", column.name, truncate(&value, self.truncate_at)));
        }
    }

    /// Report a refused write and turn it into an outcome.
    pub(crate) fn settle(&mut self, table: &str, applied: Result<i64>) -> Outcome {
        match applied {
            Ok(uid) => {
                self.console.write_line(&format!("✅ Saved {table} #{uid}"));
                Outcome::Applied { uid }
            }
            Err(e) => {
                warn!(table, error = %e, "statement rejected");
                let message = if e.is_constraint() {
                    format!("❌ Rejected by the database: {e}")
                } else {
                    format!("❌ {e}")
                };
                self.console.write_line(&message);
                Outcome::Rejected(e.to_string())
            }
        }
    }

    pub fn add_record(&mut self, table: Option<&str>) -> Result<Outcome> {
        let Some(schema) = self.select_table(table)? else {
            return Ok(Outcome::Cancelled);
        };
        self.console
            .write_line(&format!("➕ New record in {} (q to cancel)", schema.name));
        let mut values = Vec::new();
        for column in schema.editable_columns() {
            match self.collect_field(&schema, column)? {
                Some(value) => values.push((column.name.clone(), value)),
                None => {
                    self.console.write_line("Cancelled, nothing saved.");
                    return Ok(Outcome::Cancelled);
                }
            }
        }
        self.console.write_line("Preview:");
        if let Some(identifier) = schema.identifier() {
            self.console
                .write_line(&format!("   {}: assigned on save", identifier.name));
        }
        for (column, value) in &values {
            let line = format!("   {column}: {}", truncate(&shown(value), self.truncate_at));
            self.console.write_line(&line);
        }
        if !self.console.confirm(&format!("Insert into {}?", schema.name))? {
            return Ok(Outcome::Cancelled);
        }
        let applied = self.store.with_connection(|conn| {
            let tx = conn.transaction()?;
            let uid = insert_row(&tx, &schema, &values)?;
            tx.commit()?;
            Ok(uid)
        });
        Ok(self.settle(&schema.name, applied))
    }

    pub fn update_record(&mut self, table: Option<&str>, uid: Option<i64>) -> Result<Outcome> {
        let Some(schema) = self.select_table(table)? else {
            return Ok(Outcome::Cancelled);
        };
        let Some(record) = self.select_row(&schema, uid)? else {
            return Ok(Outcome::Cancelled);
        };
        let Some(uid) = record.integer(schema.primary_key()) else {
            return Ok(Outcome::Cancelled);
        };
        self.console.write_line(&format!("✏️ Editing {} #{uid}", schema.name));
        self.show_record(&schema, &record);
        let mut changes: Vec<(String, Value, Value)> = Vec::new();
        for column in schema.editable_columns() {
            let current = record.get(&column.name).cloned().unwrap_or(Value::Null);
            let Some(updated) = self.revise_field(&schema, column, &current)? else {
                self.console.write_line("Cancelled, nothing saved.");
                return Ok(Outcome::Cancelled);
            };
            if updated != current {
                changes.push((column.name.clone(), current, updated));
            }
        }
        if changes.is_empty() {
            self.console.write_line("No changes.");
            return Ok(Outcome::Cancelled);
        }
        self.console.write_line("Changes:");
        for (column, before, after) in &changes {
            self.console
                .write_line(&format!("   {column}: {} → {}", shown(before), shown(after)));
        }
        if !self.console.confirm(&format!("Apply changes to {} #{uid}?", schema.name))? {
            return Ok(Outcome::Cancelled);
        }
        let applied = self.store.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut assignments = Vec::new();
            let mut bound = Vec::new();
            for (column, _, after) in &changes {
                bound.push(after.clone());
                assignments.push(format!("{} = ?{}", quote_ident(column), bound.len()));
            }
            for column in schema.columns.iter().filter(|c| {
                MODIFIED_FIELDS.iter().any(|m| m.eq_ignore_ascii_case(&c.name))
            }) {
                bound.push(Value::Text(now()));
                assignments.push(format!("{} = ?{}", quote_ident(&column.name), bound.len()));
            }
            bound.push(Value::Integer(uid));
            let sql = format!(
                "update {} set {} where {} = ?{}",
                quote_ident(&schema.name),
                assignments.join(", "),
                quote_ident(schema.primary_key()),
                bound.len()
            );
            let updated = tx.execute(&sql, params_from_iter(bound))?;
            if updated == 0 {
                return Err(EurasiaError::Storage(format!("{} #{uid} no longer exists", schema.name)));
            }
            tx.commit()?;
            info!(table = %schema.name, uid, changed = changes.len(), "updated");
            Ok(uid)
        });
        Ok(self.settle(&schema.name, applied))
    }

    /// Ask for a replacement value; Enter keeps `current`.
    fn revise_field(&mut self, schema: &TableSchema, column: &Column, current: &Value) -> Result<Option<Value>> {
        if schema.foreign_key(&column.name).is_some() {
            let prompt = format!(
                "{} [{}] (Enter keep, c change, x clear): ",
                column.name,
                shown(current)
            );
            return match self.console.read_line(&prompt)? {
                None => Ok(None),
                Some(answer) if is_cancel(&answer) => Ok(None),
                Some(answer) => match answer.trim().to_ascii_lowercase().as_str() {
                    "c" => Ok(Some(
                        match self.resolver().resolve(&schema.name, &column.name)? {
                            Resolution::Resolved(id) => Value::Integer(id),
                            Resolution::Skipped => current.clone(),
                        },
                    )),
                    "x" => Ok(Some(Value::Null)),
                    _ => Ok(Some(current.clone())),
                },
            };
        }
        let prompt = format!(
            "{} [{}] (Enter keep, NULL clear): ",
            column.name,
            truncate(&shown(current), self.truncate_at)
        );
        loop {
            let input = match self.console.read_line(&prompt)? {
                Some(input) if is_cancel(&input) => return Ok(None),
                Some(input) => input,
                None => return Ok(None),
            };
            if input.trim().is_empty() {
                return Ok(Some(current.clone()));
            }
            if input.trim() == "NULL" {
                return Ok(Some(Value::Null));
            }
            match parse_value(column, &input) {
                Ok(value) => return Ok(Some(value)),
                Err(problem) => self.console.write_line(&format!("⚠️ {problem}")),
            }
        }
    }

    pub fn delete_record(&mut self, table: Option<&str>, uid: Option<i64>) -> Result<Outcome> {
        let Some(schema) = self.select_table(table)? else {
            return Ok(Outcome::Cancelled);
        };
        let Some(record) = self.select_row(&schema, uid)? else {
            return Ok(Outcome::Cancelled);
        };
        let Some(uid) = record.integer(schema.primary_key()) else {
            return Ok(Outcome::Cancelled);
        };
        self.console.write_line(&format!("🗑️ About to delete {} #{uid}", schema.name));
        self.show_record(&schema, &record);
        let dependents = self
            .store
            .with_connection(|conn| schema::dependents(conn, &schema.name, uid))?;
        if !dependents.is_empty() {
            self.console.write_line("⚠️ This record is referenced by:");
            for dependent in &dependents {
                self.console.write_line(&format!(
                    "   • {}.{}: {} rows",
                    dependent.table, dependent.column, dependent.count
                ));
            }
            self.console
                .write_line("   The database decides whether these block the delete or cascade.");
        }
        let answer = self.console.read_line("Type DELETE to confirm: ")?;
        if answer.as_deref() != Some("DELETE") {
            self.console.write_line("Deletion cancelled.");
            return Ok(Outcome::Cancelled);
        }
        let applied = self.store.with_connection(|conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "delete from {} where {} = ?1",
                quote_ident(&schema.name),
                quote_ident(schema.primary_key())
            );
            tx.execute(&sql, params![uid])?;
            tx.commit()?;
            info!(table = %schema.name, uid, "deleted");
            Ok(uid)
        });
        Ok(match self.settle(&schema.name, applied) {
            Outcome::Applied { uid } => {
                self.console.write_line(&format!("Deleted {} #{uid}", schema.name));
                Outcome::Applied { uid }
            }
            other => other,
        })
    }
}
