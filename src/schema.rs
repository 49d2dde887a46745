//! Live schema introspection.
//!
//! Nothing here is cached: the storage engine's catalog is asked again on
//! every call, so a column added between two calls is seen by the second.
//! Table and column names only ever reach SQL text after they have been
//! checked against this catalog, and always through [`quote_ident`].

use std::fmt;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{EurasiaError, Result};

/// Timestamp columns that are filled in automatically, never prompted for.
pub const TIMESTAMP_FIELDS: [&str; 5] = [
    "Created_At",
    "Updated_At",
    "Date_Added",
    "Last_Modified",
    "Timestamp",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub required: bool,
    pub primary_key: bool,
    /// The table's only key column, and an integer: SQLite's row alias.
    pub identifier: bool,
}

impl Column {
    /// TEXT affinity as SQLite decides it from the declared type.
    pub fn is_text(&self) -> bool {
        let declared = self.data_type.to_ascii_uppercase();
        declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT")
    }

    pub fn is_integer(&self) -> bool {
        self.data_type.to_ascii_uppercase().contains("INT")
    }

    pub fn is_real(&self) -> bool {
        let declared = self.data_type.to_ascii_uppercase();
        ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|t| declared.contains(t))
    }

    pub fn is_timestamp(&self) -> bool {
        TIMESTAMP_FIELDS
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.name))
    }

    /// Identifiers and timestamps. Parts of a composite key are not system
    /// fields; somebody has to supply them.
    pub fn is_system(&self) -> bool {
        self.identifier || self.is_timestamp()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub from: String,
    pub table: String,
    pub to: String,
    pub on_delete: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.from.eq_ignore_ascii_case(column))
    }

    /// The column assigned on insert, when the table has one.
    pub fn identifier(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.identifier)
    }

    /// Name of the column addressing one row: the identifier, `UID` by
    /// convention, `rowid` failing that.
    pub fn primary_key(&self) -> &str {
        self.identifier()
            .or_else(|| self.column("UID"))
            .map(|c| c.name.as_str())
            .unwrap_or("rowid")
    }

    /// Select list that always carries [`Self::primary_key`].
    pub fn projection(&self) -> &'static str {
        if self.primary_key() == "rowid" {
            "rowid, *"
        } else {
            "*"
        }
    }

    /// Text columns worth matching against: everything textual that is not a
    /// system field.
    pub fn text_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_text() && !c.is_system())
    }

    /// Columns a person fills in by hand.
    pub fn editable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_system())
    }
}

/// Double-quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// User tables in alphabetical order.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut statement = conn.prepare(
        "
        select name
            from sqlite_master
            where type = 'table'
            and name not like 'sqlite_%'
            order by name
    ",
    )?;
    let names = statement.query_map([], |row| row.get::<_, String>(0))?;
    let mut tables = Vec::new();
    for name in names {
        tables.push(name?);
    }
    Ok(tables)
}

/// The catalog's spelling of `table`, matched without regard to letter case.
pub fn canonical_table(conn: &Connection, table: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "select name from sqlite_master where type = 'table' and name = ?1 collate nocase",
            params![table],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(canonical_table(conn, table)?.is_some())
}

/// Columns in declaration order, foreign keys in the order of the columns
/// they start from.
pub fn table_schema(conn: &Connection, table: &str) -> Result<TableSchema> {
    let Some(table) = canonical_table(conn, table)? else {
        return Err(EurasiaError::UnknownTable(table.to_string()));
    };
    let table = table.as_str();
    let columns = read_columns(conn, table)?;
    // pragma ids count backwards from the last declared constraint
    let mut statement = conn.prepare(
        "
        select fk.\"from\", fk.\"table\", fk.\"to\", fk.on_delete
            from pragma_foreign_key_list(?1) fk
            left join pragma_table_info(?1) c
            on c.name = fk.\"from\"
            order by c.cid, fk.id desc, fk.seq
    ",
    )?;
    let declared = statement.query_map(params![table], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    let mut foreign_keys = Vec::new();
    for fk in declared {
        let (from, referenced, to, on_delete) = fk?;
        // a reference without a column points at the referenced primary key
        let to = match to {
            Some(to) => to,
            None => referenced_key(conn, &referenced)?,
        };
        foreign_keys.push(ForeignKey {
            from,
            table: referenced,
            to,
            on_delete,
        });
    }
    Ok(TableSchema {
        name: table.to_string(),
        columns,
        foreign_keys,
    })
}

fn read_columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
    let mut statement = conn.prepare(
        "
        select name, type, \"notnull\", pk
            from pragma_table_info(?1)
            order by cid
    ",
    )?;
    let rows = statement.query_map(params![table], |row| {
        Ok(Column {
            name: row.get(0)?,
            data_type: row.get(1)?,
            required: row.get::<_, i64>(2)? != 0,
            primary_key: row.get::<_, i64>(3)? != 0,
            identifier: false,
        })
    })?;
    let mut columns = Vec::new();
    for column in rows {
        columns.push(column?);
    }
    if columns.iter().filter(|c| c.primary_key).count() == 1 {
        for column in columns.iter_mut().filter(|c| c.primary_key) {
            column.identifier = column.is_integer();
        }
    }
    Ok(columns)
}

fn referenced_key(conn: &Connection, table: &str) -> Result<String> {
    let columns = read_columns(conn, table)?;
    Ok(columns
        .iter()
        .find(|c| c.primary_key)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "UID".to_string()))
}

/// One more than the largest identifier in the table, 1 when it is empty.
///
/// This is only a suggestion: two writers asking at the same time get the
/// same answer and the second insert fails on the uniqueness constraint.
pub fn next_identifier(conn: &Connection, table: &str) -> Result<i64> {
    let schema = table_schema(conn, table)?;
    let sql = format!(
        "select coalesce(max({}), 0) + 1 from {}",
        quote_ident(schema.primary_key()),
        quote_ident(&schema.name)
    );
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Every distinct value held by one column.
pub fn unique_values(conn: &Connection, table: &str, column: &str) -> Result<Vec<Value>> {
    let schema = table_schema(conn, table)?;
    let column = schema
        .column(column)
        .ok_or_else(|| EurasiaError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })?;
    let sql = format!(
        "select distinct {} from {}",
        quote_ident(&column.name),
        quote_ident(&schema.name)
    );
    let mut statement = conn.prepare(&sql)?;
    let rows = statement.query_map([], |row| row.get::<_, Value>(0))?;
    let mut values = Vec::new();
    for value in rows {
        values.push(value?);
    }
    Ok(values)
}

/// A foreign key somewhere in the database that points at a given table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub table: String,
    pub key: ForeignKey,
}

/// Every declared foreign key, in any table, that references `target`.
pub fn references_to(conn: &Connection, target: &str) -> Result<Vec<Reference>> {
    let mut references = Vec::new();
    for table in list_tables(conn)? {
        let schema = table_schema(conn, &table)?;
        for key in schema.foreign_keys {
            if key.table.eq_ignore_ascii_case(target) {
                references.push(Reference {
                    table: table.clone(),
                    key,
                });
            }
        }
    }
    Ok(references)
}

/// Rows referencing one particular record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    pub table: String,
    pub column: String,
    pub count: i64,
}

/// Count, per referencing (table, column), the rows that point at
/// `target` row `uid`. Only non-zero counts are returned.
pub fn dependents(conn: &Connection, target: &str, uid: i64) -> Result<Vec<Dependent>> {
    let mut found = Vec::new();
    for reference in references_to(conn, target)? {
        let sql = format!(
            "select count(*) from {} where {} = ?1",
            quote_ident(&reference.table),
            quote_ident(&reference.key.from)
        );
        let count: i64 = conn.query_row(&sql, params![uid], |row| row.get(0))?;
        if count > 0 {
            found.push(Dependent {
                table: reference.table,
                column: reference.key.from,
                count,
            });
        }
    }
    Ok(found)
}

/// Short description of one table for the database overview.
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub name: String,
    pub outcome: std::result::Result<TableSchema, String>,
    pub show_columns: bool,
}

/// Overview of one table, or of every table when `table` is `None`.
/// A table that cannot be examined is reported, not fatal.
pub fn database_info(
    conn: &Connection,
    table: Option<&str>,
    show_columns: bool,
) -> Result<Vec<TableSummary>> {
    let names = match table {
        Some(table) => vec![table.to_string()],
        None => list_tables(conn)?,
    };
    Ok(names
        .into_iter()
        .map(|name| TableSummary {
            outcome: table_schema(conn, &name).map_err(|e| e.to_string()),
            name,
            show_columns,
        })
        .collect())
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Err(e) => write!(f, "❌ Error examining table {}: {}", self.name, e),
            Ok(schema) => {
                let sources: Vec<&str> =
                    schema.foreign_keys.iter().map(|fk| fk.from.as_str()).collect();
                write!(
                    f,
                    "📋 {}: {} columns, FK: [{}]",
                    self.name,
                    schema.columns.len(),
                    sources.join(", ")
                )?;
                if self.show_columns {
                    writeln!(f)?;
                    write!(f, "   Columns:")?;
                    for column in &schema.columns {
                        let pk = if column.primary_key { " (PK)" } else { "" };
                        write!(f, "\n     • {} ({}){}", column.name, column.data_type, pk)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
        }
    }
}
