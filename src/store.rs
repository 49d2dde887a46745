//! Connection provider for the research database.
//!
//! A [`Store`] only remembers where the database file is and how the
//! `REGEXP` operator should treat letter case. Every operation opens a fresh
//! connection, uses it and drops it again before returning, so nothing is
//! shared between calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EurasiaError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Letter case handling of the `REGEXP` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseMode {
    pub fn compile(self, pattern: &str) -> Result<Regex> {
        Ok(RegexBuilder::new(pattern)
            .case_insensitive(self == CaseMode::Insensitive)
            .build()?)
    }
}

/// Evaluate `value REGEXP pattern`. Anything that is not text never matches,
/// and neither does an unparsable pattern.
pub fn regexp_matches(pattern: &str, value: ValueRef<'_>, case: CaseMode) -> bool {
    match case.compile(pattern) {
        Ok(regex) => text_matches(&regex, value),
        Err(_) => false,
    }
}

fn text_matches(regex: &Regex, value: ValueRef<'_>) -> bool {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| regex.is_match(text))
            .unwrap_or(false),
        _ => false,
    }
}

/// Install the `REGEXP` scalar function on a connection.
pub fn register_regexp(conn: &Connection, case: CaseMode) -> Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            // compiled once per statement, not once per row
            let regex: Arc<Option<Regex>> =
                ctx.get_or_create_aux(0, |pattern| -> std::result::Result<_, BoxError> {
                    Ok(pattern.as_str().ok().and_then(|p| case.compile(p).ok()))
                })?;
            Ok(match regex.as_ref() {
                Some(regex) => text_matches(regex, ctx.get_raw(1)),
                None => false,
            })
        },
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    case: CaseMode,
    enforce_foreign_keys: bool,
}

impl Store {
    /// Point at an existing database file. A missing file is fatal.
    pub fn open<P: AsRef<Path>>(path: P, case: CaseMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(EurasiaError::MissingDatabase(path));
        }
        Ok(Self {
            path,
            case,
            enforce_foreign_keys: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn case(&self) -> CaseMode {
        self.case
    }

    /// The same database seen through a different `REGEXP` case mode.
    pub fn with_case(&self, case: CaseMode) -> Self {
        Self {
            case,
            ..self.clone()
        }
    }

    /// The same database with `PRAGMA foreign_keys` switched on per connection.
    pub fn enforcing(&self) -> Self {
        Self {
            enforce_foreign_keys: true,
            ..self.clone()
        }
    }

    pub fn connect(&self) -> Result<Connection> {
        debug!(path = %self.path.display(), case = ?self.case, "opening connection");
        let conn = Connection::open(&self.path)?;
        register_regexp(&conn, self.case)?;
        if self.enforce_foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }
        Ok(conn)
    }

    /// Run `work` on a connection that is closed again on every exit path.
    pub fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.connect()?;
        work(&mut conn)
    }
}
