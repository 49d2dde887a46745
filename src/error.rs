use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EurasiaError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Database file not found at: {}", .0.display())]
    MissingDatabase(PathBuf),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("'{table}.{column}' is not a foreign key")]
    NotForeignKey { table: String, column: String },
    #[error("Invalid pattern: {0}")]
    Pattern(String),
    #[error("Console error: {0}")]
    Console(String),
}

pub type Result<T> = std::result::Result<T, EurasiaError>;

impl EurasiaError {
    /// Failures the storage engine raised while enforcing its own rules.
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}

// Helper conversions
impl From<rusqlite::Error> for EurasiaError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(e.to_string())
            }
            _ => Self::Storage(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for EurasiaError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<regex::Error> for EurasiaError {
    fn from(e: regex::Error) -> Self {
        Self::Pattern(e.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for EurasiaError {
    fn from(e: rustyline::error::ReadlineError) -> Self {
        Self::Console(e.to_string())
    }
}
