//! Runtime settings: where the database lives and how searches behave.
//!
//! Values are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `EURASIA_*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::store::CaseMode;

/// Location of the database relative to the home directory.
pub const DEFAULT_RELATIVE_PATH: &str =
    "Dropbox/Active_Directories/Digital_Humanities/database_eurasia_7.0.db";

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "eurasia.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub max_results: usize,
    pub resolver_limit: usize,
    pub notes_threshold: usize,
    pub relation_limit: usize,
    pub truncate_at: usize,
    pub query_case: CaseMode,
    pub mutation_case: CaseMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_results: 25,
            resolver_limit: 20,
            notes_threshold: 5,
            relation_limit: 10,
            truncate_at: 120,
            query_case: CaseMode::Sensitive,
            mutation_case: CaseMode::Insensitive,
        }
    }
}

impl Settings {
    /// Load settings, reading `file` if given or `eurasia.toml` if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().into_owned(),
            )?
            .set_default("max_results", defaults.max_results as i64)?
            .set_default("resolver_limit", defaults.resolver_limit as i64)?
            .set_default("notes_threshold", defaults.notes_threshold as i64)?
            .set_default("relation_limit", defaults.relation_limit as i64)?
            .set_default("truncate_at", defaults.truncate_at as i64)?
            .set_default("query_case", "sensitive")?
            .set_default("mutation_case", "insensitive")?;
        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        let settings: Settings = builder
            .add_source(Environment::with_prefix("EURASIA"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn with_database(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }
}

/// `~/Dropbox/Active_Directories/Digital_Humanities/database_eurasia_7.0.db`
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(DEFAULT_RELATIVE_PATH)
}
