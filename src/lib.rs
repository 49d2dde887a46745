//! Eurasia – helpers for browsing and curating a digital-humanities research database.
//!
//! The database is a single SQLite file holding lexicon terms and their
//! definitions, people, places, bibliographic sources and the links between
//! them. This crate layers a handful of interactive routines over it:
//! * [`search`] – a configuration-driven search across one or more tables,
//!   annotating hits with resolved foreign keys, related rows and nested
//!   child rows.
//! * [`resolver`] – interactive selection of the row a foreign key should
//!   point at.
//! * [`mutate`] and [`lexicon`] – add, update and delete records behind
//!   previews and confirmations, plus the composite "new lexicon entry" flow.
//! * [`lookup`] – fixed searches over terms, locations and sources.
//!
//! ## Storage
//! The storage engine is treated as a black box that runs SQL and enforces
//! keys and constraints. A [`store::Store`] opens a new connection for every
//! operation and registers a `REGEXP` function on it, so patterns can be used
//! directly in `where` clauses. [`schema`] reads table layouts, foreign keys
//! and next identifiers from the live catalog every time it is asked.
//!
//! ## Search configuration
//! Which columns to search and display, and which relations to follow, is
//! described per table by a [`catalog::SearchCatalog`]. It is built once at
//! startup and handed to the engine; tables without an entry get a
//! configuration derived from their schema by [`catalog::auto_detect`].
//!
//! ## Interaction
//! Every prompt goes through the [`console::Console`] trait. The binary uses
//! the terminal, tests replay a [`console::Script`].
//!
//! ## Quick Start
//! ```no_run
//! use eurasia::catalog::SearchCatalog;
//! use eurasia::console::Terminal;
//! use eurasia::search::{SearchEngine, SearchRequest, Tables};
//! use eurasia::settings::Settings;
//! use eurasia::store::Store;
//!
//! let settings = Settings::load(None).unwrap();
//! let store = Store::open(&settings.database_path, settings.query_case).unwrap();
//! let catalog = SearchCatalog::builtin();
//! let engine = SearchEngine::new(&store, &catalog);
//! let mut console = Terminal::new().unwrap();
//! let report = engine
//!     .search(&SearchRequest::new("khan", Tables::All), &mut console)
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod catalog;
pub mod console;
pub mod error;
pub mod lexicon;
pub mod lookup;
pub mod mutate;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod search;
pub mod settings;
pub mod store;
pub mod text;

pub use error::{EurasiaError, Result};
