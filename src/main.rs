//! Command line front end for the Eurasia research database.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error};

use eurasia::catalog::{self, SearchCatalog};
use eurasia::console::{Console, Terminal};
use eurasia::lexicon::LexiconLayout;
use eurasia::lookup::{self, RepositoryFilter};
use eurasia::mutate::{Mutator, Outcome};
use eurasia::record::render_value;
use eurasia::resolver::{Resolution, Resolver};
use eurasia::schema;
use eurasia::search::{Limits, SearchEngine, SearchRequest, Tables};
use eurasia::settings::Settings;
use eurasia::store::Store;

#[derive(Parser, Debug)]
#[command(name = "eurasia")]
#[command(about = "Search, browse and curate the Eurasia research database")]
struct Args {
    /// Settings file (defaults to ./eurasia.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(short, long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overview of all tables, or of one
    Info {
        table: Option<String>,
        /// List every column
        #[arg(long)]
        columns: bool,
    },
    /// Distinct values of a column
    Values { table: String, column: String },
    /// Next free identifier of a table
    NextId { table: String },
    /// Search one or more tables with a regular expression
    Search {
        pattern: String,
        /// Table to search, repeatable; all tables when omitted
        #[arg(short, long = "table")]
        tables: Vec<String>,
        /// Results shown per table
        #[arg(short = 'n', long)]
        max: Option<usize>,
        /// Search notes and description fields straight away
        #[arg(long)]
        notes: bool,
    },
    /// Lexicon terms with their definitions
    Words { pattern: String },
    /// Gazetteer locations with their attributes
    Places { pattern: String },
    /// Bibliography entries
    Sources {
        pattern: String,
        /// Repository identifier or name pattern
        #[arg(short, long)]
        repository: Option<String>,
    },
    /// Pick the row a foreign key column should point at
    Resolve { table: String, column: String },
    /// Add a record
    Add { table: Option<String> },
    /// Update a record
    Update {
        table: Option<String>,
        #[arg(long)]
        uid: Option<i64>,
    },
    /// Delete a record
    Delete {
        table: Option<String>,
        #[arg(long)]
        uid: Option<i64>,
    },
    /// Create a lexicon term with its definitions
    Lexicon,
    /// Check the search configuration against the live schema
    Validate,
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("eurasia=debug")
        } else {
            EnvFilter::new("eurasia=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(args.verbose);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn report_outcome(outcome: Outcome) {
    debug!(?outcome, "mutation finished");
}

fn run(args: Args) -> eurasia::Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        settings = settings.with_database(database);
    }
    let store = Store::open(&settings.database_path, settings.query_case)?;
    debug!(database = %store.path().display(), "using database");
    let mut console = Terminal::new()?;

    match args.command {
        Command::Info { table, columns } => {
            let summaries = store
                .with_connection(|conn| schema::database_info(conn, table.as_deref(), columns))?;
            if table.is_none() {
                println!("📊 Database Tables Overview:");
                println!("{}", "=".repeat(50));
            }
            for summary in summaries {
                println!("{summary}");
            }
        }
        Command::Values { table, column } => {
            let values = store.with_connection(|conn| schema::unique_values(conn, &table, &column))?;
            for value in values {
                println!("{}", render_value(&value).unwrap_or_else(|| "NULL".to_string()));
            }
        }
        Command::NextId { table } => {
            let next = store.with_connection(|conn| schema::next_identifier(conn, &table))?;
            println!("{next}");
        }
        Command::Search {
            pattern,
            tables,
            max,
            notes,
        } => {
            let catalog = SearchCatalog::builtin();
            let engine = SearchEngine::new(&store, &catalog).with_limits(Limits::from(&settings));
            let tables = if tables.is_empty() {
                Tables::All
            } else {
                Tables::Named(tables)
            };
            let request = SearchRequest::new(&pattern, tables)
                .max_results(max.unwrap_or(settings.max_results))
                .include_notes(notes);
            let report = engine.search(&request, &mut console)?;
            println!("{report}");
        }
        Command::Words { pattern } => {
            let hits = lookup::word_search(&store, &pattern)?;
            if hits.is_empty() {
                println!("No lexicon entries found for '{pattern}'");
            }
            for hit in hits {
                let term = hit.term.unwrap_or_default();
                let translation = hit.translation.unwrap_or_default();
                println!("📖 {term} [#{}] {translation}", hit.uid);
                if let Some(definition) = hit.definition {
                    println!("     {definition}");
                }
                if !hit.related_terms.is_empty() {
                    println!("     ↳ Related: {}", hit.related_terms.join(", "));
                }
            }
        }
        Command::Places { pattern } => {
            let rows = lookup::location_search(&store, &pattern)?;
            if rows.is_empty() {
                println!("No locations found for '{pattern}'");
            }
            for row in rows {
                let fields: Vec<String> = row
                    .iter()
                    .filter_map(|(column, value)| render_value(value).map(|v| format!("{column}: {v}")))
                    .collect();
                println!("🗺️ {}", fields.join(" | "));
            }
        }
        Command::Sources { pattern, repository } => {
            let filter = repository.map(|r| match r.parse::<i64>() {
                Ok(id) => RepositoryFilter::Id(id),
                Err(_) => RepositoryFilter::Name(r),
            });
            let hits = lookup::bibliography_search(&store, &pattern, filter.as_ref())?;
            if hits.is_empty() {
                println!("No bibliography entries found for search term: '{pattern}'");
            }
            for hit in hits {
                println!(
                    "📚 [#{}] {} {}: {} ({})",
                    hit.uid,
                    hit.acronym.unwrap_or_default(),
                    hit.catalog_no.unwrap_or_default(),
                    hit.title.unwrap_or_default(),
                    hit.author.unwrap_or_default()
                );
            }
        }
        Command::Resolve { table, column } => {
            let store = store.with_case(settings.mutation_case);
            let resolution = Resolver::new(&store, &mut console, settings.resolver_limit)
                .truncate_at(settings.truncate_at)
                .resolve(&table, &column)?;
            match resolution {
                Resolution::Resolved(id) => println!("{id}"),
                Resolution::Skipped => console.write_line("No selection."),
            }
        }
        Command::Add { table } => {
            let outcome = Mutator::from_settings(&store, &mut console, &settings).add_record(table.as_deref())?;
            report_outcome(outcome);
        }
        Command::Update { table, uid } => {
            let outcome =
                Mutator::from_settings(&store, &mut console, &settings).update_record(table.as_deref(), uid)?;
            report_outcome(outcome);
        }
        Command::Delete { table, uid } => {
            let outcome =
                Mutator::from_settings(&store, &mut console, &settings).delete_record(table.as_deref(), uid)?;
            report_outcome(outcome);
        }
        Command::Lexicon => {
            let outcome = Mutator::from_settings(&store, &mut console, &settings)
                .new_lexicon_entry(&LexiconLayout::default())?;
            report_outcome(outcome);
        }
        Command::Validate => {
            let catalog = SearchCatalog::builtin();
            let issues = store.with_connection(|conn| catalog::validate(&catalog, conn))?;
            if issues.is_empty() {
                println!("✅ Search configuration matches the database");
            }
            for issue in &issues {
                println!("{issue}");
            }
        }
    }
    Ok(())
}
