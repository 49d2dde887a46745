//! Per-table search configuration.
//!
//! A [`SearchCatalog`] maps table names to a [`SearchConfig`] describing what
//! to match against, what to print and which related rows to follow. The
//! built-in catalog covers the research tables; any other table gets a
//! configuration guessed from its schema by [`auto_detect`].

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::Connection;

use crate::error::Result;
use crate::schema::{self, TableSchema};
use crate::text::is_notes_field;

/// A foreign key on the searched table, shown as the referenced row's label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub column: String,
    pub table: String,
    pub key: String,
    /// `None` picks a likely label column at render time.
    pub display_field: Option<String>,
}

/// Rows reached through a junction table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub label: String,
    pub junction: String,
    /// Junction column holding the searched row's identifier.
    pub from_column: String,
    /// Junction column holding the related row's identifier.
    pub to_column: String,
    pub target: String,
    pub target_key: String,
    pub display_field: String,
    /// A column on the junction row itself worth printing alongside.
    pub junction_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedKind {
    Definitions,
    LocationAttributes,
}

/// Child rows keyed by the searched row's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nested {
    pub kind: NestedKind,
    pub label: String,
    pub table: String,
    pub parent_column: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub table: String,
    pub label: String,
    pub key: String,
    pub search_fields: Vec<String>,
    /// First entry is the primary display column.
    pub display_fields: Vec<String>,
    /// Subset of `search_fields` left out of the first pass.
    pub notes_fields: Vec<String>,
    pub references: Vec<Reference>,
    pub relationships: Vec<Relationship>,
    pub nested: Option<Nested>,
    pub auto_detected: bool,
}

impl SearchConfig {
    fn new(table: &str, label: &str) -> Self {
        Self {
            table: table.to_string(),
            label: label.to_string(),
            key: "UID".to_string(),
            search_fields: Vec::new(),
            display_fields: Vec::new(),
            notes_fields: Vec::new(),
            references: Vec::new(),
            relationships: Vec::new(),
            nested: None,
            auto_detected: false,
        }
    }

    fn search(mut self, fields: &[&str]) -> Self {
        self.search_fields = owned(fields);
        self
    }

    fn display(mut self, fields: &[&str]) -> Self {
        self.display_fields = owned(fields);
        self
    }

    fn notes(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if !self.search_fields.iter().any(|f| f == field) {
                self.search_fields.push(field.to_string());
            }
        }
        self.notes_fields = owned(fields);
        self
    }

    fn reference(mut self, column: &str, table: &str, display_field: &str) -> Self {
        self.references.push(Reference {
            column: column.to_string(),
            table: table.to_string(),
            key: "UID".to_string(),
            display_field: Some(display_field.to_string()),
        });
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn related(
        mut self,
        label: &str,
        junction: &str,
        from_column: &str,
        to_column: &str,
        target: &str,
        display_field: &str,
        junction_field: Option<&str>,
    ) -> Self {
        self.relationships.push(Relationship {
            label: label.to_string(),
            junction: junction.to_string(),
            from_column: from_column.to_string(),
            to_column: to_column.to_string(),
            target: target.to_string(),
            target_key: "UID".to_string(),
            display_field: display_field.to_string(),
            junction_field: junction_field.map(str::to_string),
        });
        self
    }

    fn nested(mut self, kind: NestedKind, label: &str, table: &str, parent: &str, fields: &[&str]) -> Self {
        self.nested = Some(Nested {
            kind,
            label: label.to_string(),
            table: table.to_string(),
            parent_column: parent.to_string(),
            fields: owned(fields),
        });
        self
    }

    /// Search fields for one pass, with or without the notes fields.
    pub fn active_search_fields(&self, include_notes: bool) -> Vec<&str> {
        self.search_fields
            .iter()
            .filter(|f| include_notes || !self.notes_fields.contains(f))
            .map(String::as_str)
            .collect()
    }

    pub fn primary_display(&self) -> &str {
        self.display_fields
            .first()
            .map(String::as_str)
            .unwrap_or(&self.key)
    }
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Lookup of search configurations, constructed once and passed around.
#[derive(Debug, Clone, Default)]
pub struct SearchCatalog {
    entries: BTreeMap<String, SearchConfig>,
}

impl SearchCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: SearchConfig) {
        self.entries.insert(config.table.clone(), config);
    }

    pub fn get(&self, table: &str) -> Option<&SearchConfig> {
        self.entries.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchConfig> {
        self.entries.values()
    }

    /// The explicit entry, or one guessed from the live schema.
    pub fn config_for(&self, schema: &TableSchema) -> SearchConfig {
        match self.get(&schema.name) {
            Some(config) => config.clone(),
            None => auto_detect(schema),
        }
    }

    /// Configurations for the research tables.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            SearchConfig::new("lexicon", "📖 Lexicon")
                .search(&["Term", "Translation", "Emic_Term", "Colonial_Term", "Transliteration"])
                .display(&["Term", "Translation", "Transliteration", "Emic_Term", "Colonial_Term"])
                .notes(&["Notes"])
                .related("Narrower terms", "related_terms", "Parent_ID", "Child_ID", "lexicon", "Term", None)
                .related("Broader terms", "related_terms", "Child_ID", "Parent_ID", "lexicon", "Term", None)
                .nested(
                    NestedKind::Definitions,
                    "Definitions",
                    "definitions",
                    "Lexicon_ID",
                    &["Definition", "Definition_Type", "Specificity"],
                ),
        );
        catalog.insert(
            SearchConfig::new("definitions", "📝 Definitions")
                .search(&["Definition", "Source_Note", "Specificity"])
                .display(&["Definition", "Definition_Type", "Specificity"])
                .notes(&["Notes"])
                .reference("Lexicon_ID", "lexicon", "Term")
                .reference("Source_ID", "bibliography", "Title"),
        );
        catalog.insert(
            SearchConfig::new("gazetteer", "🗺️ Gazetteer")
                .search(&[
                    "Nickname",
                    "Location_Name_Arabic",
                    "Location_Name_Colonial",
                    "Location_Name_Latin",
                ])
                .display(&[
                    "Nickname",
                    "Location_Name_Latin",
                    "Location_Name_Arabic",
                    "Location_Name_Colonial",
                ])
                .notes(&["Notes"])
                .nested(
                    NestedKind::LocationAttributes,
                    "Attributes",
                    "location_attributes",
                    "Location_ID",
                    &["Attribute_Type", "Attribute_Value", "Date_Range"],
                ),
        );
        catalog.insert(
            SearchConfig::new("bibliography", "📚 Bibliography")
                .search(&["Author", "Title", "Catalog_No"])
                .display(&["Title", "Author", "Catalog_No", "Date_Pub_Greg", "Date_Pub_Hij"])
                .notes(&["Notes"])
                .reference("Repository_ID", "repositories", "Acronym"),
        );
        catalog.insert(
            SearchConfig::new("repositories", "🏛️ Repositories")
                .search(&["Acronym", "Name_Foreign", "Name_English"])
                .display(&["Acronym", "Name_English", "Name_Foreign"])
                .notes(&["Notes"]),
        );
        catalog.insert(
            SearchConfig::new("people", "👤 People")
                .search(&["Name", "Name_Arabic", "Nisba"])
                .display(&["Name", "Name_Arabic", "Birth_Date", "Death_Date"])
                .notes(&["Notes"])
                .reference("Birthplace_ID", "gazetteer", "Nickname")
                .related("Roles", "people_roles", "Person_ID", "Role_ID", "roles", "Role", Some("Date_Range")),
        );
        catalog.insert(
            SearchConfig::new("roles", "🎭 Roles")
                .search(&["Role"])
                .display(&["Role"])
                .notes(&["Description"])
                .related("Held by", "people_roles", "Role_ID", "Person_ID", "people", "Name", Some("Date_Range")),
        );
        catalog
    }
}

/// Guess a configuration from column names and types alone.
///
/// Text columns become search fields (prose columns become notes fields),
/// columns named like a name, title, date or type are displayed, and the
/// identifier is displayed when nothing else qualifies.
pub fn auto_detect(schema: &TableSchema) -> SearchConfig {
    const DISPLAY_TOKENS: [&str; 5] = ["name", "title", "term", "date", "type"];
    let mut config = SearchConfig::new(&schema.name, &format!("📄 {}", schema.name));
    config.key = schema.primary_key().to_string();
    config.auto_detected = true;
    for column in schema.text_columns() {
        config.search_fields.push(column.name.clone());
        if is_notes_field(&column.name) {
            config.notes_fields.push(column.name.clone());
        }
    }
    config.display_fields = schema
        .columns
        .iter()
        .filter(|c| !c.is_timestamp() && schema.foreign_key(&c.name).is_none())
        .filter(|c| {
            let lower = c.name.to_ascii_lowercase();
            DISPLAY_TOKENS.iter().any(|t| lower.contains(t))
        })
        .map(|c| c.name.clone())
        .collect();
    if config.display_fields.is_empty() {
        config.display_fields.push(config.key.clone());
    }
    config.references = schema
        .foreign_keys
        .iter()
        .map(|fk| Reference {
            column: fk.from.clone(),
            table: fk.table.clone(),
            key: fk.to.clone(),
            display_field: None,
        })
        .collect();
    config
}

/// Something in a configuration the live schema does not have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub table: String,
    pub problem: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "⚠️ {}: {}", self.table, self.problem)
    }
}

/// Cross-check every configuration against the live schema. Behaviour is
/// not changed; the mismatches are only reported.
pub fn validate(catalog: &SearchCatalog, conn: &Connection) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    for config in catalog.iter() {
        let mut report = |problem: String| {
            issues.push(Issue {
                table: config.table.clone(),
                problem,
            })
        };
        let table = match load(conn, &config.table)? {
            Some(table) => table,
            None => {
                report(format!("table '{}' does not exist", config.table));
                continue;
            }
        };
        let own_fields = [
            ("search field", &config.search_fields),
            ("display field", &config.display_fields),
            ("notes field", &config.notes_fields),
        ];
        for (kind, fields) in own_fields {
            for field in fields.iter().filter(|f| !table.has_column(f)) {
                report(format!("{kind} '{field}' is not a column"));
            }
        }
        if !table.has_column(&config.key) {
            report(format!("key '{}' is not a column", config.key));
        }
        for reference in &config.references {
            if !table.has_column(&reference.column) {
                report(format!("reference column '{}' is not a column", reference.column));
            }
            match load(conn, &reference.table)? {
                None => report(format!("referenced table '{}' does not exist", reference.table)),
                Some(target) => {
                    let fields = std::iter::once(&reference.key).chain(reference.display_field.iter());
                    for field in fields.filter(|f| !target.has_column(f)) {
                        report(format!("referenced field '{}.{}' does not exist", reference.table, field));
                    }
                }
            }
        }
        for relationship in &config.relationships {
            match load(conn, &relationship.junction)? {
                None => report(format!("junction table '{}' does not exist", relationship.junction)),
                Some(junction) => {
                    let fields = [&relationship.from_column, &relationship.to_column]
                        .into_iter()
                        .chain(relationship.junction_field.iter());
                    for field in fields.filter(|f| !junction.has_column(f)) {
                        report(format!("junction field '{}.{}' does not exist", relationship.junction, field));
                    }
                }
            }
            match load(conn, &relationship.target)? {
                None => report(format!("related table '{}' does not exist", relationship.target)),
                Some(target) => {
                    for field in [&relationship.target_key, &relationship.display_field]
                        .into_iter()
                        .filter(|f| !target.has_column(f))
                    {
                        report(format!("related field '{}.{}' does not exist", relationship.target, field));
                    }
                }
            }
        }
        if let Some(nested) = &config.nested {
            match load(conn, &nested.table)? {
                None => report(format!("nested table '{}' does not exist", nested.table)),
                Some(child) => {
                    for field in std::iter::once(&nested.parent_column)
                        .chain(nested.fields.iter())
                        .filter(|f| !child.has_column(f))
                    {
                        report(format!("nested field '{}.{}' does not exist", nested.table, field));
                    }
                }
            }
        }
    }
    Ok(issues)
}

fn load(conn: &Connection, table: &str) -> Result<Option<TableSchema>> {
    if schema::table_exists(conn, table)? {
        Ok(Some(schema::table_schema(conn, table)?))
    } else {
        Ok(None)
    }
}
