mod common;

use common::{Fixture, SCHEMA};
use eurasia::catalog::{self, Reference, SearchCatalog, SearchConfig};
use eurasia::schema;

#[test]
fn builtin_catalog_matches_research_schema() {
    let fixture = Fixture::empty();
    let catalog = SearchCatalog::builtin();
    let issues = catalog::validate(&catalog, &fixture.conn()).unwrap();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    assert_eq!(
        catalog.tables().collect::<Vec<_>>(),
        vec!["bibliography", "definitions", "gazetteer", "lexicon", "people", "repositories", "roles"]
    );
}

#[test]
fn notes_fields_sit_out_the_first_pass() {
    let catalog = SearchCatalog::builtin();
    let lexicon = catalog.get("lexicon").unwrap();
    assert!(!lexicon.active_search_fields(false).contains(&"Notes"));
    assert!(lexicon.active_search_fields(true).contains(&"Notes"));
    assert_eq!(lexicon.primary_display(), "Term");
}

#[test]
fn mismatches_are_reported_not_fatal() {
    let fixture = Fixture::empty();
    let mut catalog = SearchCatalog::new();
    let mut broken = SearchCatalog::builtin().get("lexicon").unwrap().clone();
    broken.search_fields.push("Etymology".to_string());
    broken.references.push(Reference {
        column: "Region_ID".to_string(),
        table: "regions".to_string(),
        key: "UID".to_string(),
        display_field: Some("Name".to_string()),
    });
    catalog.insert(broken);
    let mut missing = SearchCatalog::builtin().get("roles").unwrap().clone();
    missing.table = "offices".to_string();
    catalog.insert(missing);

    let issues = catalog::validate(&catalog, &fixture.conn()).unwrap();
    let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
    assert!(lines.contains(&"⚠️ lexicon: search field 'Etymology' is not a column".to_string()));
    assert!(lines.contains(&"⚠️ lexicon: reference column 'Region_ID' is not a column".to_string()));
    assert!(lines.contains(&"⚠️ lexicon: referenced table 'regions' does not exist".to_string()));
    assert!(lines.contains(&"⚠️ offices: table 'offices' does not exist".to_string()));
    assert_eq!(issues.len(), 4);
}

#[test]
fn unconfigured_tables_are_detected_from_schema() {
    let fixture = Fixture::empty();
    let conn = fixture.conn();
    let junction = schema::table_schema(&conn, "people_roles").unwrap();
    let config: SearchConfig = SearchCatalog::builtin().config_for(&junction);
    assert!(config.auto_detected);
    assert_eq!(config.key, "UID");
    assert_eq!(config.search_fields, vec!["Date_Range"]);
    assert_eq!(config.display_fields, vec!["Date_Range"]);
    let targets: Vec<(&str, &str)> = config
        .references
        .iter()
        .map(|r| (r.column.as_str(), r.table.as_str()))
        .collect();
    assert_eq!(targets, vec![("Person_ID", "people"), ("Role_ID", "roles")]);
    assert!(config.references.iter().all(|r| r.display_field.is_none()));

    let configured = schema::table_schema(&conn, "lexicon").unwrap();
    assert!(!SearchCatalog::builtin().config_for(&configured).auto_detected);
}

#[test]
fn detection_finds_notes_and_falls_back_to_key() {
    let fixture = Fixture::with_sql(&[
        SCHEMA,
        "create table archive_boxes (UID integer primary key, Shelf text, Box_Title text, Comments text, Date_Added text);
         create table tallies (UID integer primary key, Amount integer);",
    ]);
    let conn = fixture.conn();
    let boxes = catalog::auto_detect(&schema::table_schema(&conn, "archive_boxes").unwrap());
    assert_eq!(boxes.search_fields, vec!["Shelf", "Box_Title", "Comments"]);
    assert_eq!(boxes.notes_fields, vec!["Comments"]);
    assert_eq!(boxes.display_fields, vec!["Box_Title"]);
    assert_eq!(boxes.active_search_fields(false), vec!["Shelf", "Box_Title"]);

    let tallies = catalog::auto_detect(&schema::table_schema(&conn, "tallies").unwrap());
    assert!(tallies.search_fields.is_empty());
    assert_eq!(tallies.display_fields, vec!["UID"]);
}
