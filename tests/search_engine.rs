mod common;

use common::{Fixture, SCHEMA, SEED, TERM_LINKS};
use eurasia::EurasiaError;
use eurasia::catalog::SearchCatalog;
use eurasia::console::Script;
use eurasia::mutate::{Mutator, Outcome};
use eurasia::search::{Limits, SearchEngine, SearchRequest, Tables};

#[test]
fn inserted_term_is_found() {
    let fixture = Fixture::empty();
    let mut answers = Script::new(["test_term_1", "", "", "", "", "", "y"]);
    let outcome = Mutator::new(&fixture.store, &mut answers)
        .add_record(Some("lexicon"))
        .unwrap();
    assert_eq!(outcome, Outcome::Applied { uid: 1 });

    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let report = engine
        .search(&SearchRequest::new("test_term_1", Tables::one("lexicon")), &mut console)
        .unwrap();
    let lexicon = report.table("lexicon").unwrap();
    assert_eq!(lexicon.total, 1);
    assert_eq!(lexicon.hits.len(), 1);
    assert_eq!(lexicon.hits[0].primary, "test_term_1");
    assert_eq!(lexicon.hits[0].uid, Some(1));
}

#[test]
fn table_names_ignore_letter_case() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let request = SearchRequest::new("court", Tables::one("Lexicon")).include_notes(true);
    let report = engine.search(&request, &mut console).unwrap();
    let lexicon = report.table("lexicon").expect("reported under the catalog's name");
    assert!(lexicon.error.is_none());
    assert!(!lexicon.auto_detected);
    assert_eq!(lexicon.total, 2);
}

#[test]
fn composite_key_hits_carry_their_rowid() {
    let fixture = Fixture::with_sql(&[
        SCHEMA,
        SEED,
        TERM_LINKS,
        "insert into term_links values (3, 1, 'court and judge'), (2, 4, 'registered endowments');",
    ]);
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let request = SearchRequest::new("endowments", Tables::one("term_links")).include_notes(true);
    let report = engine.search(&request, &mut console).unwrap();
    let links = report.table("term_links").unwrap();
    assert!(links.auto_detected);
    assert_eq!(links.total, 1);
    assert_eq!(links.hits[0].uid, Some(2));
}

#[test]
fn notes_offer_declined_keeps_first_pass() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("court", Tables::one("lexicon")), &mut console)
        .unwrap();
    assert!(console.saw("Only 2 matches found. Search notes/description fields too?"));
    assert!(!report.notes_included);
    assert_eq!(report.total_matches(), 2);
    let terms: Vec<&str> = report.tables[0].hits.iter().map(|h| h.primary.as_str()).collect();
    assert_eq!(terms, vec!["mahkama", "sijill"]);
}

#[test]
fn notes_offer_accepted_widens_the_search() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);

    let mut declined = Script::new(["n"]);
    let narrow = engine
        .search(&SearchRequest::new("qadi", Tables::one("lexicon")), &mut declined)
        .unwrap();
    assert_eq!(narrow.total_matches(), 1);

    let mut accepted = Script::new(["y"]);
    let wide = engine
        .search(&SearchRequest::new("qadi", Tables::one("lexicon")), &mut accepted)
        .unwrap();
    assert!(wide.notes_included);
    assert_eq!(wide.total_matches(), 2);
    assert_eq!(wide.tables[0].hits[1].primary, "sijill");
}

#[test]
fn notes_requested_up_front_are_not_offered() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let request = SearchRequest::new("qadi", Tables::one("lexicon")).include_notes(true);
    let report = engine.search(&request, &mut console).unwrap();
    assert_eq!(report.total_matches(), 2);
    assert!(console.transcript().is_empty());
}

#[test]
fn offer_follows_the_threshold() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let limits = Limits {
        notes_threshold: 2,
        ..Limits::default()
    };
    let engine = SearchEngine::new(&fixture.store, &catalog).with_limits(limits);
    let mut console = Script::new(Vec::<String>::new());
    engine
        .search(&SearchRequest::new("court", Tables::one("lexicon")), &mut console)
        .unwrap();
    assert!(!console.saw("Only"));
}

#[test]
fn hits_are_annotated() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);

    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("mahkama", Tables::one("lexicon")), &mut console)
        .unwrap();
    let hit = &report.tables[0].hits[0];
    assert_eq!(hit.primary, "mahkama");
    assert!(hit.secondary.contains(&("Translation".to_string(), "court".to_string())));
    assert_eq!(hit.related.len(), 1);
    assert_eq!(hit.related[0].label, "Narrower terms");
    let mut narrower = hit.related[0].values.clone();
    narrower.sort();
    assert_eq!(narrower, vec!["qadi", "sijill"]);
    let nested = hit.nested.as_ref().unwrap();
    assert_eq!(nested.values, vec!["Sharia court [institutional; Ottoman; legal]"]);

    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("Judge", Tables::one("definitions")), &mut console)
        .unwrap();
    let hit = &report.tables[0].hits[0];
    assert_eq!(
        hit.references,
        vec![
            ("Lexicon_ID".to_string(), "qadi".to_string()),
            ("Source_ID".to_string(), "Seyahatname".to_string()),
        ]
    );

    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("Timur", Tables::one("people")), &mut console)
        .unwrap();
    let hit = &report.tables[0].hits[0];
    assert_eq!(hit.references, vec![("Birthplace_ID".to_string(), "Samarkand".to_string())]);
    assert_eq!(hit.related[0].values, vec!["Emir (1370-1405)"]);

    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("Bukhara", Tables::one("gazetteer")), &mut console)
        .unwrap();
    let nested = report.tables[0].hits[0].nested.as_ref().unwrap();
    assert_eq!(
        nested.values,
        vec!["population: 100000 (1800-1850)", "ruler: Emir (1785-1920)"]
    );
}

#[test]
fn missing_reference_is_left_out() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("Inalienable", Tables::one("definitions")), &mut console)
        .unwrap();
    let hit = &report.tables[0].hits[0];
    assert_eq!(hit.references, vec![("Lexicon_ID".to_string(), "waqf".to_string())]);
}

#[test]
fn failing_table_does_not_stop_the_others() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(["n"]);
    let tables = Tables::Named(vec!["no_such_table".to_string(), "lexicon".to_string()]);
    let report = engine.search(&SearchRequest::new("qadi", tables), &mut console).unwrap();
    assert_eq!(report.tables.len(), 2);
    let failed = report.table("no_such_table").unwrap();
    assert!(failed.error.as_deref().unwrap().contains("no_such_table"));
    assert_eq!(report.table("lexicon").unwrap().hits.len(), 1);
    let rendered = report.to_string();
    assert!(rendered.contains("❌ Error searching no_such_table"));
    assert!(rendered.ends_with("📊 Total: 1 displayed of 1 matches across 2 tables"));
}

#[test]
fn every_table_is_searched() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(["n"]);
    let report = engine
        .search(&SearchRequest::new("Bukhara", Tables::All), &mut console)
        .unwrap();
    assert_eq!(report.tables.len(), 10);
    assert_eq!(report.total_matches(), 1);
    assert_eq!(report.table("gazetteer").unwrap().total, 1);
    assert!(report.tables.iter().all(|t| t.error.is_none()));
}

#[test]
fn unconfigured_table_uses_detected_fields() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let report = engine
        .search(&SearchRequest::new("1325", Tables::one("people_roles")), &mut console)
        .unwrap();
    let result = &report.tables[0];
    assert!(result.auto_detected);
    assert_eq!(result.total, 1);
    let hit = &result.hits[0];
    assert_eq!(hit.primary, "1325-1354");
    assert_eq!(
        hit.references,
        vec![
            ("Person_ID".to_string(), "Ibn Battuta".to_string()),
            ("Role_ID".to_string(), "Traveller".to_string()),
        ]
    );
    // no notes columns, so nothing to offer
    assert!(console.transcript().is_empty());
}

#[test]
fn results_are_capped_per_table() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(["n"]);
    let request = SearchRequest::new("a", Tables::one("lexicon")).max_results(1);
    let report = engine.search(&request, &mut console).unwrap();
    let lexicon = &report.tables[0];
    assert_eq!(lexicon.total, 3);
    assert_eq!(lexicon.hits.len(), 1);
    assert_eq!(lexicon.hits[0].primary, "qadi");
    assert!(report.to_string().contains("Showing 1 of 3 matches in lexicon"));
}

#[test]
fn bad_patterns_are_rejected() {
    let fixture = Fixture::seeded();
    let catalog = SearchCatalog::builtin();
    let engine = SearchEngine::new(&fixture.store, &catalog);
    let mut console = Script::new(Vec::<String>::new());
    let empty = engine.search(&SearchRequest::new("  ", Tables::All), &mut console);
    assert!(matches!(empty, Err(EurasiaError::Pattern(_))));
    let broken = engine.search(&SearchRequest::new("(unclosed", Tables::All), &mut console);
    assert!(matches!(broken, Err(EurasiaError::Pattern(_))));
}
