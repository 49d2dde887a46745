mod common;

use common::Fixture;
use eurasia::EurasiaError;
use eurasia::console::Script;
use eurasia::resolver::{Resolution, Resolver};
use eurasia::store::CaseMode;

#[test]
fn retry_after_no_match_then_select() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["Nonexistent title", "r", "Muqaddimah", "1"]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .resolve("definitions", "Source_ID")
        .unwrap();
    assert_eq!(resolution, Resolution::Resolved(2));
    assert!(script.saw("🔗 definitions.Source_ID → bibliography"));
    assert!(script.saw("❌ No matches for 'Nonexistent title' in bibliography"));
    assert!(script.saw("1. Muqaddimah (#2)"));
    assert_eq!(script.remaining(), 0);
}

#[test]
fn empty_search_skips() {
    let fixture = Fixture::seeded();
    let mut script = Script::new([""]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .resolve("people", "Birthplace_ID")
        .unwrap();
    assert_eq!(resolution, Resolution::Skipped);
    assert_eq!(resolution.id(), None);
}

#[test]
fn declining_retry_skips() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["zzz", ""]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .choose("gazetteer")
        .unwrap();
    assert_eq!(resolution, Resolution::Skipped);
}

#[test]
fn exhausted_input_skips() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["Bukhara"]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .choose("gazetteer")
        .unwrap();
    assert_eq!(resolution, Resolution::Skipped);
}

#[test]
fn search_again_from_the_list() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["Ibn", "s", "Evliya", "1"]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .choose("bibliography")
        .unwrap();
    assert_eq!(resolution, Resolution::Resolved(1));
    assert!(script.saw("1. Muqaddimah (#2)"));
    assert!(script.saw("1. Seyahatname (#1)"));
}

#[test]
fn out_of_range_number_asks_again() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["Bukhara", "7", "abc", "1"]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .choose("gazetteer")
        .unwrap();
    assert_eq!(resolution, Resolution::Resolved(1));
    let complaints = script
        .transcript()
        .iter()
        .filter(|l| l.as_str() == "Please enter a number between 1 and 1")
        .count();
    assert_eq!(complaints, 2);
}

#[test]
fn candidates_are_capped() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["a", ""]);
    let resolution = Resolver::new(&fixture.store, &mut script, 2)
        .choose("lexicon")
        .unwrap();
    assert_eq!(resolution, Resolution::Skipped);
    assert!(script.saw("  2. "));
    assert!(!script.saw("  3. "));
}

#[test]
fn typed_apostrophe_finds_curly_one() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(["Qur'an", "1"]);
    let resolution = Resolver::new(&fixture.store, &mut script, 20)
        .choose("bibliography")
        .unwrap();
    assert_eq!(resolution, Resolution::Resolved(3));
}

#[test]
fn case_mode_follows_the_store() {
    let fixture = Fixture::seeded();
    let mut strict = Script::new(["muqaddimah", ""]);
    let resolution = Resolver::new(&fixture.store, &mut strict, 20)
        .choose("bibliography")
        .unwrap();
    assert_eq!(resolution, Resolution::Skipped);

    let relaxed = fixture.store.with_case(CaseMode::Insensitive);
    let mut script = Script::new(["muqaddimah", "1"]);
    let resolution = Resolver::new(&relaxed, &mut script, 20)
        .choose("bibliography")
        .unwrap();
    assert_eq!(resolution, Resolution::Resolved(2));
}

#[test]
fn plain_column_is_not_resolvable() {
    let fixture = Fixture::seeded();
    let mut script = Script::new(Vec::<String>::new());
    let err = Resolver::new(&fixture.store, &mut script, 20)
        .resolve("lexicon", "Term")
        .unwrap_err();
    assert!(matches!(err, EurasiaError::NotForeignKey { .. }));
}
