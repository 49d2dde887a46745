use std::path::PathBuf;

use eurasia::EurasiaError;
use eurasia::settings::Settings;
use eurasia::store::CaseMode;

#[test]
fn defaults_without_a_file() {
    let settings = Settings::default();
    assert_eq!(settings.max_results, 25);
    assert_eq!(settings.resolver_limit, 20);
    assert_eq!(settings.notes_threshold, 5);
    assert_eq!(settings.query_case, CaseMode::Sensitive);
    assert_eq!(settings.mutation_case, CaseMode::Insensitive);
    assert!(settings.database_path.ends_with("database_eurasia_7.0.db"));
}

#[test]
fn file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eurasia.toml");
    std::fs::write(
        &path,
        "database_path = \"/srv/research/eurasia.db\"\nmax_results = 10\nquery_case = \"insensitive\"\n",
    )
    .unwrap();
    let settings = Settings::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.database_path, PathBuf::from("/srv/research/eurasia.db"));
    assert_eq!(settings.max_results, 10);
    assert_eq!(settings.query_case, CaseMode::Insensitive);
    assert_eq!(settings.notes_threshold, 5);

    let moved = settings.with_database(PathBuf::from("other.db"));
    assert_eq!(moved.database_path, PathBuf::from("other.db"));
}

#[test]
fn named_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::load(Some(dir.path().join("missing.toml").as_path())).unwrap_err();
    assert!(matches!(err, EurasiaError::Config(_)));
}

#[test]
fn unknown_case_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eurasia.toml");
    std::fs::write(&path, "mutation_case = \"sideways\"\n").unwrap();
    assert!(matches!(Settings::load(Some(path.as_path())), Err(EurasiaError::Config(_))));
}
