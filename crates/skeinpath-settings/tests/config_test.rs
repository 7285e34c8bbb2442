use skeinpath_core::FilletMode;
use skeinpath_settings::{Config, SettingsError};
use tempfile::tempdir;

#[test]
fn test_toml_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::new();
    config.fillet.mode = FilletMode::ArcSegment;
    config.comb.minimum_departure_distance_over_perimeter_width = 5.0;
    config.output.decimal_places = 4;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::new();
    config.stream.fill_inset = 0.5;
    config.comb.enabled = false;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[stream]\nfill_inset = -0.2\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::LoadError(_)));
}

#[test]
fn test_save_rejects_unknown_format() {
    let dir = tempdir().unwrap();
    let err = Config::new()
        .save_to_file(&dir.path().join("config.ini"))
        .unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));
}
