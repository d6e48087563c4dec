use procwatch::core::config::Config;
use procwatch::ErrorKind;
use tempfile::TempDir;

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config {
        interval_secs: 0.5,
        history_capacity: 250,
        disk_path: "/data".to_string(),
        terminate_on_exit: false,
        ..Default::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_missing_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_config_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{ "bar_width": 20 }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.bar_width, 20);
    assert_eq!(loaded.history_capacity, Config::default().history_capacity);
}

#[test]
fn test_config_invalid_json_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}

#[test]
fn test_config_out_of_range_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{ "interval_secs": -2.0 }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    let err = loaded.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}
