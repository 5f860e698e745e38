//! Config loading, TOML parsing, and env var override tests.
//!
//! The env var test is `#[ignore]` (it mutates process state and conflicts in parallel).
//! Run it with: `cargo test --test config_tests -- --ignored --test-threads=1`

use sitedb::distributed::CentralizedCommunicator;
use sitedb::Config;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, text: &str) -> String {
    let path = dir.path().join("sitedb.toml");
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_config_default_round_bound() {
    let config = Config::default();
    assert_eq!(config.engine.max_rounds, 100);
    assert_eq!(CentralizedCommunicator::from_config(&config).max_rounds(), 100);
}

#[test]
fn test_config_default_site_name() {
    assert_eq!(Config::default().engine.site, "Site 1");
}

#[test]
fn test_config_from_file_full() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [engine]
        site = "Site 2"
        max_rounds = 12

        [engine.tables]
        B = "data/b.csv"

        [logging]
        level = "debug"
        format = "json"

        [http]
        host = "0.0.0.0"
        port = 8082
        timeout_ms = 500

        [sites]
        "Site 1" = "http://10.0.0.1:8081"
        "Site 2" = "http://10.0.0.2:8082"
        "#,
    );

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.engine.site, "Site 2");
    assert_eq!(config.engine.max_rounds, 12);
    assert_eq!(config.engine.tables["B"], PathBuf::from("data/b.csv"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.http.host, "0.0.0.0");
    assert_eq!(config.http.port, 8082);
    assert_eq!(config.http.timeout_ms, 500);
    assert_eq!(config.sites.len(), 2);
    assert_eq!(CentralizedCommunicator::from_config(&config).max_rounds(), 12);
}

#[test]
fn test_config_from_file_partial_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[http]\nport = 9001\n");
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.http.port, 9001);
    assert_eq!(config.http.host, "127.0.0.1");
    assert_eq!(config.engine.max_rounds, 100);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let config = Config::from_file(&path.to_string_lossy()).unwrap();
    assert_eq!(config.engine.max_rounds, 100);
}

#[test]
fn test_config_invalid_type_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[engine]\nmax_rounds = \"many\"\n");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_explicit_config_that_fails_to_load_is_error() {
    let dir = TempDir::new().unwrap();
    let path = PathBuf::from(write_config(&dir, "[engine]\nmax_rounds = \"many\"\n"));
    let err = Config::resolve(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("sitedb.toml"));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(Config::resolve(Some(&path)).is_err());
}

#[test]
fn test_explicit_config_is_used() {
    let dir = TempDir::new().unwrap();
    let path = PathBuf::from(write_config(&dir, "[engine]\nmax_rounds = 7\n"));
    assert_eq!(Config::resolve(Some(&path)).unwrap().engine.max_rounds, 7);
}

#[test]
#[ignore]
fn test_config_env_override() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[engine]\nmax_rounds = 12\n");

    env::set_var("SITEDB_ENGINE__MAX_ROUNDS", "3");
    env::set_var("SITEDB_HTTP__PORT", "9100");
    let config = Config::from_file(&path);
    env::remove_var("SITEDB_ENGINE__MAX_ROUNDS");
    env::remove_var("SITEDB_HTTP__PORT");

    let config = config.unwrap();
    assert_eq!(config.engine.max_rounds, 3);
    assert_eq!(config.http.port, 9100);
}
