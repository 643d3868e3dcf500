//! Config file resolution tests
//!
//! Tests that touch SONGSORT_CONFIG are marked #[serial] so they never race
//! on the process environment.

use serial_test::serial;
use songsort_common::config::{load_toml_config, TomlConfig, CONFIG_ENV_VAR};
use songsort_common::Error;
use std::env;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_explicit_path_is_loaded() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "songsort.toml",
        "[logging]\nlevel = \"debug\"\n\n[recognize]\nconcurrency = 3\n",
    );

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.recognize.concurrency, Some(3));
    assert_eq!(config.organize, Default::default());
}

#[test]
#[serial]
fn test_env_var_path_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "env.toml", "[organize]\npattern = \"%A/%S\"\n");
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = load_toml_config(None).unwrap();
    assert_eq!(config.organize.pattern.as_deref(), Some("%A/%S"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let env_path = write_config(&dir, "env.toml", "[recognize]\ndump_every = 7\n");
    let explicit = write_config(&dir, "explicit.toml", "[recognize]\ndump_every = 42\n");
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let config = load_toml_config(Some(&explicit)).unwrap();
    assert_eq!(config.recognize.dump_every, Some(42));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_path_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_malformed_explicit_path_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bad.toml", "[recognize\n");

    assert!(matches!(load_toml_config(Some(&path)), Err(Error::Config(_))));
}

#[test]
fn test_unknown_keys_are_tolerated() {
    let config = TomlConfig::from_toml_str("[recognize]\nfuture_option = 1\n").unwrap();
    assert_eq!(config.recognize, Default::default());
}
