//! Integration tests for the carddav2txt command line

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

const SETTINGS: [&str; 5] = [
    "CARDDAV2TXT_DESTINATION_PATH",
    "CARDDAV2TXT_FILE_EXTENSION",
    "CARDDAV_USER",
    "CARDDAV_PW",
    "CARDDAV_URI",
];

/// Get the binary with every setting cleared from the environment
fn carddav2txt_cmd() -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin("carddav2txt").unwrap();
    for var in SETTINGS {
        cmd.env_remove(var);
    }
    cmd
}

/// Write an empty config file so the user's own config is never picked up
fn empty_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

#[test]
fn help_lists_options() {
    carddav2txt_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--destination"));
}

#[test]
fn missing_destination_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let config = empty_config(tmp.path());

    carddav2txt_cmd()
        .arg("--config")
        .arg(&config)
        .env("CARDDAV_USER", "me")
        .env("CARDDAV_PW", "secret")
        .env("CARDDAV_URI", "https://dav.invalid/contacts/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CARDDAV2TXT_DESTINATION_PATH"));
}

#[test]
fn missing_credentials_are_configuration_errors() {
    let tmp = TempDir::new().unwrap();
    let config = empty_config(tmp.path());

    carddav2txt_cmd()
        .arg("--config")
        .arg(&config)
        .env("CARDDAV2TXT_DESTINATION_PATH", tmp.path())
        .env("CARDDAV_URI", "https://dav.invalid/contacts/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CARDDAV_USER"));
}

#[test]
fn nonexistent_destination_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = empty_config(tmp.path());

    carddav2txt_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--destination")
        .arg(tmp.path().join("missing"))
        .env("CARDDAV_USER", "me")
        .env("CARDDAV_PW", "secret")
        .env("CARDDAV_URI", "https://dav.invalid/contacts/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("destination folder must exist"));
}

#[test]
fn unknown_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();

    carddav2txt_cmd()
        .arg("--config")
        .arg(tmp.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invalid_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(&config, "destination = [").unwrap();

    carddav2txt_cmd()
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn unreachable_server_leaves_folder_untouched() {
    let tmp = TempDir::new().unwrap();
    let config = empty_config(tmp.path());
    let dest = tmp.path().join("contacts");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("Rubin Kuhn.txt"), "---\nfn: Rubin Kuhn\nuid: ab4\n---\n").unwrap();

    carddav2txt_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--destination")
        .arg(&dest)
        .env("CARDDAV_USER", "me")
        .env("CARDDAV_PW", "secret")
        .env("CARDDAV_URI", "http://127.0.0.1:9/contacts/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to fetch address book"));

    assert!(dest.join("Rubin Kuhn.txt").exists());
    assert!(!dest.join("archived").exists());
}
