use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("thinkchat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("imagine"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("memory"));
}

#[test]
fn test_settings_help_shows_subcommands() {
    cargo_bin_cmd!("thinkchat")
        .args(["settings", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_memory_help_shows_subcommands() {
    cargo_bin_cmd!("thinkchat")
        .args(["memory", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("clear"));
}

#[test]
fn test_exec_help_shows_mode_and_attach() {
    cargo_bin_cmd!("thinkchat")
        .args(["exec", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--attach"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("thinkchat")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0"));
}
