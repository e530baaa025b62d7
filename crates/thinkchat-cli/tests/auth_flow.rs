//! Integration tests for the OTP login flow.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Creates a temp THINKCHAT_HOME directory for test isolation.
fn temp_home() -> TempDir {
    TempDir::new().expect("create temp thinkchat home")
}

/// Pulls the 6-digit code out of the mock delivery line printed by login.
fn extract_code(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .find(|l| l.contains("[mock delivery]"))
        .expect("login output includes the mock delivery line");
    let code = line
        .rsplit(' ')
        .next()
        .expect("delivery line ends with the code")
        .trim()
        .to_string();
    assert_eq!(code.len(), 6, "expected a 6-digit code, got '{code}'");
    code
}

fn login(home: &TempDir, email: &str) -> String {
    let output = cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["login", "--email", email])
        .output()
        .expect("run login");
    assert!(output.status.success());
    extract_code(&output.stdout)
}

#[test]
fn test_login_then_verify_succeeds() {
    let home = temp_home();
    let code = login(&home, "dana@example.com");

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", &code])
        .assert()
        .success()
        .stdout(predicate::str::contains("You're in"));

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dana@example.com"));
}

#[test]
fn test_wrong_code_counts_down_attempts() {
    let home = temp_home();
    let code = login(&home, "dana@example.com");

    // Codes are drawn from 100000..=999999, so 000000 never matches.
    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", "000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("You have 2 attempts left"));

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", "000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("You have 1 attempt left"));

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", "000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("You have 0 attempts left"));

    // Budget spent: even the right code is rejected until a new one is issued.
    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", &code])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Too many failed attempts"));
}

#[test]
fn test_resend_is_rate_limited() {
    let home = temp_home();
    login(&home, "dana@example.com");

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["resend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please wait"));
}

#[test]
fn test_verify_without_login_fails() {
    let home = temp_home();

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", "123456"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No OTP found"));
}

#[test]
fn test_logout_clears_identity() {
    let home = temp_home();
    let code = login(&home, "dana@example.com");

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["verify", &code])
        .assert()
        .success();

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_exec_requires_verified_auth() {
    let home = temp_home();

    cargo_bin_cmd!("thinkchat")
        .env("THINKCHAT_HOME", home.path())
        .args(["exec", "-p", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}
