use serde_json::Value;
use std::path::Path;
use std::process::Command;

fn run(db: &Path, args: &[&str]) -> (bool, Value) {
    let exe = env!("CARGO_BIN_EXE_eduplat");
    let output = Command::new(exe)
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("run eduplat");
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let value: Value = serde_json::from_str(stdout.trim()).expect("parse output json");
    let success = value["success"].as_bool().unwrap_or(false);
    assert_eq!(
        success,
        output.status.success(),
        "exit code disagrees with payload: {}",
        value
    );
    (success, value)
}

fn run_ok(db: &Path, args: &[&str]) -> Value {
    let (success, value) = run(db, args);
    assert!(success, "expected success, got {}", value);
    value
}

fn run_err(db: &Path, args: &[&str]) -> Value {
    let (success, value) = run(db, args);
    assert!(!success, "expected failure, got {}", value);
    value
}

#[test]
fn register_login_and_duplicate_rejection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_ok(
        &db,
        &["auth", "register", "--role", "student", "kim@example.com", "pw1"],
    );
    run_err(
        &db,
        &["auth", "register", "--role", "student", "kim@example.com", "pw2"],
    );
    // Same address is a separate account under the teacher role.
    run_ok(
        &db,
        &["auth", "register", "--role", "teacher", "kim@example.com", "pw1"],
    );

    run_ok(
        &db,
        &["auth", "login", "--role", "student", "kim@example.com", "pw1"],
    );
}

#[test]
fn wrong_password_and_unknown_email_fail_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_ok(
        &db,
        &["auth", "register", "--role", "student", "kim@example.com", "pw1"],
    );

    let wrong = run_err(
        &db,
        &["auth", "login", "--role", "student", "kim@example.com", "nope"],
    );
    let unknown = run_err(
        &db,
        &["auth", "login", "--role", "student", "none@example.com", "pw1"],
    );
    assert_eq!(wrong["message"], unknown["message"]);
}

#[test]
fn empty_credentials_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_err(
        &db,
        &["auth", "register", "--role", "student", "   ", "pw"],
    );
    run_err(
        &db,
        &["auth", "register", "--role", "student", "a@example.com", ""],
    );
}

#[test]
fn missing_argument_reports_failure_json_on_stdout() {
    // Callers only read stdout, so even argument errors must come back as a
    // failure object there.
    let exe = env!("CARGO_BIN_EXE_eduplat");
    let output = Command::new(exe)
        .args(["chat", "get"])
        .output()
        .expect("run eduplat");
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let value: Value = serde_json::from_str(stdout.trim()).expect("parse output json");
    assert_eq!(value["success"].as_bool(), Some(false));
    assert!(!value["message"].as_str().expect("message").is_empty());
}

#[test]
fn init_reports_database_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("nested/dir/eduplat.sqlite3");

    let value = run_ok(&db, &["init"]);
    assert!(value["message"]
        .as_str()
        .expect("message")
        .contains("eduplat.sqlite3"));
    assert!(db.exists());
}
