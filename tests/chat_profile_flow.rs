use serde_json::{json, Value};
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
fn chat_crud_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    let messages = json!([
        { "role": "user", "content": "Explain Rust lifetimes in simple terms please" },
        { "role": "assistant", "content": "Sure." },
    ])
    .to_string();
    let saved = run_ok(&db, &["chat", "save", "a@example.com", &messages]);
    let id = saved["id"].as_str().expect("id").to_string();

    let history = run_ok(&db, &["chat", "history", "a@example.com"]);
    let title = history["chats"][0]["title"].as_str().expect("title");
    assert_eq!(title, "Explain Rust lifetim...");

    let updated = json!([{ "role": "user", "content": "edited" }]).to_string();
    run_ok(&db, &["chat", "update", &id, &updated]);
    let fetched = run_ok(&db, &["chat", "get", &id]);
    assert_eq!(
        fetched["chat"]["messages"][0]["content"].as_str(),
        Some("edited")
    );

    run_ok(&db, &["chat", "delete", &id]);
    run_err(&db, &["chat", "get", &id]);
    run_err(&db, &["chat", "delete", &id]);
}

#[test]
fn chat_save_rejects_non_array_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_err(&db, &["chat", "save", "a@example.com", "{\"role\":\"user\"}"]);
}

#[test]
fn profile_upsert_and_missing_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_err(&db, &["profile", "get-student", "a@example.com"]);

    let first = json!({ "student_id": "s1", "class_name": "CS101", "name": "Kim" }).to_string();
    run_ok(&db, &["profile", "save-student", "a@example.com", &first]);

    let second = json!({ "student_id": "s1", "class_name": "CS102", "name": "Kim" }).to_string();
    run_ok(&db, &["profile", "save-student", "a@example.com", &second]);

    let fetched = run_ok(&db, &["profile", "get-student", "a@example.com"]);
    assert_eq!(
        fetched["profile"]["class_name"].as_str(),
        Some("CS102")
    );

    let teacher = json!({ "teacher_id": "t1", "department": "CS", "title": "Lecturer" }).to_string();
    run_ok(&db, &["profile", "save-teacher", "t@example.com", &teacher]);
    let fetched = run_ok(&db, &["profile", "get-teacher", "t@example.com"]);
    assert_eq!(fetched["profile"]["department"].as_str(), Some("CS"));
}

#[test]
fn analysis_save_and_latest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_err(&db, &["analysis", "latest", "s1"]);

    let partial = json!({ "pattern": "p", "strengths": "s", "weaknesses": "", "suggestions": "g" })
        .to_string();
    run_err(&db, &["analysis", "save", "s1", &partial]);

    let full = json!({
        "pattern": "steady evening practice",
        "strengths": "arrays",
        "weaknesses": "recursion",
        "suggestions": "one recursion problem per day",
    })
    .to_string();
    run_ok(&db, &["analysis", "save", "s1", &full]);

    let latest = run_ok(&db, &["analysis", "latest", "s1"]);
    assert_eq!(
        latest["analysis"]["pattern"].as_str(),
        Some("steady evening practice")
    );
}

#[test]
fn progress_and_chapter_completion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    let chapter = json!({
        "chapter_id": "ch1",
        "teacher_email": "t@example.com",
        "chapter_number": "1",
        "chapter_title": "Basics",
        "chapter_difficulty": "beginner",
        "chapter_description": "d",
        "sections": [
            { "id": "ch1-s1", "title": "Overview", "type": "video" },
            { "id": "ch1-s2", "title": "Quiz", "type": "quiz" },
        ],
    })
    .to_string();
    run_ok(&db, &["teaching", "add", &chapter]);

    run_ok(&db, &["progress", "save", "s1", "ch1-s1"]);
    run_ok(&db, &["progress", "save", "s1", "ch1-s1"]);
    run_ok(&db, &["progress", "import", "s1", "[\"ch1-s1\", \"ch1-s2\"]"]);

    let completed = run_ok(&db, &["progress", "completed", "s1"]);
    assert_eq!(
        completed["completed_sections"].as_array().map(Vec::len),
        Some(2)
    );

    let chapters = run_ok(&db, &["activity", "chapters", "s1"]);
    let first = &chapters["data"]["chapters"][0];
    assert_eq!(first["total_sections"].as_u64(), Some(2));
    assert_eq!(first["completed_sections"].as_u64(), Some(2));
    assert_eq!(first["completion_rate"].as_f64(), Some(100.0));
}
