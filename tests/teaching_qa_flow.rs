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

fn chapter(id: &str, title: &str) -> String {
    json!({
        "chapter_id": id,
        "teacher_email": "t@example.com",
        "chapter_number": id.trim_start_matches("ch"),
        "chapter_title": title,
        "chapter_difficulty": "beginner",
        "chapter_description": "introductory material",
        "sections": [
            { "id": format!("{}-s1", id), "title": "Overview", "type": "video" },
            { "id": format!("{}-s2", id), "title": "Exercises", "type": "quiz" },
        ],
    })
    .to_string()
}

#[test]
fn teaching_crud_and_problem_chapter_link() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    run_ok(&db, &["teaching", "add", &chapter("ch2", "Loops")]);
    run_ok(&db, &["teaching", "add", &chapter("ch10", "Graphs")]);
    run_ok(&db, &["teaching", "add", &chapter("ch1", "Variables")]);
    run_err(&db, &["teaching", "add", &chapter("ch1", "Variables")]);

    let listed = run_ok(&db, &["teaching", "list"]);
    let ids: Vec<&str> = listed["chapters"]
        .as_array()
        .expect("array")
        .iter()
        .map(|c| c["chapter_id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, ["ch1", "ch2", "ch10"]);

    let problem = json!({
        "teacher_email": "t@example.com",
        "title": "Sum a list",
        "difficulty": "easy",
        "content": "Add all numbers.",
    })
    .to_string();
    let added = run_ok(&db, &["problem", "add", &problem]);
    let problem_id = added["id"].as_str().expect("id").to_string();

    run_err(&db, &["problem", "set-chapter", &problem_id, "ch99"]);
    run_ok(&db, &["problem", "set-chapter", &problem_id, "ch2"]);

    let listed = run_ok(&db, &["problem", "list", "t@example.com"]);
    assert_eq!(
        listed["problems"][0]["chapter_id"].as_str(),
        Some("ch2")
    );
    assert_eq!(listed["problems"][0]["is_owner"].as_bool(), Some(true));
    let other_view = run_ok(&db, &["problem", "list", "other@example.com"]);
    assert_eq!(other_view["problems"][0]["is_owner"].as_bool(), Some(false));

    run_ok(&db, &["teaching", "delete", "ch10"]);
    run_err(&db, &["teaching", "get", "ch10"]);
}

#[test]
fn question_answer_and_withdraw_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("eduplat.sqlite3");

    let submitted = run_ok(
        &db,
        &["qa", "submit", "s@example.com", "Ownership", "Why does this move?"],
    );
    let id = submitted["id"].as_str().expect("id").to_string();

    // Withdrawing before any answer exists must fail and keep it pending.
    run_err(&db, &["qa", "delete-answer", &id]);
    let mine = run_ok(&db, &["qa", "student-questions", "s@example.com"]);
    assert_eq!(mine["questions"][0]["status"].as_str(), Some("pending"));

    run_ok(&db, &["qa", "answer", &id, "Values move by default."]);
    let all = run_ok(&db, &["qa", "all-questions"]);
    assert_eq!(all["questions"][0]["status"].as_str(), Some("answered"));
    assert_eq!(all["questions"][0]["email"].as_str(), Some("s@example.com"));

    run_ok(&db, &["qa", "delete-answer", &id]);
    run_err(&db, &["qa", "delete-answer", &id]);
    let mine = run_ok(&db, &["qa", "student-questions", "s@example.com"]);
    assert_eq!(mine["questions"][0]["status"].as_str(), Some("pending"));
    assert!(mine["questions"][0]["answer"].is_null());
}
