//! Student questions and teacher answers.
//!
//! A question moves pending -> answered when a teacher answers it; deleting
//! the answer moves it back. Follow-up threads are stored as a JSON array on
//! the question row.

use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::Error;

pub fn submit(
    conn: &Connection,
    email: &str,
    title: &str,
    content: &str,
) -> Result<serde_json::Value, Error> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::invalid("title must not be empty"));
    }

    let question_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO questions(id, email, title, content, status, created_at)
         VALUES(?, ?, ?, ?, 'pending', ?)",
        (&question_id, email.trim(), title, content, db::now_timestamp()),
    )?;
    Ok(json!({ "id": question_id, "message": "question submitted" }))
}

pub fn student_questions(conn: &Connection, email: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, status, answer, answered_at, follow_ups, created_at
         FROM questions
         WHERE email = ?
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let questions = stmt
        .query_map([email.trim()], |r| question_row(r, None))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "questions": questions }))
}

pub fn all_questions(conn: &Connection) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, status, answer, answered_at, follow_ups, created_at, email
         FROM questions
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let questions = stmt
        .query_map([], |r| {
            let email: String = r.get(8)?;
            question_row(r, Some(email))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "questions": questions }))
}

pub fn answer(
    conn: &Connection,
    question_id: &str,
    answer: &str,
) -> Result<serde_json::Value, Error> {
    let changed = conn.execute(
        "UPDATE questions
         SET answer = ?, status = 'answered', answered_at = ?
         WHERE id = ?",
        (answer, db::now_timestamp(), question_id),
    )?;
    if changed == 0 {
        return Err(Error::invalid("question not found"));
    }
    Ok(json!({ "message": "answer saved" }))
}

pub fn delete_answer(conn: &Connection, question_id: &str) -> Result<serde_json::Value, Error> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM questions WHERE id = ?",
            [question_id],
            |r| r.get(0),
        )
        .optional()?;

    match status.as_deref() {
        None => Err(Error::invalid("question not found")),
        Some(s) if s != "answered" => Err(Error::invalid("question has no answer to withdraw")),
        Some(_) => {
            conn.execute(
                "UPDATE questions
                 SET answer = NULL, status = 'pending', answered_at = NULL
                 WHERE id = ?",
                [question_id],
            )?;
            Ok(json!({ "message": "answer withdrawn" }))
        }
    }
}

fn question_row(
    r: &rusqlite::Row<'_>,
    email: Option<String>,
) -> rusqlite::Result<serde_json::Value> {
    let follow_ups_raw: Option<String> = r.get(6)?;
    let mut q = json!({
        "id": r.get::<_, String>(0)?,
        "title": r.get::<_, String>(1)?,
        "content": r.get::<_, String>(2)?,
        "status": r.get::<_, String>(3)?,
        "answer": r.get::<_, Option<String>>(4)?,
        "answered_at": r.get::<_, Option<String>>(5)?,
        "follow_ups": decode_follow_ups(follow_ups_raw.as_deref()),
        "created_at": r.get::<_, String>(7)?,
    });
    if let Some(email) = email {
        q["email"] = json!(email);
    }
    Ok(q)
}

fn decode_follow_ups(raw: Option<&str>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_else(|| json!([]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_then_withdraw_flow() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        let submitted = submit(&conn, "s@example.com", "Borrowing", "why?").expect("submit");
        let id = submitted["id"].as_str().expect("id").to_string();

        answer(&conn, &id, "Because aliasing.").expect("answer");
        let mine = student_questions(&conn, "s@example.com").expect("list");
        assert_eq!(mine["questions"][0]["status"].as_str(), Some("answered"));

        delete_answer(&conn, &id).expect("withdraw");
        let mine = student_questions(&conn, "s@example.com").expect("list");
        assert_eq!(mine["questions"][0]["status"].as_str(), Some("pending"));
        assert!(mine["questions"][0]["answer"].is_null());
    }

    #[test]
    fn withdraw_of_pending_question_fails_and_leaves_it_pending() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        let submitted = submit(&conn, "s@example.com", "Traits", "what?").expect("submit");
        let id = submitted["id"].as_str().expect("id").to_string();

        assert!(delete_answer(&conn, &id).is_err());
        let mine = student_questions(&conn, "s@example.com").expect("list");
        assert_eq!(mine["questions"][0]["status"].as_str(), Some("pending"));
    }

    #[test]
    fn unknown_question_ids_fail() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        assert!(answer(&conn, "nope", "x").is_err());
        assert!(delete_answer(&conn, "nope").is_err());
    }
}
