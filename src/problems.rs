//! Problem bank CRUD. Problems are shared across teachers; ownership only
//! gates the `is_owner` flag surfaced to the front end.

use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProblemInput {
    teacher_email: String,
    title: String,
    difficulty: Difficulty,
    content: String,
    #[serde(default)]
    input_example: Option<String>,
    #[serde(default)]
    output_example: Option<String>,
    #[serde(default)]
    chapter_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProblemUpdate {
    id: String,
    title: String,
    difficulty: Difficulty,
    content: String,
    #[serde(default)]
    input_example: Option<String>,
    #[serde(default)]
    output_example: Option<String>,
    #[serde(default)]
    chapter_id: Option<String>,
}

pub fn add(conn: &Connection, data: &str) -> Result<serde_json::Value, Error> {
    let input: ProblemInput = serde_json::from_str(data)?;
    let problem_id = Uuid::new_v4().to_string();
    let now = db::now_timestamp();
    conn.execute(
        "INSERT INTO problems(id, teacher_email, title, difficulty, content,
                              input_example, output_example, chapter_id, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        (
            &problem_id,
            input.teacher_email.trim(),
            input.title.trim(),
            input.difficulty.as_str(),
            input.content,
            input.input_example,
            input.output_example,
            input.chapter_id,
            now,
        ),
    )?;
    Ok(json!({ "id": problem_id, "message": "problem added" }))
}

pub fn list(conn: &Connection, teacher_email: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_email, title, difficulty, content, input_example,
                output_example, chapter_id, created_at, updated_at,
                CASE WHEN teacher_email = ? THEN 1 ELSE 0 END AS is_owner
         FROM problems
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let problems = stmt
        .query_map([teacher_email.trim()], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "teacher_email": r.get::<_, String>(1)?,
                "title": r.get::<_, String>(2)?,
                "difficulty": r.get::<_, String>(3)?,
                "content": r.get::<_, String>(4)?,
                "input_example": r.get::<_, Option<String>>(5)?,
                "output_example": r.get::<_, Option<String>>(6)?,
                "chapter_id": r.get::<_, Option<String>>(7)?,
                "created_at": r.get::<_, String>(8)?,
                "updated_at": r.get::<_, String>(9)?,
                "is_owner": r.get::<_, i64>(10)? != 0,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "problems": problems }))
}

pub fn update(conn: &Connection, data: &str) -> Result<serde_json::Value, Error> {
    let input: ProblemUpdate = serde_json::from_str(data)?;
    let changed = conn.execute(
        "UPDATE problems SET
             title = ?, difficulty = ?, content = ?, input_example = ?,
             output_example = ?, chapter_id = ?, updated_at = ?
         WHERE id = ?",
        (
            input.title.trim(),
            input.difficulty.as_str(),
            input.content,
            input.input_example,
            input.output_example,
            input.chapter_id,
            db::now_timestamp(),
            &input.id,
        ),
    )?;
    if changed == 0 {
        return Err(Error::invalid("problem not found"));
    }
    Ok(json!({ "message": "problem updated" }))
}

pub fn delete(conn: &Connection, problem_id: &str) -> Result<serde_json::Value, Error> {
    let changed = conn.execute("DELETE FROM problems WHERE id = ?", [problem_id])?;
    if changed == 0 {
        return Err(Error::invalid("problem not found"));
    }
    Ok(json!({ "message": "problem deleted" }))
}

pub fn set_chapter(
    conn: &Connection,
    problem_id: &str,
    chapter_id: &str,
) -> Result<serde_json::Value, Error> {
    let chapter_exists: Option<String> = conn
        .query_row(
            "SELECT chapter_id FROM teaching_contents WHERE chapter_id = ?",
            [chapter_id],
            |r| r.get(0),
        )
        .optional()?;
    if chapter_exists.is_none() {
        return Err(Error::invalid("chapter not found"));
    }

    let changed = conn.execute(
        "UPDATE problems SET chapter_id = ?, updated_at = ? WHERE id = ?",
        (chapter_id, db::now_timestamp(), problem_id),
    )?;
    if changed == 0 {
        return Err(Error::invalid("problem not found"));
    }
    Ok(json!({ "message": "problem linked to chapter" }))
}
