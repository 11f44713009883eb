//! Teaching content chapters. Each chapter carries its section list as a JSON
//! array; chapter ids look like `ch1`, `ch2`, ... and listing orders by the
//! numeric suffix so `ch10` sorts after `ch9`.

use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::db;
use crate::error::Error;

#[derive(Debug, Deserialize)]
struct ChapterInput {
    chapter_id: String,
    teacher_email: String,
    chapter_number: String,
    chapter_title: String,
    chapter_difficulty: String,
    chapter_description: String,
    sections: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChapterUpdate {
    chapter_id: String,
    chapter_number: String,
    chapter_title: String,
    chapter_difficulty: String,
    chapter_description: String,
    sections: serde_json::Value,
}

pub fn add(conn: &Connection, data: &str) -> Result<serde_json::Value, Error> {
    let input: ChapterInput = serde_json::from_str(data)?;
    if !input.sections.is_array() {
        return Err(Error::invalid("sections must be a JSON array"));
    }

    let exists: Option<String> = conn
        .query_row(
            "SELECT chapter_id FROM teaching_contents WHERE chapter_id = ?",
            [&input.chapter_id],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(Error::invalid("chapter already exists"));
    }

    let now = db::now_timestamp();
    conn.execute(
        "INSERT INTO teaching_contents(chapter_id, teacher_email, chapter_number,
             chapter_title, chapter_difficulty, chapter_description, sections,
             created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        (
            &input.chapter_id,
            input.teacher_email.trim(),
            &input.chapter_number,
            &input.chapter_title,
            &input.chapter_difficulty,
            &input.chapter_description,
            serde_json::to_string(&input.sections)?,
            now,
        ),
    )?;
    Ok(json!({ "chapter_id": input.chapter_id, "message": "chapter added" }))
}

pub fn list(conn: &Connection) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT chapter_id, teacher_email, chapter_number, chapter_title,
                chapter_difficulty, chapter_description, sections, created_at, updated_at
         FROM teaching_contents
         ORDER BY CAST(substr(chapter_id, 3) AS INTEGER)",
    )?;
    let chapters = stmt
        .query_map([], |r| {
            let sections_raw: String = r.get(6)?;
            Ok(json!({
                "chapter_id": r.get::<_, String>(0)?,
                "teacher_email": r.get::<_, String>(1)?,
                "chapter_number": r.get::<_, String>(2)?,
                "chapter_title": r.get::<_, String>(3)?,
                "chapter_difficulty": r.get::<_, String>(4)?,
                "chapter_description": r.get::<_, String>(5)?,
                "sections": decode_sections(&sections_raw),
                "created_at": r.get::<_, String>(7)?,
                "updated_at": r.get::<_, String>(8)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "chapters": chapters }))
}

pub fn get(conn: &Connection, chapter_id: &str) -> Result<serde_json::Value, Error> {
    let row = conn
        .query_row(
            "SELECT chapter_id, teacher_email, chapter_number, chapter_title,
                    chapter_difficulty, chapter_description, sections, created_at, updated_at
             FROM teaching_contents WHERE chapter_id = ?",
            [chapter_id],
            |r| {
                let sections_raw: String = r.get(6)?;
                Ok(json!({
                    "chapter_id": r.get::<_, String>(0)?,
                    "teacher_email": r.get::<_, String>(1)?,
                    "chapter_number": r.get::<_, String>(2)?,
                    "chapter_title": r.get::<_, String>(3)?,
                    "chapter_difficulty": r.get::<_, String>(4)?,
                    "chapter_description": r.get::<_, String>(5)?,
                    "sections": decode_sections(&sections_raw),
                    "created_at": r.get::<_, String>(7)?,
                    "updated_at": r.get::<_, String>(8)?,
                }))
            },
        )
        .optional()?;

    match row {
        Some(chapter) => Ok(json!({ "chapter": chapter })),
        None => Err(Error::invalid("chapter not found")),
    }
}

pub fn update(conn: &Connection, data: &str) -> Result<serde_json::Value, Error> {
    let input: ChapterUpdate = serde_json::from_str(data)?;
    if !input.sections.is_array() {
        return Err(Error::invalid("sections must be a JSON array"));
    }

    let changed = conn.execute(
        "UPDATE teaching_contents SET
             chapter_number = ?, chapter_title = ?, chapter_difficulty = ?,
             chapter_description = ?, sections = ?, updated_at = ?
         WHERE chapter_id = ?",
        (
            &input.chapter_number,
            &input.chapter_title,
            &input.chapter_difficulty,
            &input.chapter_description,
            serde_json::to_string(&input.sections)?,
            db::now_timestamp(),
            &input.chapter_id,
        ),
    )?;
    if changed == 0 {
        return Err(Error::invalid("chapter not found"));
    }
    Ok(json!({ "message": "chapter updated" }))
}

pub fn delete(conn: &Connection, chapter_id: &str) -> Result<serde_json::Value, Error> {
    let changed = conn.execute(
        "DELETE FROM teaching_contents WHERE chapter_id = ?",
        [chapter_id],
    )?;
    if changed == 0 {
        return Err(Error::invalid("chapter not found"));
    }
    Ok(json!({ "message": "chapter deleted" }))
}

fn decode_sections(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| json!([]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter_json(id: &str, number: &str) -> String {
        json!({
            "chapter_id": id,
            "teacher_email": "t@example.com",
            "chapter_number": number,
            "chapter_title": format!("Chapter {}", number),
            "chapter_difficulty": "beginner",
            "chapter_description": "intro",
            "sections": [{ "id": format!("{}-s1", id), "title": "Overview" }],
        })
        .to_string()
    }

    #[test]
    fn list_orders_by_numeric_suffix() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        for id in ["ch10", "ch2", "ch1"] {
            add(&conn, &chapter_json(id, id.trim_start_matches("ch"))).expect("add");
        }

        let listed = list(&conn).expect("list");
        let ids: Vec<&str> = listed["chapters"]
            .as_array()
            .expect("array")
            .iter()
            .map(|c| c["chapter_id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, ["ch1", "ch2", "ch10"]);
    }

    #[test]
    fn duplicate_chapter_id_is_rejected() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        add(&conn, &chapter_json("ch1", "1")).expect("add");
        assert!(add(&conn, &chapter_json("ch1", "1")).is_err());
    }

    #[test]
    fn update_and_delete_require_existing_chapter() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        let update_json = json!({
            "chapter_id": "ch9",
            "chapter_number": "9",
            "chapter_title": "x",
            "chapter_difficulty": "beginner",
            "chapter_description": "x",
            "sections": [],
        })
        .to_string();
        assert!(update(&conn, &update_json).is_err());
        assert!(delete(&conn, "ch9").is_err());
    }
}
