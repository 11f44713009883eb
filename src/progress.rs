//! Section completion progress.

use rusqlite::Connection;
use serde_json::json;

use crate::db;
use crate::error::Error;

pub fn save(
    conn: &Connection,
    student_id: &str,
    section_id: &str,
) -> Result<serde_json::Value, Error> {
    conn.execute(
        "INSERT INTO section_progress(student_id, section_id, completed_at)
         VALUES(?, ?, ?)
         ON CONFLICT(student_id, section_id) DO UPDATE SET
             completed_at = excluded.completed_at",
        (student_id, section_id, db::now_timestamp()),
    )?;
    Ok(json!({ "message": "section marked as completed" }))
}

pub fn completed(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT section_id, completed_at
         FROM section_progress
         WHERE student_id = ?
         ORDER BY completed_at, section_id",
    )?;
    let sections = stmt
        .query_map([student_id], |r| {
            Ok(json!({
                "section_id": r.get::<_, String>(0)?,
                "completed_at": r.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "completed_sections": sections }))
}

/// Bulk import of completed section ids, e.g. when migrating a student from
/// client-side storage. Already present sections keep their original
/// completion time.
pub fn import(conn: &Connection, student_id: &str, data: &str) -> Result<serde_json::Value, Error> {
    let section_ids: Vec<String> = serde_json::from_str(data)?;

    let tx = conn.unchecked_transaction()?;
    let now = db::now_timestamp();
    let mut imported = 0usize;
    for section_id in &section_ids {
        imported += tx.execute(
            "INSERT OR IGNORE INTO section_progress(student_id, section_id, completed_at)
             VALUES(?, ?, ?)",
            (student_id, section_id, &now),
        )?;
    }
    tx.commit()?;

    Ok(json!({ "message": "progress imported", "imported": imported }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        save(&conn, "s1", "ch1-s1").expect("save");
        save(&conn, "s1", "ch1-s1").expect("save again");

        let listed = completed(&conn, "s1").expect("completed");
        assert_eq!(listed["completed_sections"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn import_skips_already_completed_sections() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        save(&conn, "s1", "ch1-s1").expect("save");
        let result = import(&conn, "s1", r#"["ch1-s1", "ch1-s2", "ch2-s1"]"#).expect("import");
        assert_eq!(result["imported"].as_u64(), Some(2));

        let listed = completed(&conn, "s1").expect("completed");
        assert_eq!(listed["completed_sections"].as_array().map(Vec::len), Some(3));
    }
}
