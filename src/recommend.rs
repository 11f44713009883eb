//! Learning recommendations.
//!
//! Saving a batch replaces the student's unread rows; rows the student has
//! already read are history and are never deleted or re-marked. Listing shows
//! unread rows only, highest priority first.

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationInput {
    title: String,
    description: String,
    priority: Priority,
    #[serde(default)]
    resources: serde_json::Value,
    #[serde(default)]
    actionable: bool,
    #[serde(default, rename = "problemId")]
    problem_id: Option<String>,
    #[serde(default, rename = "chapterId")]
    chapter_id: Option<String>,
}

pub fn save(conn: &Connection, student_id: &str, data: &str) -> Result<serde_json::Value, Error> {
    let batch: Vec<RecommendationInput> = serde_json::from_str(data)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM recommendations WHERE student_id = ? AND is_read = 0",
        [student_id],
    )?;

    let now = db::now_timestamp();
    for rec in &batch {
        let resources = if rec.resources.is_null() {
            json!([])
        } else {
            rec.resources.clone()
        };
        tx.execute(
            "INSERT INTO recommendations(id, student_id, title, description,
                 priority, resources, actionable, problem_id, chapter_id,
                 is_read, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            (
                Uuid::new_v4().to_string(),
                student_id,
                &rec.title,
                &rec.description,
                rec.priority.as_str(),
                serde_json::to_string(&resources)?,
                rec.actionable,
                &rec.problem_id,
                &rec.chapter_id,
                &now,
            ),
        )?;
    }
    tx.commit()?;

    tracing::debug!(count = batch.len(), "replaced unread recommendations");
    Ok(json!({ "message": "recommendations saved", "count": batch.len() }))
}

pub fn list(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, priority, resources, actionable,
                problem_id, chapter_id, created_at
         FROM recommendations
         WHERE student_id = ? AND is_read = 0
         ORDER BY
             CASE priority
                 WHEN 'high' THEN 1
                 WHEN 'medium' THEN 2
                 WHEN 'low' THEN 3
             END,
             created_at DESC, rowid DESC",
    )?;
    let recommendations = stmt
        .query_map([student_id], |r| {
            let resources_raw: String = r.get(4)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "description": r.get::<_, String>(2)?,
                "priority": r.get::<_, String>(3)?,
                "resources": decode_resources(&resources_raw),
                "actionable": r.get::<_, i64>(5)? != 0,
                "problemId": r.get::<_, Option<String>>(6)?,
                "chapterId": r.get::<_, Option<String>>(7)?,
                "created_at": r.get::<_, String>(8)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "recommendations": recommendations }))
}

pub fn mark_read(
    conn: &Connection,
    student_id: &str,
    recommendation_id: &str,
) -> Result<serde_json::Value, Error> {
    let changed = conn.execute(
        "UPDATE recommendations
         SET is_read = 1, read_at = ?
         WHERE id = ? AND student_id = ? AND is_read = 0",
        (db::now_timestamp(), recommendation_id, student_id),
    )?;
    if changed == 0 {
        return Err(Error::invalid("recommendation not found"));
    }
    Ok(json!({ "message": "marked as read" }))
}

fn decode_resources(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| json!([]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(titles: &[(&str, &str)]) -> String {
        let recs: Vec<serde_json::Value> = titles
            .iter()
            .map(|(title, priority)| {
                json!({
                    "title": title,
                    "description": "practice",
                    "priority": priority,
                    "resources": ["https://example.com"],
                    "actionable": true,
                })
            })
            .collect();
        json!(recs).to_string()
    }

    #[test]
    fn list_orders_by_priority_rank() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        save(
            &conn,
            "s1",
            &batch(&[("low one", "low"), ("high one", "high"), ("mid one", "medium")]),
        )
        .expect("save");

        let listed = list(&conn, "s1").expect("list");
        let titles: Vec<&str> = listed["recommendations"]
            .as_array()
            .expect("array")
            .iter()
            .map(|r| r["title"].as_str().expect("title"))
            .collect();
        assert_eq!(titles, ["high one", "mid one", "low one"]);
    }

    #[test]
    fn save_replaces_unread_but_keeps_read_history() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        save(&conn, "s1", &batch(&[("old", "high")])).expect("save");
        let listed = list(&conn, "s1").expect("list");
        let read_id = listed["recommendations"][0]["id"]
            .as_str()
            .expect("id")
            .to_string();
        mark_read(&conn, "s1", &read_id).expect("mark read");

        save(&conn, "s1", &batch(&[("new", "high")])).expect("save again");

        let unread = list(&conn, "s1").expect("list");
        assert_eq!(unread["recommendations"].as_array().map(Vec::len), Some(1));
        assert_eq!(
            unread["recommendations"][0]["title"].as_str(),
            Some("new")
        );

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM recommendations WHERE student_id = 's1'",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(total, 2);
    }

    #[test]
    fn mark_read_is_one_way_and_owner_scoped() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        save(&conn, "s1", &batch(&[("only", "medium")])).expect("save");
        let listed = list(&conn, "s1").expect("list");
        let id = listed["recommendations"][0]["id"]
            .as_str()
            .expect("id")
            .to_string();

        // Another student cannot touch it.
        assert!(mark_read(&conn, "s2", &id).is_err());
        assert_eq!(list(&conn, "s1").expect("list")["recommendations"]
            .as_array()
            .map(Vec::len), Some(1));

        mark_read(&conn, "s1", &id).expect("mark read");
        assert!(mark_read(&conn, "s1", &id).is_err());
        assert!(mark_read(&conn, "s1", "missing").is_err());
    }
}
