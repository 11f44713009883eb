//! Per-student activity views for the dashboard.

use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

use crate::error::Error;

const RECENT_LIMIT: usize = 10;

/// Merged feed of recent submissions and questions, newest first.
pub fn recent(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let mut activities: Vec<(String, serde_json::Value)> = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT s.id, s.submitted_at, s.submit_result, p.title
         FROM submissions s
         JOIN problems p ON s.problem_id = p.id
         WHERE s.student_id = ?
         ORDER BY s.submitted_at DESC
         LIMIT 10",
    )?;
    let submissions = stmt.query_map([student_id], |r| {
        let time: String = r.get(1)?;
        let result: String = r.get(2)?;
        let title: String = r.get(3)?;
        Ok((
            time.clone(),
            json!({
                "id": r.get::<_, String>(0)?,
                "type": "submission",
                "description": format!("{} - {}", title, result),
                "time": time,
            }),
        ))
    })?;
    for entry in submissions {
        activities.push(entry?);
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, created_at
         FROM questions
         WHERE email = (SELECT email FROM profiles_student WHERE student_id = ?)
         ORDER BY created_at DESC
         LIMIT 5",
    )?;
    let questions = stmt.query_map([student_id], |r| {
        let time: String = r.get(2)?;
        Ok((
            time.clone(),
            json!({
                "id": r.get::<_, String>(0)?,
                "type": "question",
                "description": r.get::<_, String>(1)?,
                "time": time,
            }),
        ))
    })?;
    for entry in questions {
        activities.push(entry?);
    }

    activities.sort_by(|a, b| b.0.cmp(&a.0));
    activities.truncate(RECENT_LIMIT);
    let activities: Vec<serde_json::Value> = activities.into_iter().map(|(_, v)| v).collect();

    Ok(json!({ "activities": activities }))
}

/// Per-chapter completion computed from each chapter's own section list.
pub fn chapters(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT section_id FROM section_progress WHERE student_id = ?",
    )?;
    let completed: HashSet<String> = stmt
        .query_map([student_id], |r| r.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT chapter_id, chapter_title, sections
         FROM teaching_contents
         ORDER BY CAST(substr(chapter_id, 3) AS INTEGER)",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut chapters = Vec::new();
    for (chapter_id, chapter_title, sections_raw) in rows {
        let sections: Vec<serde_json::Value> = serde_json::from_str(&sections_raw).unwrap_or_default();
        let total = sections.len();
        let completed_count = sections
            .iter()
            .filter_map(|s| s.get("id").and_then(|v| v.as_str()))
            .filter(|id| completed.contains(*id))
            .count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            (completed_count as f64 / total as f64 * 1000.0).round() / 10.0
        };

        chapters.push(json!({
            "chapter_id": chapter_id,
            "chapter_title": chapter_title,
            "sections": sections,
            "total_sections": total,
            "completed_sections": completed_count,
            "completion_rate": completion_rate,
        }));
    }

    Ok(json!({ "data": { "chapters": chapters } }))
}
