//! AI learning-behavior analysis.
//!
//! `run` gathers a student's learning data, asks the chat-completion service
//! for an assessment, and interprets the free-text reply (see `interpret`).
//! Results can be persisted and fetched back, newest row wins.

use chrono::{Duration, Local};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::ai::AiClient;
use crate::config::AiConfig;
use crate::db;
use crate::error::Error;
use crate::interpret;

const SYSTEM_PROMPT: &str = "You are an experienced education advisor specializing in \
analyzing student learning behavior and giving personalized study advice.";

pub fn run(
    conn: &Connection,
    ai_config: &AiConfig,
    student_id: &str,
) -> Result<serde_json::Value, Error> {
    let learning_data = gather_learning_data(conn, student_id)?;

    let client = AiClient::new(ai_config)?;
    let prompt = format!(
        "Analyze the following student's learning behavior data and provide a detailed \
         learning pattern analysis, strength areas, areas to improve, and study suggestions.\n\n\
         Learning data:\n{}\n\n\
         Reply with a JSON object in this exact format:\n\
         {{\n  \"pattern\": \"learning pattern analysis\",\n  \"strengths\": \"strength areas\",\n  \
         \"weaknesses\": \"areas to improve\",\n  \"suggestions\": \"study suggestions\"\n}}",
        serde_json::to_string_pretty(&learning_data)?
    );
    let reply = client.chat(SYSTEM_PROMPT, &prompt)?;
    let behavior_analysis = interpret::interpret(&reply);

    Ok(json!({
        "data": {
            "learning_data": learning_data,
            "behavior_analysis": behavior_analysis,
        }
    }))
}

#[derive(Debug, Deserialize)]
struct AnalysisInput {
    pattern: String,
    strengths: String,
    weaknesses: String,
    suggestions: String,
}

pub fn save(conn: &Connection, student_id: &str, data: &str) -> Result<serde_json::Value, Error> {
    let input: AnalysisInput = serde_json::from_str(data)?;
    for (name, value) in [
        ("pattern", &input.pattern),
        ("strengths", &input.strengths),
        ("weaknesses", &input.weaknesses),
        ("suggestions", &input.suggestions),
    ] {
        if value.trim().is_empty() {
            return Err(Error::invalid(format!("{} must not be empty", name)));
        }
    }

    conn.execute(
        "INSERT INTO ai_analyses(id, student_id, pattern, strengths, weaknesses,
             suggestions, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            student_id,
            &input.pattern,
            &input.strengths,
            &input.weaknesses,
            &input.suggestions,
            db::now_timestamp(),
        ),
    )?;
    Ok(json!({ "message": "analysis saved" }))
}

pub fn latest(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let row = conn
        .query_row(
            "SELECT pattern, strengths, weaknesses, suggestions, created_at
             FROM ai_analyses
             WHERE student_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            [student_id],
            |r| {
                Ok(json!({
                    "pattern": r.get::<_, String>(0)?,
                    "strengths": r.get::<_, String>(1)?,
                    "weaknesses": r.get::<_, String>(2)?,
                    "suggestions": r.get::<_, String>(3)?,
                    "created_at": r.get::<_, String>(4)?,
                }))
            },
        )
        .optional()?;

    match row {
        Some(analysis) => Ok(json!({ "analysis": analysis })),
        None => Err(Error::invalid("no analysis found for this student")),
    }
}

/// Learning data fed to the model. Overall stats default to zeros when the
/// student has no record; the remaining sub-queries degrade to empty lists
/// individually so a partial picture still produces an analysis.
pub fn gather_learning_data(
    conn: &Connection,
    student_id: &str,
) -> Result<serde_json::Value, Error> {
    let learning_stats = conn
        .query_row(
            "SELECT COUNT(DISTINCT problem_id),
                    SUM(CASE WHEN is_solved = 1 THEN 1 ELSE 0 END),
                    AVG(attempts_until_success),
                    AVG(time_spent_seconds),
                    MAX(time_spent_seconds),
                    MIN(CASE WHEN is_solved = 1 THEN time_spent_seconds END)
             FROM solving_stats
             WHERE student_id = ?
             GROUP BY student_id",
            [student_id],
            |r| {
                Ok(json!({
                    "student_id": student_id,
                    "total_problems": r.get::<_, i64>(0)?,
                    "solved_problems": r.get::<_, i64>(1)?,
                    "avg_attempts": r.get::<_, f64>(2)?,
                    "avg_time_spent": r.get::<_, f64>(3)?,
                    "max_time_spent": r.get::<_, i64>(4)?,
                    "min_time_spent": r.get::<_, Option<i64>>(5)?.unwrap_or(0),
                }))
            },
        )
        .optional()?
        .unwrap_or_else(|| {
            json!({
                "student_id": student_id,
                "total_problems": 0,
                "solved_problems": 0,
                "avg_attempts": 0,
                "avg_time_spent": 0,
                "max_time_spent": 0,
                "min_time_spent": 0,
            })
        });

    let difficulty_stats = sub_query(
        conn,
        "difficulty_stats",
        "SELECT p.difficulty,
                COUNT(DISTINCT cs.problem_id) AS attempted_problems,
                MAX(CASE WHEN cs.submit_result = 'success' THEN 1 ELSE 0 END) AS solved_problems,
                AVG(ps.time_spent_seconds) AS avg_time_spent
         FROM submissions cs
         JOIN problems p ON cs.problem_id = p.id
         LEFT JOIN solving_stats ps
             ON cs.student_id = ps.student_id AND cs.problem_id = ps.problem_id
         WHERE cs.student_id = ?
         GROUP BY p.difficulty",
        &[&student_id],
        |r| {
            Ok(json!({
                "difficulty": r.get::<_, String>(0)?,
                "attempted_problems": r.get::<_, i64>(1)?,
                "solved_problems": r.get::<_, i64>(2)? != 0,
                "avg_time_spent": r.get::<_, Option<f64>>(3)?,
            }))
        },
    );

    let error_patterns = sub_query(
        conn,
        "error_patterns",
        "SELECT CASE WHEN instr(execution_errors, char(10)) > 0
                     THEN substr(execution_errors, 1, instr(execution_errors, char(10)) - 1)
                     ELSE execution_errors END AS error_type,
                COUNT(*) AS occurrence_count
         FROM submissions
         WHERE student_id = ? AND submit_result = 'failed' AND execution_errors IS NOT NULL
         GROUP BY error_type
         ORDER BY occurrence_count DESC
         LIMIT 5",
        &[&student_id],
        |r| {
            Ok(json!({
                "error_type": r.get::<_, String>(0)?,
                "occurrence_count": r.get::<_, i64>(1)?,
            }))
        },
    );

    let one_week_ago = (Local::now() - Duration::days(7))
        .format("%Y-%m-%d")
        .to_string();
    let recent_activity = sub_query(
        conn,
        "recent_activity",
        "SELECT date(submitted_at) AS submission_date,
                COUNT(*) AS submission_count,
                SUM(CASE WHEN submit_result = 'success' THEN 1 ELSE 0 END) AS successful_count
         FROM submissions
         WHERE student_id = ? AND submitted_at >= ?
         GROUP BY date(submitted_at)
         ORDER BY submission_date",
        &[&student_id, &one_week_ago],
        |r| {
            Ok(json!({
                "submission_date": r.get::<_, String>(0)?,
                "submission_count": r.get::<_, i64>(1)?,
                "successful_count": r.get::<_, i64>(2)?,
            }))
        },
    );

    Ok(json!({
        "learning_stats": learning_stats,
        "difficulty_stats": difficulty_stats,
        "error_patterns": error_patterns,
        "recent_activity": recent_activity,
    }))
}

fn sub_query<F>(
    conn: &Connection,
    name: &str,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    map: F,
) -> Vec<serde_json::Value>
where
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value>,
{
    let run = || -> Result<Vec<serde_json::Value>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, &map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    };
    match run() {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(query = name, %err, "learning data sub-query failed");
            Vec::new()
        }
    }
}
