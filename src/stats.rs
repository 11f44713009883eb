//! Cross-class analytics.
//!
//! `learning_patterns` builds five independent sections; a query failure in
//! one section degrades that section to an empty list with a warning on
//! stderr instead of failing the whole call.

use rusqlite::Connection;
use serde_json::json;

use crate::error::Error;

pub fn class_list(conn: &Connection) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT student_class FROM submissions
         WHERE student_class IS NOT NULL AND student_class != '' AND student_class != 'null'
         UNION
         SELECT DISTINCT class_name FROM profiles_student
         WHERE class_name IS NOT NULL AND class_name != '' AND class_name != 'null'
         ORDER BY 1",
    )?;
    let classes = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if classes.is_empty() {
        return Ok(json!({ "classes": [], "message": "no class data yet" }));
    }
    Ok(json!({ "classes": classes }))
}

pub fn learning_patterns(
    conn: &Connection,
    class_name: Option<&str>,
) -> Result<serde_json::Value, Error> {
    let (scope_sql, params): (&str, Vec<String>) = match class_name {
        Some(class) => (" AND cs.student_class = ?", vec![class.to_string()]),
        None => ("", vec![]),
    };
    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

    let submission_count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM submissions cs WHERE 1=1{}", scope_sql),
        param_refs.as_slice(),
        |r| r.get(0),
    )?;

    if submission_count == 0 {
        tracing::warn!(class = ?class_name, "no submission data in scope");
        return Ok(json!({
            "data": empty_patterns(),
            "message": "no learning data found for this scope",
        }));
    }

    let daily_trends = section(conn, "daily_trends", &format!(
        "SELECT date(cs.submitted_at) AS date,
                COUNT(*) AS total_submissions,
                COUNT(DISTINCT cs.student_id) AS active_students,
                SUM(CASE WHEN cs.submit_result = 'success' THEN 1 ELSE 0 END) AS successful_submissions
         FROM submissions cs
         WHERE 1=1{}
         GROUP BY date(cs.submitted_at)
         ORDER BY date DESC
         LIMIT 30", scope_sql),
        &param_refs, |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "total_submissions": r.get::<_, i64>(1)?,
                "active_students": r.get::<_, i64>(2)?,
                "successful_submissions": r.get::<_, i64>(3)?,
            }))
        });

    // Average solution time uses the stat table's wall-clock seconds, capped
    // at three hours to keep abandoned sessions out of the average.
    let problem_difficulty = section(conn, "problem_difficulty", &format!(
        "SELECT cs.problem_id,
                MAX(cs.problem_title) AS problem_title,
                COUNT(*) AS attempt_count,
                COUNT(DISTINCT cs.student_id) AS student_count,
                SUM(CASE WHEN cs.submit_result = 'success' THEN 1.0 ELSE 0.0 END) / COUNT(*) * 100 AS success_rate,
                AVG(CASE WHEN ps.time_spent_seconds > 0 AND ps.time_spent_seconds <= 10800
                         THEN ps.time_spent_seconds END) AS avg_solution_time
         FROM submissions cs
         LEFT JOIN solving_stats ps
             ON cs.problem_id = ps.problem_id AND cs.student_id = ps.student_id
         WHERE 1=1{}
         GROUP BY cs.problem_id
         ORDER BY success_rate ASC", scope_sql),
        &param_refs, |r| {
            Ok(json!({
                "problem_id": r.get::<_, String>(0)?,
                "problem_title": r.get::<_, String>(1)?,
                "attempt_count": r.get::<_, i64>(2)?,
                "student_count": r.get::<_, i64>(3)?,
                "success_rate": r.get::<_, f64>(4)?,
                "avg_solution_time": r.get::<_, Option<f64>>(5)?,
            }))
        });

    // First line of the stored error text stands in for an error type.
    let error_patterns = section(conn, "error_patterns", &format!(
        "SELECT CASE WHEN instr(cs.execution_errors, char(10)) > 0
                     THEN substr(cs.execution_errors, 1, instr(cs.execution_errors, char(10)) - 1)
                     ELSE cs.execution_errors END AS error_type,
                COUNT(*) AS occurrence_count,
                COUNT(DISTINCT cs.student_id) AS affected_students,
                GROUP_CONCAT(DISTINCT cs.problem_id) AS related_problems
         FROM submissions cs
         WHERE cs.execution_errors IS NOT NULL{}
         GROUP BY error_type
         ORDER BY occurrence_count DESC
         LIMIT 10", scope_sql),
        &param_refs, |r| {
            Ok(json!({
                "error_type": r.get::<_, String>(0)?,
                "occurrence_count": r.get::<_, i64>(1)?,
                "affected_students": r.get::<_, i64>(2)?,
                "related_problems": r.get::<_, Option<String>>(3)?,
            }))
        });

    let progress_distribution = section(conn, "progress_distribution", &format!(
        "SELECT ps.student_id,
                COUNT(DISTINCT ps.problem_id) AS problems_attempted,
                SUM(ps.is_solved) AS problems_solved,
                AVG(ps.attempts_until_success) AS avg_attempts,
                AVG(ps.time_spent_seconds) AS avg_time_spent
         FROM solving_stats ps
         WHERE EXISTS (SELECT 1 FROM submissions cs
                       WHERE cs.student_id = ps.student_id{})
         GROUP BY ps.student_id", scope_sql),
        &param_refs, |r| {
            Ok(json!({
                "student_id": r.get::<_, String>(0)?,
                "problems_attempted": r.get::<_, i64>(1)?,
                "problems_solved": r.get::<_, i64>(2)?,
                "avg_attempts": r.get::<_, f64>(3)?,
                "avg_time_spent": r.get::<_, f64>(4)?,
            }))
        });

    let efficiency_analysis = section(conn, "efficiency_analysis", &format!(
        "SELECT cs.student_id,
                COUNT(*) AS total_submissions,
                SUM(CASE WHEN cs.submit_result = 'success' THEN 1 ELSE 0 END) AS successful_submissions,
                AVG(ps.time_spent_seconds) AS avg_solving_time,
                MAX(ps.attempts_until_success) AS max_attempts
         FROM submissions cs
         LEFT JOIN solving_stats ps
             ON cs.student_id = ps.student_id AND cs.problem_id = ps.problem_id
         WHERE 1=1{}
         GROUP BY cs.student_id", scope_sql),
        &param_refs, |r| {
            Ok(json!({
                "student_id": r.get::<_, String>(0)?,
                "total_submissions": r.get::<_, i64>(1)?,
                "successful_submissions": r.get::<_, i64>(2)?,
                "avg_solving_time": r.get::<_, Option<f64>>(3)?,
                "max_attempts": r.get::<_, Option<i64>>(4)?,
            }))
        });

    Ok(json!({
        "data": {
            "daily_trends": daily_trends,
            "problem_difficulty": problem_difficulty,
            "error_patterns": error_patterns,
            "progress_distribution": progress_distribution,
            "efficiency_analysis": efficiency_analysis,
        }
    }))
}

fn empty_patterns() -> serde_json::Value {
    json!({
        "daily_trends": [],
        "problem_difficulty": [],
        "error_patterns": [],
        "progress_distribution": [],
        "efficiency_analysis": [],
    })
}

fn section<F>(
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
            tracing::warn!(section = name, %err, "analytics section failed");
            Vec::new()
        }
    }
}
