//! Coding submissions and solving statistics.
//!
//! Every submission is appended to `submissions`; the per-(student, problem)
//! row in `solving_stats` moves through unattempted -> attempting -> solved.
//! The first successful submission freezes `attempts_until_success` and
//! `solved_time`; later submissions only grow `total_attempts`.

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitResult {
    Success,
    Failed,
}

impl SubmitResult {
    fn as_str(self) -> &'static str {
        match self {
            SubmitResult::Success => "success",
            SubmitResult::Failed => "failed",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmissionInput {
    #[serde(default)]
    student_class: String,
    student_id: String,
    problem_id: String,
    #[serde(default)]
    problem_title: String,
    code_content: String,
    submit_result: SubmitResult,
    #[serde(default)]
    execution_errors: Option<String>,
    #[serde(default)]
    first_view_time: Option<String>,
    #[serde(default)]
    submitted_at: Option<String>,
}

pub fn submit(conn: &Connection, data: &str) -> Result<serde_json::Value, Error> {
    let input: SubmissionInput = serde_json::from_str(data)?;
    let submitted_at = input
        .submitted_at
        .clone()
        .unwrap_or_else(db::now_timestamp);
    let solved = input.submit_result == SubmitResult::Success;

    // Submission log and stat upsert must land together.
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO submissions(id, student_class, student_id, problem_id,
             problem_title, code_content, submit_result, execution_errors,
             first_view_time, submitted_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            &input.student_class,
            &input.student_id,
            &input.problem_id,
            &input.problem_title,
            &input.code_content,
            input.submit_result.as_str(),
            &input.execution_errors,
            &input.first_view_time,
            &submitted_at,
        ),
    )?;

    // Single atomic upsert; every RHS in DO UPDATE sees the pre-update row,
    // so `total_attempts + 1` is the attempt number of this submission and
    // `is_solved = 0 AND ?3` detects the solving transition exactly once.
    tx.execute(
        "INSERT INTO solving_stats(student_id, problem_id, total_attempts,
             attempts_until_success, is_solved, first_view_time, solved_time,
             time_spent_seconds)
         VALUES(?1, ?2, 1,
             CASE WHEN ?3 THEN 1 ELSE 0 END,
             CASE WHEN ?3 THEN 1 ELSE 0 END,
             ?4,
             CASE WHEN ?3 THEN ?5 END,
             CASE WHEN ?3 AND ?4 IS NOT NULL
                  THEN MAX(0, strftime('%s', ?5) - strftime('%s', ?4))
                  ELSE 0 END)
         ON CONFLICT(student_id, problem_id) DO UPDATE SET
             total_attempts = solving_stats.total_attempts + 1,
             first_view_time = COALESCE(solving_stats.first_view_time, excluded.first_view_time),
             attempts_until_success = CASE
                 WHEN solving_stats.is_solved = 0 AND ?3
                 THEN solving_stats.total_attempts + 1
                 ELSE solving_stats.attempts_until_success END,
             solved_time = CASE
                 WHEN solving_stats.is_solved = 0 AND ?3 THEN ?5
                 ELSE solving_stats.solved_time END,
             time_spent_seconds = CASE
                 WHEN solving_stats.is_solved = 0 AND ?3
                      AND COALESCE(solving_stats.first_view_time, excluded.first_view_time) IS NOT NULL
                 THEN MAX(solving_stats.time_spent_seconds,
                          MAX(0, strftime('%s', ?5) - strftime('%s',
                              COALESCE(solving_stats.first_view_time, excluded.first_view_time))))
                 ELSE solving_stats.time_spent_seconds END,
             is_solved = CASE WHEN ?3 THEN 1 ELSE solving_stats.is_solved END",
        (
            &input.student_id,
            &input.problem_id,
            solved,
            &input.first_view_time,
            &submitted_at,
        ),
    )?;
    tx.commit()?;

    Ok(json!({ "message": "submission recorded" }))
}

pub fn student_stats(conn: &Connection, student_id: &str) -> Result<serde_json::Value, Error> {
    let basic_stats = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(is_solved), 0),
                COALESCE(AVG(attempts_until_success), 0),
                COALESCE(AVG(time_spent_seconds), 0)
         FROM solving_stats
         WHERE student_id = ?",
        [student_id],
        |r| {
            Ok(json!({
                "total_problems_attempted": r.get::<_, i64>(0)?,
                "problems_solved": r.get::<_, i64>(1)?,
                "avg_attempts_until_success": r.get::<_, f64>(2)?,
                "avg_solving_time_seconds": r.get::<_, f64>(3)?,
            }))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT ps.problem_id, t.problem_title, ps.is_solved,
                ps.attempts_until_success, ps.total_attempts, ps.time_spent_seconds
         FROM solving_stats ps
         JOIN (SELECT problem_id, MAX(problem_title) AS problem_title
               FROM submissions WHERE student_id = ?1
               GROUP BY problem_id) t ON ps.problem_id = t.problem_id
         WHERE ps.student_id = ?1",
    )?;
    let problem_details = stmt
        .query_map([student_id], |r| {
            Ok(json!({
                "problem_id": r.get::<_, String>(0)?,
                "problem_title": r.get::<_, String>(1)?,
                "is_solved": r.get::<_, i64>(2)? != 0,
                "attempts_until_success": r.get::<_, i64>(3)?,
                "total_attempts": r.get::<_, i64>(4)?,
                "time_spent_seconds": r.get::<_, i64>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT execution_errors, COUNT(*) AS error_count
         FROM submissions
         WHERE student_id = ? AND execution_errors IS NOT NULL
         GROUP BY execution_errors
         ORDER BY error_count DESC",
    )?;
    let error_stats = stmt
        .query_map([student_id], |r| {
            Ok(json!({
                "execution_errors": r.get::<_, String>(0)?,
                "error_count": r.get::<_, i64>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "data": {
            "student_id": student_id,
            "basic_stats": basic_stats,
            "problem_details": problem_details,
            "error_stats": error_stats,
        }
    }))
}

pub fn class_stats(conn: &Connection, class_name: &str) -> Result<serde_json::Value, Error> {
    let (total_students, total_problems, successful, total_submissions) = conn.query_row(
        "SELECT COUNT(DISTINCT student_id),
                COUNT(DISTINCT problem_id),
                COALESCE(SUM(CASE WHEN submit_result = 'success' THEN 1 ELSE 0 END), 0),
                COUNT(*)
         FROM submissions
         WHERE student_class = ?",
        [class_name],
        |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, i64>(3)?,
            ))
        },
    )?;

    let overall = json!({
        "total_students": total_students,
        "total_problems": total_problems,
        "total_successful_submissions": successful,
        "total_submissions": total_submissions,
        "success_rate": rate(successful, total_submissions),
    });

    if total_submissions == 0 {
        return Ok(json!({
            "data": {
                "class_name": class_name,
                "class_stats": overall,
                "problem_stats": [],
                "student_rankings": [],
            },
            "message": "no submissions recorded for this class",
        }));
    }

    let mut stmt = conn.prepare(
        "SELECT problem_id,
                MAX(problem_title) AS problem_title,
                COUNT(DISTINCT CASE WHEN submit_result = 'success' THEN student_id END),
                COUNT(DISTINCT student_id)
         FROM submissions
         WHERE student_class = ?
         GROUP BY problem_id",
    )?;
    let problem_stats = stmt
        .query_map([class_name], |r| {
            let solved: i64 = r.get(2)?;
            let attempted: i64 = r.get(3)?;
            Ok(json!({
                "problem_id": r.get::<_, String>(0)?,
                "problem_title": r.get::<_, String>(1)?,
                "students_solved": solved,
                "students_attempted": attempted,
                "completion_rate": rate(solved, attempted),
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT s.student_id,
                COUNT(*) AS total_submissions,
                SUM(CASE WHEN s.submit_result = 'success' THEN 1 ELSE 0 END),
                (SELECT COUNT(*) FROM solving_stats ps
                 WHERE ps.student_id = s.student_id AND ps.is_solved = 1),
                (SELECT COALESCE(AVG(ps.attempts_until_success), 0) FROM solving_stats ps
                 WHERE ps.student_id = s.student_id AND ps.is_solved = 1)
         FROM submissions s
         WHERE s.student_class = ?
         GROUP BY s.student_id",
    )?;
    let mut rankings: Vec<(i64, f64, serde_json::Value)> = stmt
        .query_map([class_name], |r| {
            let submissions: i64 = r.get(1)?;
            let successes: i64 = r.get(2)?;
            let problems_solved: i64 = r.get(3)?;
            let success_rate = rate(successes, submissions);
            Ok((
                problems_solved,
                success_rate,
                json!({
                    "student_id": r.get::<_, String>(0)?,
                    "problems_solved": problems_solved,
                    "total_submissions": submissions,
                    "success_rate": success_rate,
                    "avg_attempts": r.get::<_, f64>(4)?,
                }),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rankings.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)));
    let student_rankings: Vec<serde_json::Value> =
        rankings.into_iter().map(|(_, _, v)| v).collect();

    Ok(json!({
        "data": {
            "class_name": class_name,
            "class_stats": overall,
            "problem_stats": problem_stats,
            "student_rankings": student_rankings,
        }
    }))
}

pub fn problem_stats(conn: &Connection, problem_id: &str) -> Result<serde_json::Value, Error> {
    let problem_info = conn.query_row(
        "SELECT MAX(problem_title),
                COUNT(DISTINCT student_id),
                COUNT(DISTINCT CASE WHEN submit_result = 'success' THEN student_id END),
                COUNT(*),
                COALESCE(SUM(CASE WHEN submit_result = 'success' THEN 1 ELSE 0 END), 0)
         FROM submissions
         WHERE problem_id = ?",
        [problem_id],
        |r| {
            let total: i64 = r.get(3)?;
            let successful: i64 = r.get(4)?;
            Ok(json!({
                "problem_id": problem_id,
                "problem_title": r.get::<_, Option<String>>(0)?,
                "students_attempted": r.get::<_, i64>(1)?,
                "students_solved": r.get::<_, i64>(2)?,
                "total_submissions": total,
                "successful_submissions": successful,
                "success_rate": rate(successful, total),
            }))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT student_class,
                COUNT(DISTINCT student_id),
                COUNT(DISTINCT CASE WHEN submit_result = 'success' THEN student_id END)
         FROM submissions
         WHERE problem_id = ?
         GROUP BY student_class",
    )?;
    let class_stats = stmt
        .query_map([problem_id], |r| {
            let attempted: i64 = r.get(1)?;
            let solved: i64 = r.get(2)?;
            Ok(json!({
                "student_class": r.get::<_, String>(0)?,
                "students_attempted": attempted,
                "students_solved": solved,
                "completion_rate": rate(solved, attempted),
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT execution_errors, COUNT(*) AS count
         FROM submissions
         WHERE problem_id = ? AND execution_errors IS NOT NULL
         GROUP BY execution_errors
         ORDER BY count DESC
         LIMIT 10",
    )?;
    let common_errors = stmt
        .query_map([problem_id], |r| {
            Ok(json!({
                "execution_errors": r.get::<_, String>(0)?,
                "count": r.get::<_, i64>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT time_spent_seconds, COUNT(*)
         FROM solving_stats
         WHERE problem_id = ? AND is_solved = 1
         GROUP BY time_spent_seconds
         ORDER BY time_spent_seconds ASC",
    )?;
    let solving_time_distribution = stmt
        .query_map([problem_id], |r| {
            Ok(json!({
                "time_spent_seconds": r.get::<_, i64>(0)?,
                "count": r.get::<_, i64>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "data": {
            "problem_info": problem_info,
            "class_stats": class_stats,
            "common_errors": common_errors,
            "solving_time_distribution": solving_time_distribution,
        }
    }))
}

/// Percentage that tolerates an empty denominator.
pub fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = numerator as f64 / denominator as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
