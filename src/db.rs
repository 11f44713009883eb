use rusqlite::Connection;
use std::path::Path;

use crate::error::Error;

/// Open (or create) the platform database and make sure the schema exists.
/// Every invocation goes through here, so older databases are migrated in
/// place with additive column checks.
pub fn open_db(db_path: &Path) -> Result<Connection, Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL CHECK(role IN ('student','teacher')),
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(role, email)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles_student(
            email TEXT PRIMARY KEY,
            student_id TEXT,
            class_name TEXT,
            major TEXT,
            name TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles_teacher(
            email TEXT PRIMARY KEY,
            teacher_id TEXT,
            department TEXT,
            title TEXT,
            name TEXT,
            phone TEXT,
            office_location TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_profiles_student_class ON profiles_student(class_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS chats(
            id TEXT PRIMARY KEY,
            user_email TEXT NOT NULL,
            title TEXT,
            messages TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS problems(
            id TEXT PRIMARY KEY,
            teacher_email TEXT NOT NULL,
            title TEXT NOT NULL,
            difficulty TEXT NOT NULL CHECK(difficulty IN ('easy','medium','hard')),
            content TEXT NOT NULL,
            input_example TEXT,
            output_example TEXT,
            chapter_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_problems_teacher ON problems(teacher_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_problems_chapter ON problems(chapter_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teaching_contents(
            chapter_id TEXT PRIMARY KEY,
            teacher_email TEXT NOT NULL,
            chapter_number TEXT NOT NULL,
            chapter_title TEXT NOT NULL,
            chapter_difficulty TEXT NOT NULL,
            chapter_description TEXT NOT NULL,
            sections TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_teaching_contents_teacher
         ON teaching_contents(teacher_email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','answered')),
            answer TEXT,
            answered_at TEXT,
            follow_ups TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_questions_email ON questions(email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            student_class TEXT NOT NULL,
            student_id TEXT NOT NULL,
            problem_id TEXT NOT NULL,
            problem_title TEXT NOT NULL,
            code_content TEXT NOT NULL,
            submit_result TEXT NOT NULL CHECK(submit_result IN ('success','failed')),
            execution_errors TEXT,
            first_view_time TEXT,
            submitted_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_student ON submissions(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_problem ON submissions(problem_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_class ON submissions(student_class)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS solving_stats(
            student_id TEXT NOT NULL,
            problem_id TEXT NOT NULL,
            total_attempts INTEGER NOT NULL DEFAULT 0,
            attempts_until_success INTEGER NOT NULL DEFAULT 0,
            is_solved INTEGER NOT NULL DEFAULT 0,
            first_view_time TEXT,
            solved_time TEXT,
            time_spent_seconds INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY(student_id, problem_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_solving_stats_problem ON solving_stats(problem_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recommendations(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            priority TEXT NOT NULL CHECK(priority IN ('high','medium','low')),
            resources TEXT NOT NULL DEFAULT '[]',
            actionable INTEGER NOT NULL DEFAULT 0,
            problem_id TEXT,
            chapter_id TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            read_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recommendations_student ON recommendations(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ai_analyses(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            pattern TEXT NOT NULL,
            strengths TEXT NOT NULL,
            weaknesses TEXT NOT NULL,
            suggestions TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ai_analyses_student ON ai_analyses(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS section_progress(
            student_id TEXT NOT NULL,
            section_id TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY(student_id, section_id)
        )",
        [],
    )?;

    // Columns added after the first deployments; bring older databases up.
    ensure_questions_follow_ups(conn)?;
    ensure_recommendations_read_at(conn)?;

    Ok(())
}

fn ensure_questions_follow_ups(conn: &Connection) -> Result<(), Error> {
    if table_has_column(conn, "questions", "follow_ups")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE questions ADD COLUMN follow_ups TEXT", [])?;
    Ok(())
}

fn ensure_recommendations_read_at(conn: &Connection) -> Result<(), Error> {
    if table_has_column(conn, "recommendations", "read_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE recommendations ADD COLUMN read_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, Error> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Timestamp format used everywhere in the database and output payloads.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
