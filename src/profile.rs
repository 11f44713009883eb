//! Student and teacher profile storage.

use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::db;
use crate::error::Error;

#[derive(Debug, Deserialize)]
struct StudentProfileInput {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    major: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeacherProfileInput {
    #[serde(default)]
    teacher_id: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    office_location: Option<String>,
}

pub fn save_student(conn: &Connection, email: &str, data: &str) -> Result<serde_json::Value, Error> {
    let input: StudentProfileInput = serde_json::from_str(data)?;
    let now = db::now_timestamp();
    conn.execute(
        "INSERT INTO profiles_student(email, student_id, class_name, major, name, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT(email) DO UPDATE SET
             student_id = excluded.student_id,
             class_name = excluded.class_name,
             major = excluded.major,
             name = excluded.name,
             updated_at = excluded.updated_at",
        (
            email.trim(),
            input.student_id,
            input.class_name,
            input.major,
            input.name,
            now,
        ),
    )?;
    Ok(json!({ "message": "profile saved" }))
}

pub fn get_student(conn: &Connection, email: &str) -> Result<serde_json::Value, Error> {
    let row = conn
        .query_row(
            "SELECT email, student_id, class_name, major, name, created_at, updated_at
             FROM profiles_student WHERE email = ?",
            [email.trim()],
            |r| {
                Ok(json!({
                    "email": r.get::<_, String>(0)?,
                    "student_id": r.get::<_, Option<String>>(1)?,
                    "class_name": r.get::<_, Option<String>>(2)?,
                    "major": r.get::<_, Option<String>>(3)?,
                    "name": r.get::<_, Option<String>>(4)?,
                    "created_at": r.get::<_, String>(5)?,
                    "updated_at": r.get::<_, String>(6)?,
                }))
            },
        )
        .optional()?;

    match row {
        Some(profile) => Ok(json!({ "profile": profile })),
        None => Err(Error::invalid("profile not found")),
    }
}

pub fn save_teacher(conn: &Connection, email: &str, data: &str) -> Result<serde_json::Value, Error> {
    let input: TeacherProfileInput = serde_json::from_str(data)?;
    let now = db::now_timestamp();
    conn.execute(
        "INSERT INTO profiles_teacher(email, teacher_id, department, title, name, phone, office_location, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(email) DO UPDATE SET
             teacher_id = excluded.teacher_id,
             department = excluded.department,
             title = excluded.title,
             name = excluded.name,
             phone = excluded.phone,
             office_location = excluded.office_location,
             updated_at = excluded.updated_at",
        (
            email.trim(),
            input.teacher_id,
            input.department,
            input.title,
            input.name,
            input.phone,
            input.office_location,
            now,
        ),
    )?;
    Ok(json!({ "message": "profile saved" }))
}

pub fn get_teacher(conn: &Connection, email: &str) -> Result<serde_json::Value, Error> {
    let row = conn
        .query_row(
            "SELECT email, teacher_id, department, title, name, phone, office_location,
                    created_at, updated_at
             FROM profiles_teacher WHERE email = ?",
            [email.trim()],
            |r| {
                Ok(json!({
                    "email": r.get::<_, String>(0)?,
                    "teacher_id": r.get::<_, Option<String>>(1)?,
                    "department": r.get::<_, Option<String>>(2)?,
                    "title": r.get::<_, Option<String>>(3)?,
                    "name": r.get::<_, Option<String>>(4)?,
                    "phone": r.get::<_, Option<String>>(5)?,
                    "office_location": r.get::<_, Option<String>>(6)?,
                    "created_at": r.get::<_, String>(7)?,
                    "updated_at": r.get::<_, String>(8)?,
                }))
            },
        )
        .optional()?;

    match row {
        Some(profile) => Ok(json!({ "profile": profile })),
        None => Err(Error::invalid("profile not found")),
    }
}
