//! Account registration and login.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 over a random 32-byte salt
//! (hex-encoded, 100k rounds). One row per (role, email); the same address
//! may exist once as a student and once as a teacher.

use rand::RngCore;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::cli::Role;
use crate::db;
use crate::error::Error;

const PBKDF2_ROUNDS: u32 = 100_000;

pub fn register(
    conn: &Connection,
    role: Role,
    email: &str,
    password: &str,
) -> Result<serde_json::Value, Error> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::invalid("email must not be empty"));
    }
    if password.is_empty() {
        return Err(Error::invalid("password must not be empty"));
    }

    // The UNIQUE(role, email) index is the existence check; a separate
    // SELECT would race with concurrent registrations.
    let (salt, hash) = hash_password(password);
    let inserted = conn.execute(
        "INSERT INTO users(id, role, email, password_hash, salt, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            role.as_str(),
            email,
            hash,
            salt,
            db::now_timestamp(),
        ),
    );
    if let Err(err) = inserted {
        return Err(match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::invalid("email already registered")
            }
            other => other.into(),
        });
    }

    tracing::info!(role = role.as_str(), "registered new account");
    Ok(json!({ "message": "registration successful" }))
}

pub fn login(
    conn: &Connection,
    role: Role,
    email: &str,
    password: &str,
) -> Result<serde_json::Value, Error> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT password_hash, salt FROM users WHERE role = ? AND email = ?",
            (role.as_str(), email.trim()),
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    // Same message for unknown email and wrong password.
    let Some((stored_hash, salt)) = row else {
        return Err(Error::invalid("invalid email or password"));
    };
    if !verify_password(&salt, &stored_hash, password) {
        return Err(Error::invalid("invalid email or password"));
    }

    Ok(json!({ "message": "login successful" }))
}

/// Returns (salt_hex, hash_hex). The KDF runs over the hex-encoded salt
/// bytes, matching what existing rows were written with.
fn hash_password(password: &str) -> (String, String) {
    let mut salt_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let hash = derive_key(password, &salt);
    (salt, hash)
}

fn verify_password(salt: &str, stored_hash: &str, password: &str) -> bool {
    derive_key(password, salt) == stored_hash
}

fn derive_key(password: &str, salt: &str) -> String {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut key,
    );
    hex::encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic_per_salt() {
        let a = derive_key("hunter2", "00ff");
        let b = derive_key("hunter2", "00ff");
        let c = derive_key("hunter2", "00fe");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let (salt, hash) = hash_password("s3cret");
        assert!(verify_password(&salt, &hash, "s3cret"));
        assert!(!verify_password(&salt, &hash, "s3cret "));
    }

    #[test]
    fn register_rejects_duplicate_and_login_checks_password() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        register(&conn, Role::Student, "kim@example.com", "pw").expect("register");
        let duplicate = register(&conn, Role::Student, "kim@example.com", "pw2");
        assert_eq!(
            duplicate.unwrap_err().to_string(),
            "email already registered"
        );
        // Same email is fine under a different role.
        register(&conn, Role::Teacher, "kim@example.com", "pw").expect("register teacher");

        assert!(login(&conn, Role::Student, "kim@example.com", "pw").is_ok());
        let wrong = login(&conn, Role::Student, "kim@example.com", "nope");
        let unknown = login(&conn, Role::Student, "none@example.com", "pw");
        assert_eq!(
            wrong.unwrap_err().to_string(),
            unknown.unwrap_err().to_string()
        );
    }
}
