//! Chat history storage. Messages are kept verbatim as a JSON array.

use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::Error;

const TITLE_MAX_CHARS: usize = 20;

pub fn save(conn: &Connection, email: &str, messages: &str) -> Result<serde_json::Value, Error> {
    let parsed: serde_json::Value = serde_json::from_str(messages)?;
    let Some(list) = parsed.as_array() else {
        return Err(Error::invalid("messages must be a JSON array"));
    };

    let chat_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO chats(id, user_email, title, messages, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &chat_id,
            email.trim(),
            derive_title(list),
            messages,
            db::now_timestamp(),
        ),
    )?;

    Ok(json!({ "id": chat_id, "message": "chat saved" }))
}

pub fn history(conn: &Connection, email: &str) -> Result<serde_json::Value, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, title, created_at, messages
         FROM chats
         WHERE user_email = ?
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let chats = stmt
        .query_map([email.trim()], |r| {
            let messages_raw: String = r.get(3)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, Option<String>>(1)?,
                "created_at": r.get::<_, String>(2)?,
                "messages": decode_messages(&messages_raw),
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "chats": chats }))
}

pub fn get(conn: &Connection, chat_id: &str) -> Result<serde_json::Value, Error> {
    let row = conn
        .query_row(
            "SELECT id, user_email, title, created_at, messages FROM chats WHERE id = ?",
            [chat_id],
            |r| {
                let messages_raw: String = r.get(4)?;
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "user_email": r.get::<_, String>(1)?,
                    "title": r.get::<_, Option<String>>(2)?,
                    "created_at": r.get::<_, String>(3)?,
                    "messages": decode_messages(&messages_raw),
                }))
            },
        )
        .optional()?;

    match row {
        Some(chat) => Ok(json!({ "chat": chat })),
        None => Err(Error::invalid("chat not found")),
    }
}

pub fn update(conn: &Connection, chat_id: &str, messages: &str) -> Result<serde_json::Value, Error> {
    let parsed: serde_json::Value = serde_json::from_str(messages)?;
    if !parsed.is_array() {
        return Err(Error::invalid("messages must be a JSON array"));
    }

    let changed = conn.execute(
        "UPDATE chats SET messages = ? WHERE id = ?",
        (messages, chat_id),
    )?;
    if changed == 0 {
        return Err(Error::invalid("chat not found"));
    }
    Ok(json!({ "message": "chat updated" }))
}

pub fn delete(conn: &Connection, chat_id: &str) -> Result<serde_json::Value, Error> {
    let changed = conn.execute("DELETE FROM chats WHERE id = ?", [chat_id])?;
    if changed == 0 {
        return Err(Error::invalid("chat not found"));
    }
    Ok(json!({ "message": "chat deleted" }))
}

/// Chat title: first 20 characters of the first user message, `...` suffix
/// when truncated. Falls back to the first message of any role, then to a
/// fixed label for empty conversations.
fn derive_title(messages: &[serde_json::Value]) -> String {
    let content_of = |m: &serde_json::Value| {
        m.get("content")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let first_user = messages
        .iter()
        .find(|m| m.get("role").and_then(|v| v.as_str()) == Some("user"))
        .and_then(content_of);
    let content = first_user.or_else(|| messages.iter().find_map(|m| content_of(m)));

    match content {
        Some(text) => {
            let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
            if text.chars().count() > TITLE_MAX_CHARS {
                format!("{}...", truncated)
            } else {
                truncated
            }
        }
        None => "New chat".to_string(),
    }
}

/// Stored messages should always be valid JSON, but a corrupted row must not
/// take the whole history call down; fall back to the raw string.
fn decode_messages(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_first_user_message() {
        let messages = vec![
            json!({ "role": "system", "content": "You are a tutor." }),
            json!({ "role": "user", "content": "How do for loops work?" }),
        ];
        assert_eq!(derive_title(&messages), "How do for loops wor...");
    }

    #[test]
    fn title_short_message_is_not_truncated() {
        let messages = vec![json!({ "role": "user", "content": "hi" })];
        assert_eq!(derive_title(&messages), "hi");
    }

    #[test]
    fn title_empty_conversation_uses_fallback() {
        assert_eq!(derive_title(&[]), "New chat");
    }

    #[test]
    fn save_update_delete_flow() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");

        let saved = save(
            &conn,
            "a@example.com",
            r#"[{"role":"user","content":"hello"}]"#,
        )
        .expect("save");
        let id = saved["id"].as_str().expect("id").to_string();

        let listed = history(&conn, "a@example.com").expect("history");
        assert_eq!(listed["chats"].as_array().map(|v| v.len()), Some(1));

        update(&conn, &id, r#"[{"role":"user","content":"edited"}]"#).expect("update");
        let fetched = get(&conn, &id).expect("get");
        assert_eq!(
            fetched["chat"]["messages"][0]["content"].as_str(),
            Some("edited")
        );

        delete(&conn, &id).expect("delete");
        assert!(get(&conn, &id).is_err());
        assert!(delete(&conn, &id).is_err());
    }
}
