use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{User, UserRole};
use crate::error::AppResult;

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        firstname: row.get(1)?,
        lastname: row.get(2)?,
        username: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const USER_COLUMNS: &str =
    "id, firstname, lastname, username, password_hash, role, created_at, updated_at";

pub fn insert(conn: &Connection, user: &User) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, firstname, lastname, username, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.firstname,
            user.lastname,
            user.username,
            user.password_hash,
            user.role,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Convenience constructor for a fresh USER-role row.
pub fn new_user(firstname: &str, lastname: &str, username: &str, password_hash: &str) -> User {
    let now = Utc::now();
    User {
        id: uuid::Uuid::new_v4().to_string(),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role: UserRole::User,
        created_at: now,
        updated_at: now,
    }
}
