// All wall SQL lives here; callers own the transaction scope.
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::PostMedia;
use crate::error::{AppError, AppResult};
use crate::wall::domain::ReactionType;

/// Post row joined with the author's display name and the owning event's
/// owner, which permission checks and projections need.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub event_id: String,
    pub author_id: String,
    pub author_name: String,
    pub event_owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT: &str = "SELECT p.id, p.event_id, p.author_id, u.firstname || ' ' || u.lastname,
            e.owner_id, p.content, p.created_at, p.updated_at
     FROM posts p
     JOIN users u ON u.id = p.author_id
     JOIN events e ON e.id = p.event_id";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        event_owner_id: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn insert_post(
    conn: &Connection,
    id: &str,
    event_id: &str,
    author_id: &str,
    content: &str,
) -> AppResult<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO posts (id, event_id, author_id, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, event_id, author_id, content, now, now],
    )?;
    Ok(())
}

pub fn find_post(conn: &Connection, id: &str) -> AppResult<PostRow> {
    conn.query_row(&format!("{} WHERE p.id = ?1", SELECT), params![id], map_row)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Post not found with id: {}", id)))
}

pub fn update_content(conn: &Connection, id: &str, content: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE posts SET content = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, content, Utc::now()],
    )?;
    Ok(())
}

/// Explicit cascade: reactions and media first, then the post. Run inside a
/// transaction.
pub fn delete_post_cascade(conn: &Connection, id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM post_reactions WHERE post_id = ?1", params![id])?;
    conn.execute("DELETE FROM post_media WHERE post_id = ?1", params![id])?;
    conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn list_by_event(
    conn: &Connection,
    event_id: &str,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<PostRow>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.event_id = ?1 ORDER BY p.created_at DESC LIMIT ?2 OFFSET ?3",
        SELECT
    ))?;
    let rows = stmt
        .query_map(params![event_id, limit, offset], map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_media(conn: &Connection, media: &PostMedia) -> AppResult<()> {
    conn.execute(
        "INSERT INTO post_media (id, post_id, resource_id, path, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            media.id,
            media.post_id,
            media.resource_id,
            media.path,
            media.created_at,
        ],
    )?;
    Ok(())
}

pub fn media_paths(conn: &Connection, post_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT path FROM post_media WHERE post_id = ?1 ORDER BY created_at ASC",
    )?;
    let paths = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(paths)
}

/// One reaction row per (post, user); a repeat reaction overwrites the kind.
pub fn upsert_reaction(
    conn: &Connection,
    post_id: &str,
    user_id: &str,
    reaction: ReactionType,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO post_reactions (id, post_id, user_id, reaction, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (post_id, user_id) DO UPDATE SET reaction = excluded.reaction",
        params![
            uuid::Uuid::new_v4().to_string(),
            post_id,
            user_id,
            reaction,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn delete_reaction(conn: &Connection, post_id: &str, user_id: &str) -> AppResult<()> {
    conn.execute(
        "DELETE FROM post_reactions WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
    )?;
    Ok(())
}

pub fn find_reaction(
    conn: &Connection,
    post_id: &str,
    user_id: &str,
) -> AppResult<Option<ReactionType>> {
    let reaction = conn
        .query_row(
            "SELECT reaction FROM post_reactions WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(reaction)
}

pub fn reaction_counts(conn: &Connection, post_id: &str) -> AppResult<(i64, i64)> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(reaction = 'LIKE'), 0),
            COALESCE(SUM(reaction = 'HEART'), 0)
         FROM post_reactions WHERE post_id = ?1",
        params![post_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(Into::into)
}
