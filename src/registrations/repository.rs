// All registration SQL lives here; callers own the transaction scope.
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use crate::error::{AppError, AppResult};
use crate::registrations::domain::{RegistrationFilter, RegistrationStatus};

/// Registration row joined with the volunteer's username and the event's
/// name and owner, which every caller needs for projections and access
/// checks.
#[derive(Debug, Clone)]
pub struct RegistrationRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub event_id: String,
    pub event_name: String,
    pub event_owner_id: String,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT: &str = "SELECT r.id, r.user_id, u.username, r.event_id, e.name, e.owner_id,
            r.status, r.created_at, r.updated_at
     FROM registrations r
     JOIN users u ON u.id = r.user_id
     JOIN events e ON e.id = r.event_id";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRow> {
    Ok(RegistrationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        event_id: row.get(3)?,
        event_name: row.get(4)?,
        event_owner_id: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn insert(
    conn: &Connection,
    id: &str,
    user_id: &str,
    event_id: &str,
    status: RegistrationStatus,
) -> Result<(), rusqlite::Error> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO registrations (id, user_id, event_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, user_id, event_id, status, now, now],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<RegistrationRow> {
    conn.query_row(&format!("{} WHERE r.id = ?1", SELECT), params![id], map_row)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Registration not found with id: {}", id)))
}

pub fn find_by_user_and_event(
    conn: &Connection,
    user_id: &str,
    event_id: &str,
) -> AppResult<Option<RegistrationRow>> {
    let row = conn
        .query_row(
            &format!("{} WHERE r.user_id = ?1 AND r.event_id = ?2", SELECT),
            params![user_id, event_id],
            map_row,
        )
        .optional()?;
    Ok(row)
}

pub fn update_status(conn: &Connection, id: &str, status: RegistrationStatus) -> AppResult<()> {
    conn.execute(
        "UPDATE registrations SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, Utc::now()],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM registrations WHERE id = ?1", params![id])?;
    Ok(())
}

/// Filtered listing as one parameterized query. `restrict_to` is the
/// non-admin visibility rule: rows where the viewer is the volunteer or the
/// owner of the referenced event.
pub fn list(
    conn: &Connection,
    filter: &RegistrationFilter,
    restrict_to: Option<&str>,
) -> AppResult<Vec<RegistrationRow>> {
    let mut sql = format!("{} WHERE 1=1", SELECT);
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        sql.push_str(" AND r.status = ?");
        args.push(Box::new(status));
    }
    if let Some(ref event_id) = filter.event_id {
        sql.push_str(" AND r.event_id = ?");
        args.push(Box::new(event_id.clone()));
    }
    if let Some(ref user_id) = filter.user_id {
        sql.push_str(" AND r.user_id = ?");
        args.push(Box::new(user_id.clone()));
    }
    if let Some(viewer_id) = restrict_to {
        sql.push_str(" AND (r.user_id = ? OR e.owner_id = ?)");
        args.push(Box::new(viewer_id.to_string()));
        args.push(Box::new(viewer_id.to_string()));
    }

    sql.push_str(" ORDER BY r.created_at DESC LIMIT ? OFFSET ?");
    args.push(Box::new(filter.limit.unwrap_or(50).clamp(1, 200)));
    args.push(Box::new(filter.offset.unwrap_or(0).max(0)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
