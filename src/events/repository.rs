// All event SQL lives here; callers own the transaction scope.
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use crate::db::models::Event;
use crate::error::{AppError, AppResult};
use crate::events::domain::{EventFilter, EventStatus};

const EVENT_COLUMNS: &str = "id, owner_id, name, description, date_deadline, start_date, end_date, status, created_at, updated_at";

fn map_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        date_deadline: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn insert(conn: &Connection, event: &Event) -> AppResult<()> {
    conn.execute(
        "INSERT INTO events (id, owner_id, name, description, date_deadline, start_date, end_date, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.id,
            event.owner_id,
            event.name,
            event.description,
            event.date_deadline,
            event.start_date,
            event.end_date,
            event.status,
            event.created_at,
            event.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Event> {
    conn.query_row(
        &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
        params![id],
        map_event,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("Event not found with id: {}", id)))
}

pub fn exists(conn: &Connection, id: &str) -> AppResult<bool> {
    let found: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM events WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn update(conn: &Connection, event: &Event) -> AppResult<()> {
    conn.execute(
        "UPDATE events
         SET name = ?2, description = ?3, date_deadline = ?4, start_date = ?5,
             end_date = ?6, status = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            event.id,
            event.name,
            event.description,
            event.date_deadline,
            event.start_date,
            event.end_date,
            event.status,
            event.updated_at,
        ],
    )?;
    Ok(())
}

/// Explicit cascade: reactions and media of the event's posts, the posts,
/// the registrations, then the event itself. Run inside a transaction.
pub fn delete_cascade(conn: &Connection, event_id: &str) -> AppResult<()> {
    conn.execute(
        "DELETE FROM post_reactions WHERE post_id IN (SELECT id FROM posts WHERE event_id = ?1)",
        params![event_id],
    )?;
    conn.execute(
        "DELETE FROM post_media WHERE post_id IN (SELECT id FROM posts WHERE event_id = ?1)",
        params![event_id],
    )?;
    conn.execute("DELETE FROM posts WHERE event_id = ?1", params![event_id])?;
    conn.execute(
        "DELETE FROM registrations WHERE event_id = ?1",
        params![event_id],
    )?;
    conn.execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
    Ok(())
}

/// Filtered listing as one parameterized query. `restrict_to` is the
/// non-admin visibility rule: APPROVED events, or events the viewer owns.
pub fn list(
    conn: &Connection,
    filter: &EventFilter,
    restrict_to: Option<&str>,
) -> AppResult<Vec<Event>> {
    let mut sql = format!("SELECT {} FROM events WHERE 1=1", EVENT_COLUMNS);
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        args.push(Box::new(status));
    }
    if let Some(ref owner_id) = filter.owner_id {
        sql.push_str(" AND owner_id = ?");
        args.push(Box::new(owner_id.clone()));
    }
    if let Some(ref search) = filter.search {
        sql.push_str(" AND name LIKE '%' || ? || '%'");
        args.push(Box::new(search.clone()));
    }
    if let Some(viewer_id) = restrict_to {
        sql.push_str(&format!(
            " AND (status = '{}' OR owner_id = ?)",
            EventStatus::Approved.as_str()
        ));
        args.push(Box::new(viewer_id.to_string()));
    }

    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");
    args.push(Box::new(filter.limit.unwrap_or(50).clamp(1, 200)));
    args.push(Box::new(filter.offset.unwrap_or(0).max(0)));

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(args), map_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
