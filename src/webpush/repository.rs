use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::PushSubscription;
use crate::error::AppResult;

fn map_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushSubscription> {
    Ok(PushSubscription {
        id: row.get(0)?,
        endpoint: row.get(1)?,
        p256dh: row.get(2)?,
        auth: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const COLUMNS: &str = "id, endpoint, p256dh, auth, user_id, created_at";

pub fn insert(
    conn: &Connection,
    endpoint: &str,
    p256dh: &str,
    auth: &str,
    user_id: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO push_subscriptions (id, endpoint, p256dh, auth, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            endpoint,
            p256dh,
            auth,
            user_id,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn find_by_endpoint(conn: &Connection, endpoint: &str) -> AppResult<Option<PushSubscription>> {
    let sub = conn
        .query_row(
            &format!(
                "SELECT {} FROM push_subscriptions WHERE endpoint = ?1",
                COLUMNS
            ),
            params![endpoint],
            map_subscription,
        )
        .optional()?;
    Ok(sub)
}

pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<PushSubscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM push_subscriptions WHERE user_id = ?1",
        COLUMNS
    ))?;
    let subs = stmt
        .query_map(params![user_id], map_subscription)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subs)
}

/// Used when the push service reports the endpoint gone.
pub fn delete_by_endpoint(conn: &Connection, endpoint: &str) -> AppResult<()> {
    conn.execute(
        "DELETE FROM push_subscriptions WHERE endpoint = ?1",
        params![endpoint],
    )?;
    Ok(())
}
