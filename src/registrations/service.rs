use chrono::Utc;
use serde::Serialize;

use crate::auth::require_owner_or_admin;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::events::domain::EventStatus;
use crate::events::repository as events;
use crate::extractors::CurrentUser;
use crate::registrations::domain::{self, RegistrationFilter, RegistrationStatus};
use crate::registrations::repository::{self, RegistrationRow};
use crate::state::DbPool;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDto {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub event_id: String,
    pub event_name: String,
    pub status: RegistrationStatus,
}

impl RegistrationDto {
    fn from_row(row: &RegistrationRow) -> Self {
        Self {
            id: row.id.clone(),
            user_id: row.user_id.clone(),
            username: row.username.clone(),
            event_id: row.event_id.clone(),
            event_name: row.event_name.clone(),
            status: row.status,
        }
    }
}

/// Volunteer joins an event. Idempotent: an existing registration for
/// (user, event) is returned as-is. The UNIQUE(user_id, event_id) constraint
/// is the guarantee under concurrent joins; losing that race is folded into
/// the idempotent path by re-reading the winning row.
pub fn join_event(pool: &DbPool, user: &CurrentUser, event_id: &str) -> AppResult<RegistrationDto> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let event = events::find_by_id(&tx, event_id)?;

    // Non-approved events are invisible to volunteers.
    if event.status != EventStatus::Approved {
        return Err(AppError::NotFound("Event not found or not approved".to_string()));
    }
    if Utc::now() > event.date_deadline {
        return Err(AppError::InvalidOperation(
            "Registration deadline has passed for this event".to_string(),
        ));
    }

    if let Some(existing) = repository::find_by_user_and_event(&tx, &user.id, event_id)? {
        return Ok(RegistrationDto::from_row(&existing));
    }

    let id = uuid::Uuid::new_v4().to_string();
    match repository::insert(&tx, &id, &user.id, event_id, RegistrationStatus::Pending) {
        Ok(()) => {}
        Err(e) if db::is_constraint_violation(&e) => {
            // A concurrent join won; return its row.
            let winner = repository::find_by_user_and_event(&tx, &user.id, event_id)?
                .ok_or_else(|| AppError::Internal("registration vanished after conflict".into()))?;
            return Ok(RegistrationDto::from_row(&winner));
        }
        Err(e) => return Err(e.into()),
    }

    let row = repository::find_by_id(&tx, &id)?;
    tx.commit()?;

    tracing::info!("User {} joined event {}", user.username, event_id);
    Ok(RegistrationDto::from_row(&row))
}

/// Volunteer withdraws their own registration for an event.
pub fn cancel_join(pool: &DbPool, user: &CurrentUser, event_id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let row = repository::find_by_user_and_event(&tx, &user.id, event_id)?
        .ok_or_else(|| AppError::NotFound("Registration not found for this event".to_string()))?;

    domain::ensure_cancelable(row.status)?;

    repository::delete(&tx, &row.id)?;
    tx.commit()?;
    Ok(())
}

/// Remove a registration by id: the volunteer themselves or an admin.
pub fn delete_registration(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let row = repository::find_by_id(&tx, id)?;
    require_owner_or_admin(&row.user_id, user)?;

    repository::delete(&tx, &row.id)?;
    tx.commit()?;
    Ok(())
}

/// Visible to the volunteer, the event owner, or an admin.
pub fn get(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<RegistrationDto> {
    let conn = pool.get()?;
    let row = repository::find_by_id(&conn, id)?;

    let is_volunteer = row.user_id == user.id;
    let is_event_owner = row.event_owner_id == user.id;
    if !is_volunteer && !is_event_owner && !user.is_admin() {
        return Err(AppError::Forbidden(
            "You do not have permission to view this registration".to_string(),
        ));
    }
    Ok(RegistrationDto::from_row(&row))
}

pub fn list(
    pool: &DbPool,
    user: &CurrentUser,
    filter: &RegistrationFilter,
) -> AppResult<Vec<RegistrationDto>> {
    let conn = pool.get()?;
    let restrict_to = if user.is_admin() {
        None
    } else {
        Some(user.id.as_str())
    };
    let rows = repository::list(&conn, filter, restrict_to)?;
    Ok(rows.iter().map(RegistrationDto::from_row).collect())
}

/// Event manager (or admin) approves or rejects a volunteer.
pub fn decide(
    pool: &DbPool,
    user: &CurrentUser,
    id: &str,
    approve: bool,
) -> AppResult<RegistrationDto> {
    update_status(pool, user, id, |status| domain::decide_transition(status, approve))
}

/// Event manager (or admin) marks the participation done.
pub fn complete(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<RegistrationDto> {
    update_status(pool, user, id, domain::complete_transition)
}

fn update_status(
    pool: &DbPool,
    user: &CurrentUser,
    id: &str,
    transition: impl FnOnce(RegistrationStatus) -> AppResult<RegistrationStatus>,
) -> AppResult<RegistrationDto> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut row = repository::find_by_id(&tx, id)?;
    require_owner_or_admin(&row.event_owner_id, user)?;

    row.status = transition(row.status)?;
    repository::update_status(&tx, &row.id, row.status)?;
    tx.commit()?;

    tracing::info!("Registration {} moved to {}", row.id, row.status);
    Ok(RegistrationDto::from_row(&row))
}
