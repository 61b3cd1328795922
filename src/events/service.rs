use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::require_owner_or_admin;
use crate::db::models::Event;
use crate::error::{AppError, AppResult};
use crate::events::domain::{self, EventFilter, EventStatus};
use crate::events::repository;
use crate::extractors::CurrentUser;
use crate::state::DbPool;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub date_deadline: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: EventStatus,
    pub owner_id: String,
}

impl EventDto {
    fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            description: event.description.clone(),
            date_deadline: event.date_deadline,
            start_date: event.start_date,
            end_date: event.end_date,
            status: event.status,
            owner_id: event.owner_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub date_deadline: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub fn create(pool: &DbPool, user: &CurrentUser, req: CreateEventRequest) -> AppResult<EventDto> {
    domain::validate_name(&req.name)?;
    domain::validate_schedule(req.date_deadline, req.start_date, req.end_date)?;

    let now = Utc::now();
    let event = Event {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: user.id.clone(),
        name: req.name.trim().to_string(),
        description: req.description,
        date_deadline: req.date_deadline,
        start_date: req.start_date,
        end_date: req.end_date,
        status: EventStatus::Draft,
        created_at: now,
        updated_at: now,
    };

    let conn = pool.get()?;
    repository::insert(&conn, &event)?;
    Ok(EventDto::from_event(&event))
}

/// A non-APPROVED event is visible only to its owner or an admin.
pub fn get(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<EventDto> {
    let conn = pool.get()?;
    let event = repository::find_by_id(&conn, id)?;

    if event.status != EventStatus::Approved {
        require_owner_or_admin(&event.owner_id, user)?;
    }
    Ok(EventDto::from_event(&event))
}

pub fn list(pool: &DbPool, user: &CurrentUser, filter: &EventFilter) -> AppResult<Vec<EventDto>> {
    let conn = pool.get()?;
    let restrict_to = if user.is_admin() {
        None
    } else {
        Some(user.id.as_str())
    };
    let events = repository::list(&conn, filter, restrict_to)?;
    Ok(events.iter().map(EventDto::from_event).collect())
}

/// Partial update; the merged record is re-validated before writing.
pub fn update(
    pool: &DbPool,
    user: &CurrentUser,
    id: &str,
    req: UpdateEventRequest,
) -> AppResult<EventDto> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut event = repository::find_by_id(&tx, id)?;
    require_owner_or_admin(&event.owner_id, user)?;

    if let Some(name) = req.name {
        event.name = name;
    }
    if let Some(description) = req.description {
        event.description = Some(description);
    }
    if let Some(deadline) = req.date_deadline {
        event.date_deadline = deadline;
    }
    if let Some(start) = req.start_date {
        event.start_date = start;
    }
    if let Some(end) = req.end_date {
        event.end_date = end;
    }

    domain::validate_name(&event.name)?;
    domain::validate_schedule(event.date_deadline, event.start_date, event.end_date)?;

    event.updated_at = Utc::now();
    repository::update(&tx, &event)?;
    tx.commit()?;

    Ok(EventDto::from_event(&event))
}

pub fn delete(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let event = repository::find_by_id(&tx, id)?;
    require_owner_or_admin(&event.owner_id, user)?;

    repository::delete_cascade(&tx, &event.id)?;
    tx.commit()?;
    Ok(())
}

/// Owner sends the event to admin review. Strictly the owner: an admin who
/// does not own the event cannot submit on their behalf.
pub fn submit(pool: &DbPool, user: &CurrentUser, id: &str) -> AppResult<EventDto> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut event = repository::find_by_id(&tx, id)?;
    if event.owner_id != user.id {
        return Err(AppError::Forbidden(format!(
            "User is not the owner of event {}",
            event.id
        )));
    }

    event.status = domain::submit_transition(event.status)?;
    event.updated_at = Utc::now();
    repository::update(&tx, &event)?;
    tx.commit()?;

    tracing::info!("Event {} submitted for review", event.id);
    Ok(EventDto::from_event(&event))
}

/// Admin review decision. Routes gate on AdminUser; the check here keeps the
/// rule with the operation.
pub fn review(pool: &DbPool, user: &CurrentUser, id: &str, approve: bool) -> AppResult<EventDto> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin only operation".to_string()));
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut event = repository::find_by_id(&tx, id)?;
    event.status = domain::review_transition(event.status, approve)?;
    event.updated_at = Utc::now();
    repository::update(&tx, &event)?;
    tx.commit()?;

    tracing::info!(
        "Event {} {}",
        event.id,
        if approve { "approved" } else { "rejected" }
    );
    Ok(EventDto::from_event(&event))
}
