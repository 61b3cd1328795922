// Event status workflow and input validation. Pure, no side effects.
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// DRAFT --submit--> PENDING --approve--> APPROVED
///                           --reject---> REJECTED --submit--> PENDING
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Pending => "PENDING",
            EventStatus::Approved => "APPROVED",
            EventStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(EventStatus::Draft),
            "PENDING" => Some(EventStatus::Pending),
            "APPROVED" => Some(EventStatus::Approved),
            "REJECTED" => Some(EventStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromSql for EventStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| EventStatus::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

impl ToSql for EventStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// Owner submits for review. Valid only from DRAFT or REJECTED; every other
/// status errors rather than silently keeping the old value.
pub fn submit_transition(status: EventStatus) -> AppResult<EventStatus> {
    match status {
        EventStatus::Draft | EventStatus::Rejected => Ok(EventStatus::Pending),
        other => Err(AppError::InvalidOperation(format!(
            "Cannot submit an event in status {}",
            other
        ))),
    }
}

/// Admin review decision. Valid only from PENDING.
pub fn review_transition(status: EventStatus, approve: bool) -> AppResult<EventStatus> {
    match status {
        EventStatus::Pending => Ok(if approve {
            EventStatus::Approved
        } else {
            EventStatus::Rejected
        }),
        other => Err(AppError::InvalidOperation(format!(
            "Cannot review an event in status {}",
            other
        ))),
    }
}

pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Event name cannot be empty".to_string()));
    }
    Ok(())
}

/// Deadline must not come after the start, and the start not after the end.
pub fn validate_schedule(
    deadline: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<()> {
    if deadline > start {
        return Err(AppError::BadRequest(
            "Registration deadline must not be after the start date".to_string(),
        ));
    }
    if start > end {
        return Err(AppError::BadRequest(
            "Start date must not be after the end date".to_string(),
        ));
    }
    Ok(())
}

/// Caller-supplied listing filters, combined conjunctively with the
/// visibility rule in the repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub owner_id: Option<String>,
    /// Substring match on the event name.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
