// Registration status workflow. Pure, no side effects.
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// PENDING --approve--> APPROVED --complete--> COMPLETED (terminal)
///         --reject---> REJECTED
/// Approve/reject may also flip an earlier decision, but nothing moves a
/// COMPLETED row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Approved => "APPROVED",
            RegistrationStatus::Rejected => "REJECTED",
            RegistrationStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RegistrationStatus::Pending),
            "APPROVED" => Some(RegistrationStatus::Approved),
            "REJECTED" => Some(RegistrationStatus::Rejected),
            "COMPLETED" => Some(RegistrationStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromSql for RegistrationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| RegistrationStatus::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

impl ToSql for RegistrationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// Event manager approves or rejects a volunteer. COMPLETED is terminal.
pub fn decide_transition(status: RegistrationStatus, approve: bool) -> AppResult<RegistrationStatus> {
    if status == RegistrationStatus::Completed {
        return Err(AppError::InvalidOperation(
            "Completed registrations cannot change status".to_string(),
        ));
    }
    Ok(if approve {
        RegistrationStatus::Approved
    } else {
        RegistrationStatus::Rejected
    })
}

/// Participation can only be marked done once it was approved.
pub fn complete_transition(status: RegistrationStatus) -> AppResult<RegistrationStatus> {
    match status {
        RegistrationStatus::Approved => Ok(RegistrationStatus::Completed),
        other => Err(AppError::InvalidOperation(format!(
            "Only approved registrations can be completed (current status {})",
            other
        ))),
    }
}

pub fn ensure_cancelable(status: RegistrationStatus) -> AppResult<()> {
    if status == RegistrationStatus::Completed {
        return Err(AppError::InvalidOperation(
            "Cannot cancel a completed participation".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
