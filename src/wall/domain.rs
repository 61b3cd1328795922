// Wall rules: reaction catalogue and post content validation.
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// One reaction per (post, user); NONE is the request sentinel for
/// "remove my reaction" and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionType {
    None,
    Like,
    Heart,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::None => "NONE",
            ReactionType::Like => "LIKE",
            ReactionType::Heart => "HEART",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(ReactionType::None),
            "LIKE" => Some(ReactionType::Like),
            "HEART" => Some(ReactionType::Heart),
            _ => None,
        }
    }
}

impl FromSql for ReactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| ReactionType::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

impl ToSql for ReactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

pub fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content cannot be empty".to_string()));
    }
    Ok(())
}

/// A media reference is the temp file name handed out by the upload API:
/// `{uuid}.{ext}`. The stem must parse as a UUID.
pub fn media_resource_id(temp_name: &str) -> AppResult<String> {
    let stem = match temp_name.rfind('.') {
        Some(idx) => &temp_name[..idx],
        None => temp_name,
    };
    uuid::Uuid::parse_str(stem)
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest("Invalid media ID format".to_string()))
}
