use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{self, repository};
use crate::db;
use crate::db::models::{User, UserRole};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    for (field, value) in [
        ("firstname", &req.firstname),
        ("lastname", &req.lastname),
        ("username", &req.username),
        ("password", &req.password),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
        }
    }

    let hash = auth::hash_password(&req.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;
    let user = repository::new_user(
        req.firstname.trim(),
        req.lastname.trim(),
        req.username.trim(),
        &hash,
    );

    let conn = state.db.get()?;
    if repository::find_by_username(&conn, &user.username)?.is_some() {
        return Err(AppError::BadRequest("username already taken".to_string()));
    }
    match repository::insert(&conn, &user) {
        Ok(()) => {}
        // Lost the race against a concurrent register with the same name.
        Err(AppError::Database(e)) if db::is_constraint_violation(&e) => {
            return Err(AppError::BadRequest("username already taken".to_string()));
        }
        Err(e) => return Err(e),
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let conn = state.db.get()?;
    let user = repository::find_by_username(&conn, req.username.trim())?
        .ok_or(AppError::Unauthorized)?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let (token, expires_at) = auth::generate_token(&user.username, &state.config)?;
    tracing::info!("User '{}' logged in", user.username);

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: UserResponse::from_user(&user),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let conn = state.db.get()?;
    let user = repository::find_by_id(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(UserResponse::from_user(&user)))
}
