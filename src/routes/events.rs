use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::AppResult;
use crate::events::domain::EventFilter;
use crate::events::service::{self, CreateEventRequest, EventDto, UpdateEventRequest};
use crate::extractors::{AdminUser, CurrentUser};
use crate::routes::notify;
use crate::state::AppState;
use crate::webpush;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create).get(list))
        .route(
            "/events/{id}",
            get(get_event).patch(update).delete(delete_event),
        )
        .route("/events/{id}/submit", post(submit))
        .route("/admin/events/{id}/approve", post(approve))
        .route("/admin/events/{id}/reject", post(reject))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<EventDto>)> {
    let dto = service::create(&state.db, &user, req)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<EventDto>> {
    Ok(Json(service::get(&state.db, &user, &id)?))
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<EventFilter>,
) -> AppResult<Json<Vec<EventDto>>> {
    Ok(Json(service::list(&state.db, &user, &filter)?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<Json<EventDto>> {
    Ok(Json(service::update(&state.db, &user, &id, req)?))
}

async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    service::delete(&state.db, &user, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<EventDto>> {
    Ok(Json(service::submit(&state.db, &user, &id)?))
}

async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<EventDto>> {
    let dto = service::review(&state.db, &admin, &id, true)?;
    notify(
        &state,
        dto.owner_id.clone(),
        webpush::payload(
            "Event approved",
            &format!("'{}' is now visible to volunteers.", dto.name),
            &format!("/events/{}", dto.id),
        ),
    );
    Ok(Json(dto))
}

async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<EventDto>> {
    let dto = service::review(&state.db, &admin, &id, false)?;
    notify(
        &state,
        dto.owner_id.clone(),
        webpush::payload(
            "Event rejected",
            &format!("'{}' was rejected by an administrator.", dto.name),
            &format!("/events/{}", dto.id),
        ),
    );
    Ok(Json(dto))
}
