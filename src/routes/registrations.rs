use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::AppResult;
use crate::events::repository as events;
use crate::extractors::CurrentUser;
use crate::registrations::domain::RegistrationFilter;
use crate::registrations::service::{self, RegistrationDto};
use crate::routes::notify;
use crate::state::AppState;
use crate::webpush;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registrations", get(list))
        .route("/registrations/{id}", get(get_registration).delete(delete_registration))
        .route("/registrations/{id}/join", post(join))
        .route("/registrations/{id}/cancel-join", post(cancel_join))
        .route("/registrations/{id}/approve", post(approve))
        .route("/registrations/{id}/reject", post(reject))
        .route("/registrations/{id}/complete", post(complete))
}

async fn get_registration(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<RegistrationDto>> {
    Ok(Json(service::get(&state.db, &user, &id)?))
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<RegistrationFilter>,
) -> AppResult<Json<Vec<RegistrationDto>>> {
    Ok(Json(service::list(&state.db, &user, &filter)?))
}

async fn join(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<String>,
) -> AppResult<(StatusCode, Json<RegistrationDto>)> {
    let dto = service::join_event(&state.db, &user, &event_id)?;

    // Tell the event owner someone signed up.
    if let Ok(event) = state.db.get().map_err(crate::error::AppError::from).and_then(
        |conn| events::find_by_id(&conn, &event_id),
    ) {
        notify(
            &state,
            event.owner_id,
            webpush::payload(
                "New volunteer",
                &format!("{} wants to join '{}'.", user.username, event.name),
                &format!("/events/{}", event_id),
            ),
        );
    }

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn cancel_join(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<String>,
) -> AppResult<StatusCode> {
    service::cancel_join(&state.db, &user, &event_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_registration(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    service::delete_registration(&state.db, &user, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<RegistrationDto>> {
    let dto = service::decide(&state.db, &user, &id, true)?;
    notify_volunteer(&state, &dto, "Registration approved");
    Ok(Json(dto))
}

async fn reject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<RegistrationDto>> {
    let dto = service::decide(&state.db, &user, &id, false)?;
    notify_volunteer(&state, &dto, "Registration rejected");
    Ok(Json(dto))
}

async fn complete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<RegistrationDto>> {
    let dto = service::complete(&state.db, &user, &id)?;
    notify_volunteer(&state, &dto, "Participation completed");
    Ok(Json(dto))
}

fn notify_volunteer(state: &AppState, dto: &RegistrationDto, title: &str) {
    notify(
        state,
        dto.user_id.clone(),
        webpush::payload(
            title,
            &format!("Your registration for '{}' is now {}.", dto.event_name, dto.status),
            &format!("/events/{}", dto.event_id),
        ),
    );
}
