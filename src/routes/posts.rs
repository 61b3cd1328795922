use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::wall::domain::ReactionType;
use crate::wall::service::{self, CreatePostRequest, PostDto, ReactionCounts, UpdatePostRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/posts", get(list).post(create))
        .route(
            "/posts/{id}",
            get(get_post).patch(update).delete(delete_post),
        )
        .route("/posts/{id}/reaction", put(react).get(get_reaction))
}

#[derive(Deserialize)]
struct PageQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct ReactionRequest {
    #[serde(rename = "type")]
    reaction: ReactionType,
}

#[derive(Serialize)]
struct ReactionResponse {
    #[serde(rename = "type")]
    reaction: ReactionType,
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(event_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PostDto>>> {
    Ok(Json(service::list_by_event(
        &state.db,
        &event_id,
        page.limit.unwrap_or(50),
        page.offset.unwrap_or(0),
    )?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<String>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    let dto = service::create(&state.db, &state.storage, &user, &event_id, req)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_post(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<PostDto>> {
    Ok(Json(service::get(&state.db, &post_id)?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<PostDto>> {
    Ok(Json(service::update(
        &state.db,
        &state.storage,
        &user,
        &post_id,
        req,
    )?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<StatusCode> {
    service::delete(&state.db, &user, &post_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn react(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> AppResult<Json<ReactionCounts>> {
    Ok(Json(service::react(
        &state.db,
        &user,
        &post_id,
        req.reaction,
    )?))
}

async fn get_reaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<ReactionResponse>> {
    let reaction = service::get_reaction(&state.db, &user, &post_id)?;
    Ok(Json(ReactionResponse { reaction }))
}
