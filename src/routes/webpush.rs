use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::webpush::{self, Notifier, SubscriptionRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webpush/public-key", get(public_key))
        .route("/webpush/subscribe", post(subscribe))
        .route("/webpush/verify-subscription", post(verify_subscription))
        .route("/webpush/test", get(send_test))
}

fn notifier(state: &AppState) -> AppResult<&Arc<Notifier>> {
    state.notifier.as_ref().ok_or_else(|| {
        AppError::InvalidOperation("Push notifications are disabled in configuration".to_string())
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    exists: bool,
}

async fn public_key(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<PublicKeyResponse>> {
    let notifier = notifier(&state)?;
    Ok(Json(PublicKeyResponse {
        public_key: notifier.public_key().to_string(),
    }))
}

async fn subscribe(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SubscriptionRequest>,
) -> AppResult<StatusCode> {
    let notifier = notifier(&state)?;
    notifier.subscribe(&state.db, &user.id, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn verify_subscription(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(req): Json<SubscriptionRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let notifier = notifier(&state)?;
    Ok(Json(VerifyResponse {
        exists: notifier.verify_subscription(&state.db, &req.endpoint)?,
    }))
}

/// Manual end-to-end check for a browser that just subscribed.
async fn send_test(State(state): State<AppState>, user: CurrentUser) -> AppResult<StatusCode> {
    let notifier = notifier(&state)?;
    tracing::info!("Sending test push notification to {}", user.username);
    notifier
        .send_to_user(
            &state.db,
            &user.id,
            &webpush::payload(
                "Push Notification Test",
                "Push notification works normally!!!",
                "/",
            ),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
