pub mod auth;
pub mod events;
pub mod posts;
pub mod registrations;
pub mod uploads;
pub mod webpush;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(events::router())
        .merge(registrations::router())
        .merge(posts::router())
        .merge(uploads::router())
        .merge(webpush::router());

    let uploads_dir = state.storage.uploads_dir();
    let public_dir = state.storage.public_dir();

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .nest_service("/public", ServeDir::new(public_dir))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(error_envelope))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource not found".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Rewrites every error response into the uniform
/// `{status, message, path}` body. Only this layer sees the request URI, so
/// the path lands here rather than in each IntoResponse.
async fn error_envelope(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let mut status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    // Body extractors reject with 422; the API's taxonomy calls that a
    // plain bad request.
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        status = StatusCode::BAD_REQUEST;
    }

    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap_or_default();
    let message = if bytes.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    (
        status,
        Json(ErrorBody {
            status: status.as_u16(),
            message,
            path,
        }),
    )
        .into_response()
}

/// Fire-and-forget push dispatch. Callers never observe delivery failure.
pub(crate) fn notify(state: &AppState, user_id: String, payload_json: String) {
    let Some(notifier) = state.notifier.clone() else {
        return;
    };
    let pool = state.db.clone();
    tokio::spawn(async move {
        notifier.send_to_user(&pool, &user_id, &payload_json).await;
    });
}
