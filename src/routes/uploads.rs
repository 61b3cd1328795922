use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    temp_id: String,
}

/// Accepts a multipart `file` field, stages it under the temp area and
/// returns the generated name to reference from a later post.
async fn upload(
    State(state): State<AppState>,
    _user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        let temp_id = state.storage.save_temp(&bytes, &original_name)?;
        tracing::info!("Staged upload {} ({} bytes)", temp_id, bytes.len());
        return Ok(Json(UploadResponse { temp_id }));
    }

    Err(AppError::BadRequest(
        "Multipart request must contain a 'file' field".to_string(),
    ))
}
