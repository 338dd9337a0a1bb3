//! Image upload endpoint.
//!
//! Stores the uploaded file under the configured directory with a generated
//! name and returns the URL it is served from.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use uuid::Uuid;

use crate::error::ServiceError;

use super::routes::AppState;
use super::types::UploadResponse;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// POST /api/auth/upload-image - Multipart upload of a profile image.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(format!("invalid multipart payload: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| name.rsplit('.').next())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::Validation(
                "only jpg, jpeg, png, gif and webp files are allowed".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::Validation(format!("failed to read upload: {e}")))?;

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let path = state.config.upload_dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ServiceError::Internal(format!("failed to store upload: {e}")))?;

        tracing::info!(file = %file_name, bytes = data.len(), "stored uploaded image");
        return Ok(Json(UploadResponse {
            image_url: format!("/uploads/{file_name}"),
        }));
    }

    Err(ServiceError::Validation("no file uploaded".to_string()))
}
