//! Image upload handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use reelgen_media::parse_base64_image;
use reelgen_models::generation_id;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Upload a base64-encoded image and return its public URL.
///
/// POST /v1/upload/image
pub async fn upload_image(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let image = parse_base64_image(&request.image_base64)?;
    let key = format!("{}.{}", generation_id(), image.image_type);
    let content_type = image.content_type();

    let url = state
        .storage
        .upload_bytes(&state.config.upload_bucket, &key, image.data, &content_type)
        .await?;

    info!(key, "uploaded image");
    Ok(Json(UploadResponse { url }))
}
