//! Generation submit handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use reelgen_media::ProcessRequest;
use reelgen_models::{
    generation_id, GenerationAction, GenerationInput, GenerationOutputItem, GenerationRecord,
    Img2imgParams, Img2vidParams, Txt2imgParams, VideoExtension,
};
use reelgen_queue::{GenerateVideoJob, QueueJob};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Response for a completed synchronous generation.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub id: String,
    pub timestamp: i64,
    pub status: &'static str,
    pub outputs: Vec<GenerationOutputItem>,
}

/// Receipt for an accepted asynchronous generation.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub id: String,
    pub timestamp: i64,
    pub status: &'static str,
}

/// Text-to-image, synchronous.
///
/// POST /v1/generate/text-to-image
pub async fn text_to_image(
    State(state): State<AppState>,
    Json(params): Json<Txt2imgParams>,
) -> ApiResult<Json<GenerationResponse>> {
    let id = generation_id();
    let timestamp = Utc::now().timestamp_millis();
    let budget = state.gateway.config().txt2img_budget_ms;

    let result = state.gateway.txt2img(&id, timestamp, &params, budget).await;
    observe(GenerationAction::Txt2img, timestamp, &result);
    let result = result?;

    let record = GenerationRecord::completed(
        id,
        timestamp,
        GenerationAction::Txt2img,
        GenerationInput::Txt2img(params),
        result.outputs.clone(),
    );
    state.store.save(&record).await?;
    notify(&state, &record).await;

    info!(id = %record.id, outputs = record.outputs.len(), "txt2img completed");
    Ok(Json(GenerationResponse {
        id: record.id,
        timestamp,
        status: result.status,
        outputs: result.outputs,
    }))
}

/// Image-to-image, synchronous.
///
/// POST /v1/generate/image-to-image
pub async fn image_to_image(
    State(state): State<AppState>,
    Json(params): Json<Img2imgParams>,
) -> ApiResult<Json<GenerationResponse>> {
    let id = generation_id();
    let timestamp = Utc::now().timestamp_millis();
    let budget = state.gateway.config().txt2img_budget_ms;

    let result = state.gateway.img2img(&id, timestamp, &params, budget).await;
    observe(GenerationAction::Img2img, timestamp, &result);
    let result = result?;

    let record = GenerationRecord::completed(
        id,
        timestamp,
        GenerationAction::Img2img,
        GenerationInput::Img2img(params),
        result.outputs.clone(),
    );
    state.store.save(&record).await?;
    notify(&state, &record).await;

    info!(id = %record.id, outputs = record.outputs.len(), "img2img completed");
    Ok(Json(GenerationResponse {
        id: record.id,
        timestamp,
        status: result.status,
        outputs: result.outputs,
    }))
}

/// Image-to-video, synchronous. Post-processing runs inline; a failed
/// overlay/transcode falls back to the raw provider output.
///
/// POST /v1/generate/image-to-video
pub async fn image_to_video(
    State(state): State<AppState>,
    Json(params): Json<Img2vidParams>,
) -> ApiResult<Json<GenerationResponse>> {
    let id = generation_id();
    let timestamp = Utc::now().timestamp_millis();
    let budget = state.gateway.config().img2vid_budget_ms;

    let result = state.gateway.img2vid(&id, timestamp, &params, budget).await;
    observe(GenerationAction::Img2vid, timestamp, &result);
    let result = result?;

    let mut outputs = result.outputs;
    if params.needs_processing() {
        if let Some(first) = outputs.first_mut() {
            match state
                .pipeline
                .process(&process_request(&id, &params, &first.url))
                .await
            {
                Ok(url) => first.url = url,
                Err(e) => warn!(id, error = %e, "post-processing failed, keeping raw output"),
            }
        }
    }

    let record = GenerationRecord::completed(
        id,
        timestamp,
        GenerationAction::Img2vid,
        GenerationInput::Img2vid(params),
        outputs.clone(),
    );
    state.store.save(&record).await?;
    notify(&state, &record).await;

    info!(id = %record.id, "img2vid completed");
    Ok(Json(GenerationResponse {
        id: record.id,
        timestamp,
        status: result.status,
        outputs,
    }))
}

/// Image-to-video, asynchronous. Writes the pending record first, then
/// enqueues; the receipt is returned as soon as the job is on the queue.
///
/// POST /v1/async/image-to-video
pub async fn async_image_to_video(
    State(state): State<AppState>,
    Json(params): Json<Img2vidParams>,
) -> ApiResult<(StatusCode, Json<PendingResponse>)> {
    if params.image_url.is_empty() {
        return Err(ApiError::bad_request("image_url is required"));
    }

    let id = generation_id();
    let timestamp = Utc::now().timestamp_millis();

    let record = GenerationRecord::pending(
        id.clone(),
        timestamp,
        GenerationInput::Img2vid(params.clone()),
    );
    state.store.save(&record).await?;

    let job = QueueJob::GenerateVideo(GenerateVideoJob::new(id.clone(), timestamp, params));
    state.queue.enqueue(&job).await?;
    metrics::record_job_enqueued("generate_video");

    info!(id, "async img2vid accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(PendingResponse {
            id,
            timestamp,
            status: "pending",
        }),
    ))
}

/// Build the post-processing request for a video generation.
pub(crate) fn process_request(
    id: &str,
    params: &Img2vidParams,
    source_url: &str,
) -> ProcessRequest {
    ProcessRequest {
        id: id.to_string(),
        width: params.width,
        source_url: source_url.to_string(),
        target_ext: params.output_type.unwrap_or(VideoExtension::Mp4),
        overlay_base64: params.overlay_base64.clone(),
        output_width: params.output_width.unwrap_or(params.width),
    }
}

async fn notify(state: &AppState, record: &GenerationRecord) {
    if let Some(first) = record.outputs.first() {
        state
            .notifier
            .notify_generation(&record.id, record.action.as_str(), &first.url)
            .await;
    }
}

fn observe<T>(
    action: GenerationAction,
    timestamp: i64,
    result: &Result<T, reelgen_provider::ProviderError>,
) {
    let outcome = if result.is_ok() { "success" } else { "error" };
    let elapsed = (Utc::now().timestamp_millis() - timestamp) as f64 / 1000.0;
    metrics::record_generation(action.as_str(), outcome, elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_request_defaults() {
        let params = Img2vidParams {
            image_url: "https://example.com/i.png".to_string(),
            model_id: "m".to_string(),
            width: 512,
            height: 512,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: None,
            overlay_text: None,
            image_generation_id: None,
            output_type: None,
            output_width: None,
            user_id: None,
        };
        let req = process_request("abc", &params, "https://cdn.example.com/v.mp4");
        assert_eq!(req.target_ext, VideoExtension::Mp4);
        assert_eq!(req.output_width, 512);
        assert_eq!(req.source_url, "https://cdn.example.com/v.mp4");
    }
}
