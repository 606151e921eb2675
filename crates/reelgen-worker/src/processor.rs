//! Job processing.

use std::sync::Arc;

use tracing::{info, warn};

use reelgen_media::{PipelineConfig, ProcessRequest, VideoPipeline};
use reelgen_models::{
    GenerationAction, GenerationInput, GenerationRecord, Img2vidParams, VideoExtension, Visibility,
};
use reelgen_provider::{ProviderConfig, ProviderGateway, WebhookNotifier};
use reelgen_queue::GenerateVideoJob;
use reelgen_storage::ObjectStore;
use reelgen_store::GenerationsTable;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Shared clients for job processing.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub gateway: ProviderGateway,
    pub store: GenerationsTable,
    pub pipeline: VideoPipeline,
    pub notifier: WebhookNotifier,
}

impl ProcessingContext {
    /// Create a new processing context from the environment.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let gateway = ProviderGateway::new(ProviderConfig::from_env()?);
        let store = GenerationsTable::from_env().await;
        let storage = ObjectStore::from_env().await;
        let pipeline = VideoPipeline::new(storage, PipelineConfig::from_env());
        let notifier = WebhookNotifier::from_env();

        Ok(Self {
            config,
            gateway,
            store,
            pipeline,
            notifier,
        })
    }
}

/// Run a queued image-to-video generation end to end.
///
/// Overwrites the pending record at the same `(id, timestamp)` with the
/// terminal one. A failed post-processing step keeps the raw provider URL;
/// only a failed generation or save fails the job.
pub async fn process_generate_video(
    ctx: &Arc<ProcessingContext>,
    job: &GenerateVideoJob,
) -> WorkerResult<()> {
    let budget = ctx.gateway.config().img2vid_budget_ms;
    let result = ctx
        .gateway
        .img2vid(&job.id, job.timestamp, &job.input, budget)
        .await?;

    let mut outputs = result.outputs;
    if job.input.needs_processing() {
        if let Some(first) = outputs.first_mut() {
            match ctx
                .pipeline
                .process(&process_request(&job.id, &job.input, &first.url))
                .await
            {
                Ok(url) => first.url = url,
                Err(e) => {
                    warn!(id = %job.id, error = %e, "post-processing failed, keeping raw output")
                }
            }
        }
    }

    let nsfw = resolve_nsfw(ctx, &job.input, outputs.first().and_then(|o| o.nsfw)).await;

    let mut record = GenerationRecord::completed(
        job.id.clone(),
        job.timestamp,
        GenerationAction::Img2vid,
        GenerationInput::Img2vid(job.input.clone()),
        outputs,
    );
    record.visibility = Some(visibility_for(nsfw));
    ctx.store.save(&record).await?;

    if let Some(first) = record.outputs.first() {
        ctx.notifier
            .notify_generation(&record.id, record.action.as_str(), &first.url)
            .await;
    }

    info!(id = %record.id, visibility = ?record.visibility, "async img2vid completed");
    Ok(())
}

/// NSFW flag for the produced video. Video providers rarely report one, so
/// the flag of the source image generation is inherited when available.
async fn resolve_nsfw(
    ctx: &Arc<ProcessingContext>,
    input: &Img2vidParams,
    own: Option<bool>,
) -> Option<bool> {
    if own.is_some() {
        return own;
    }
    let source_id = input.image_generation_id.as_deref()?;
    match ctx.store.read(source_id).await {
        Ok(source) => source.first_output_nsfw(),
        Err(e) => {
            warn!(source_id, error = %e, "failed to read source generation for nsfw flag");
            None
        }
    }
}

/// NSFW content is persisted but kept out of the community feed.
fn visibility_for(nsfw: Option<bool>) -> Visibility {
    if nsfw == Some(true) {
        Visibility::Private
    } else {
        Visibility::Community
    }
}

fn process_request(id: &str, params: &Img2vidParams, source_url: &str) -> ProcessRequest {
    ProcessRequest {
        id: id.to_string(),
        width: params.width,
        source_url: source_url.to_string(),
        target_ext: params.output_type.unwrap_or(VideoExtension::Mp4),
        overlay_base64: params.overlay_base64.clone(),
        output_width: params.output_width.unwrap_or(params.width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Img2vidParams {
        Img2vidParams {
            image_url: "https://example.com/i.png".to_string(),
            model_id: "stabilityai/stable-video-diffusion-img2vid-xt".to_string(),
            width: 576,
            height: 1024,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: Some("AAAA".to_string()),
            overlay_text: None,
            image_generation_id: None,
            output_type: Some(VideoExtension::Gif),
            output_width: Some(320),
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_nsfw_forces_private_visibility() {
        assert_eq!(visibility_for(Some(true)), Visibility::Private);
        assert_eq!(visibility_for(Some(false)), Visibility::Community);
        assert_eq!(visibility_for(None), Visibility::Community);
    }

    #[test]
    fn test_process_request_honors_output_overrides() {
        let req = process_request("abc", &params(), "https://cdn.example.com/raw.mp4");
        assert_eq!(req.target_ext, VideoExtension::Gif);
        assert_eq!(req.output_width, 320);
        assert_eq!(req.overlay_base64.as_deref(), Some("AAAA"));
        assert_eq!(req.width, 576);
    }
}
