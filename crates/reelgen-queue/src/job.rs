//! Job types for the dispatch queue.

use serde::{Deserialize, Serialize};

use reelgen_models::Img2vidParams;

/// Job to run an image-to-video generation out of band.
///
/// Carries the full input, overlay payload included: the pending record is
/// stripped of inline binary, so the queue is the only channel the overlay
/// travels through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateVideoJob {
    /// Generation id; matches the pending record.
    pub id: String,
    /// Pending record timestamp, milliseconds since epoch.
    pub timestamp: i64,
    /// The video generation input.
    pub input: Img2vidParams,
}

impl GenerateVideoJob {
    pub fn new(id: impl Into<String>, timestamp: i64, input: Img2vidParams) -> Self {
        Self {
            id: id.into(),
            timestamp,
            input,
        }
    }
}

/// All jobs that can be placed on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    GenerateVideo(GenerateVideoJob),
}

impl QueueJob {
    /// Id of the generation this job belongs to.
    pub fn generation_id(&self) -> &str {
        match self {
            QueueJob::GenerateVideo(job) => &job.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> Img2vidParams {
        Img2vidParams {
            image_url: "https://example.com/i.png".to_string(),
            model_id: "stabilityai/stable-video-diffusion-img2vid-xt".to_string(),
            width: 512,
            height: 512,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: Some("AAAA".to_string()),
            overlay_text: None,
            image_generation_id: Some("f00f00f00f".to_string()),
            output_type: None,
            output_width: None,
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_job_roundtrip_keeps_overlay() {
        let job = QueueJob::GenerateVideo(GenerateVideoJob::new(
            "a1b2c3d4e5",
            1_700_000_000_000,
            input(),
        ));
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"type\":\"generate_video\""));

        let back: QueueJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.generation_id(), "a1b2c3d4e5");
        let QueueJob::GenerateVideo(job) = back;
        assert_eq!(job.input.overlay_base64.as_deref(), Some("AAAA"));
        assert_eq!(job.timestamp, 1_700_000_000_000);
    }
}
