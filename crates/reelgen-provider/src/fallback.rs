//! Fallback generation provider client.
//!
//! The fallback exposes one endpoint per model family and a fixed request
//! shape, so requests are mapped through a model → endpoint lookup and an
//! aspect-ratio → size-bucket classifier.

use std::time::{Duration, Instant};

use futures_util::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use reelgen_models::{GenerationOutputItem, Img2imgParams, Img2vidParams, Seed, Txt2imgParams};

use crate::error::{ProviderError, ProviderResult};
use crate::metrics;
use crate::repair::repair_image_url;

const PROVIDER: &str = "fallback";

/// Size buckets the fallback provider accepts instead of raw dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Square,
    SquareHd,
    Portrait43,
    Portrait169,
    Landscape43,
    Landscape169,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "square",
            ImageSize::SquareHd => "square_hd",
            ImageSize::Portrait43 => "portrait_4_3",
            ImageSize::Portrait169 => "portrait_16_9",
            ImageSize::Landscape43 => "landscape_4_3",
            ImageSize::Landscape169 => "landscape_16_9",
        }
    }

    /// Classify raw dimensions into a bucket. The 0.75 ratio threshold
    /// separates 4:3-ish from 16:9-ish shapes.
    pub fn classify(width: u32, height: u32) -> Self {
        if width < height {
            if width as f64 / height as f64 >= 0.75 {
                ImageSize::Portrait43
            } else {
                ImageSize::Portrait169
            }
        } else if width > height {
            if height as f64 / width as f64 >= 0.75 {
                ImageSize::Landscape43
            } else {
                ImageSize::Landscape169
            }
        } else if width > 512 {
            ImageSize::SquareHd
        } else {
            ImageSize::Square
        }
    }
}

/// Map an image model id onto the fallback endpoint serving it.
pub fn lookup_endpoint(model_id: &str) -> &'static str {
    match model_id {
        "stabilityai/sd-turbo" | "stabilityai/sdxl-turbo" => "/fast-turbo-diffusion",
        "stabilityai/stable-diffusion-xl-base-1.0" => "/fast-sdxl",
        "runwayml/stable-diffusion-v1-5" => "/lcm-sd15-i2i",
        _ => "/fast-lightning-sdxl",
    }
}

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    video: Option<FallbackVideo>,
    #[serde(default)]
    images: Option<Vec<FallbackImage>>,
    #[serde(default)]
    seed: Option<Seed>,
}

#[derive(Debug, Deserialize)]
struct FallbackVideo {
    url: String,
}

#[derive(Debug, Deserialize)]
struct FallbackImage {
    url: String,
}

impl FallbackResponse {
    fn into_outputs(self) -> Vec<GenerationOutputItem> {
        let seed = self.seed.unwrap_or(Seed::Num(0));
        if let Some(video) = self.video {
            return vec![GenerationOutputItem {
                url: video.url,
                seed,
                nsfw: Some(false),
            }];
        }
        self.images
            .unwrap_or_default()
            .into_iter()
            .map(|img| GenerationOutputItem {
                url: img.url,
                seed: seed.clone(),
                nsfw: None,
            })
            .collect()
    }
}

/// Client for the fallback generation provider.
#[derive(Clone)]
pub struct FallbackClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl FallbackClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http,
        }
    }

    /// Text-to-image against the endpoint serving the requested model.
    ///
    /// The provider rejects `num_images > 1` on some endpoints, so
    /// multi-image requests fan out as N parallel single-image requests,
    /// concatenated in request order. Any one failing fails the call.
    pub async fn txt2img(
        &self,
        params: &Txt2imgParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let endpoint = lookup_endpoint(&params.model_id);
        let size = ImageSize::classify(params.width, params.height);
        let body = json!({
            "prompt": params.prompt,
            "image_size": size.as_str(),
            "num_inference_steps": 8,
            "num_images": 1,
            "seed": params.seed,
        });

        let n = params.num_images_per_prompt.max(1) as usize;
        if n == 1 {
            return self.send(endpoint, &body, timeout).await;
        }

        let attempts = (0..n).map(|_| self.send(endpoint, &body, timeout));
        let batches = try_join_all(attempts).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Image-to-image against the endpoint serving the requested model.
    ///
    /// Same fan-out rule as text-to-image for multi-image requests.
    pub async fn img2img(
        &self,
        params: &Img2imgParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let endpoint = lookup_endpoint(&params.model_id);
        let body = json!({
            "prompt": params.prompt,
            "image_url": repair_image_url(&params.image_url),
            "strength": params.strength,
            "num_inference_steps": 8,
            "num_images": 1,
            "seed": params.seed,
        });

        let n = params.num_images_per_prompt.max(1) as usize;
        if n == 1 {
            return self.send(endpoint, &body, timeout).await;
        }

        let attempts = (0..n).map(|_| self.send(endpoint, &body, timeout));
        let batches = try_join_all(attempts).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Image-to-video: fixed endpoint, fixed 6 fps.
    pub async fn img2vid(
        &self,
        params: &Img2vidParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let body = json!({
            "image_url": repair_image_url(&params.image_url),
            "motion_bucket_id": params.motion_bucket_id,
            "cond_aug": params.noise_aug_strength,
            "fps": 6,
            "seed": params.seed,
        });
        self.send("/fast-svd", &body, timeout).await
    }

    async fn send(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        metrics::record_request(PROVIDER, path);
        let started = Instant::now();

        let result = self.attempt(path, body, timeout).await;

        metrics::record_duration(PROVIDER, path, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::record_error(PROVIDER, path, e.status());
        }
        result
    }

    async fn attempt(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", &self.api_key)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(path, &e))?;

        let status = res.status();
        if !status.is_success() {
            let data = res.text().await.unwrap_or_default();
            return Err(ProviderError::new("Generation failed", path)
                .with_status(status.as_u16())
                .with_data(data));
        }

        let parsed: FallbackResponse = res
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(path, &e).with_status(status.as_u16()))?;

        let outputs = parsed.into_outputs();
        if outputs.is_empty() {
            return Err(ProviderError::new("No assets", path).with_status(status.as_u16()));
        }
        debug!(path, count = outputs.len(), "fallback generation ok");
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_buckets() {
        assert_eq!(ImageSize::classify(512, 512), ImageSize::Square);
        assert_eq!(ImageSize::classify(1024, 1024), ImageSize::SquareHd);
        assert_eq!(ImageSize::classify(768, 1024), ImageSize::Portrait43);
        assert_eq!(ImageSize::classify(576, 1024), ImageSize::Portrait169);
        assert_eq!(ImageSize::classify(1024, 768), ImageSize::Landscape43);
        assert_eq!(ImageSize::classify(1024, 576), ImageSize::Landscape169);
    }

    #[test]
    fn test_ratio_threshold_is_inclusive() {
        // Exactly 0.75 lands in the 4:3 bucket on both orientations.
        assert_eq!(ImageSize::classify(750, 1000), ImageSize::Portrait43);
        assert_eq!(ImageSize::classify(1000, 750), ImageSize::Landscape43);
    }

    #[test]
    fn test_endpoint_lookup() {
        assert_eq!(lookup_endpoint("stabilityai/sd-turbo"), "/fast-turbo-diffusion");
        assert_eq!(lookup_endpoint("stabilityai/sdxl-turbo"), "/fast-turbo-diffusion");
        assert_eq!(
            lookup_endpoint("stabilityai/stable-diffusion-xl-base-1.0"),
            "/fast-sdxl"
        );
        assert_eq!(lookup_endpoint("runwayml/stable-diffusion-v1-5"), "/lcm-sd15-i2i");
        assert_eq!(lookup_endpoint("ByteDance/SDXL-Lightning"), "/fast-lightning-sdxl");
    }

    #[test]
    fn test_video_response_wins_over_images() {
        let parsed: FallbackResponse = serde_json::from_value(serde_json::json!({
            "video": { "url": "https://cdn.example.com/v.mp4" },
            "seed": 7
        }))
        .unwrap();
        let outputs = parsed.into_outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].url, "https://cdn.example.com/v.mp4");
        assert_eq!(outputs[0].nsfw, Some(false));
    }
}
