//! Primary generation provider client.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use reelgen_models::{GenerationOutputItem, Img2imgParams, Img2vidParams, Txt2imgParams};

use crate::error::{ProviderError, ProviderResult};
use crate::metrics;
use crate::repair::repair_image_url;

const PROVIDER: &str = "primary";

/// The video endpoint only serves stable-video-diffusion regardless of the
/// image model the request was generated with.
const VIDEO_MODEL_ID: &str = "stabilityai/stable-video-diffusion-img2vid-xt";

#[derive(Debug, Deserialize)]
struct PrimaryResponse {
    #[serde(default)]
    images: Vec<GenerationOutputItem>,
}

/// Client for the primary generation provider.
#[derive(Clone)]
pub struct PrimaryClient {
    base_url: String,
    http: Client,
}

impl PrimaryClient {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Text-to-image: JSON POST.
    pub async fn txt2img(
        &self,
        params: &Txt2imgParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let path = "/text-to-image";
        let req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(params)
            .timeout(timeout);
        self.execute(path, req).await
    }

    /// Image-to-image: JSON POST, source image referenced by URL.
    pub async fn img2img(
        &self,
        params: &Img2imgParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let path = "/image-to-image";
        let req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(params)
            .timeout(timeout);
        self.execute(path, req).await
    }

    /// Image-to-video: the source image is fetched into memory and sent as a
    /// multipart form.
    pub async fn img2vid(
        &self,
        params: &Img2vidParams,
        timeout: Duration,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let path = "/image-to-video";
        let image = self.download_image(&params.image_url).await?;

        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(image).file_name("image"),
            )
            .text("model_id", VIDEO_MODEL_ID)
            .text("width", params.width.to_string())
            .text("height", params.height.to_string())
            .text("motion_bucket_id", params.motion_bucket_id.to_string())
            .text("noise_aug_strength", params.noise_aug_strength.to_string());

        let req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .timeout(timeout);
        self.execute(path, req).await
    }

    async fn download_image(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let url = repair_image_url(url);
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, &e))?;
        if !res.status().is_success() {
            return Err(
                ProviderError::new("Image cannot be downloaded", &url)
                    .with_status(res.status().as_u16()),
            );
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, &e))?;
        Ok(bytes.to_vec())
    }

    /// Send one attempt, recording count/latency on every outcome and an
    /// error counter tagged by status on failures.
    async fn execute(
        &self,
        path: &str,
        req: reqwest::RequestBuilder,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        metrics::record_request(PROVIDER, path);
        let started = Instant::now();

        let result = self.attempt(path, req).await;

        metrics::record_duration(PROVIDER, path, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::record_error(PROVIDER, path, e.status());
        }
        result
    }

    async fn attempt(
        &self,
        path: &str,
        req: reqwest::RequestBuilder,
    ) -> ProviderResult<Vec<GenerationOutputItem>> {
        let res = req
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(path, &e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::new("Generation failed", path)
                .with_status(status.as_u16())
                .with_data(truncate(&body)));
        }

        let parsed: PrimaryResponse = res
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(path, &e).with_status(status.as_u16()))?;

        if parsed.images.is_empty() {
            return Err(
                ProviderError::new("No assets", path).with_status(status.as_u16())
            );
        }
        debug!(path, count = parsed.images.len(), "primary generation ok");
        Ok(parsed.images)
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    if body.chars().count() > MAX {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
