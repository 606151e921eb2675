//! Provider gateway: primary attempt with fallback under a shared budget.

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::warn;

use reelgen_models::{GenerationOutputItem, Img2imgParams, Img2vidParams, Txt2imgParams};

use crate::error::{ProviderError, ProviderResult};
use crate::fallback::FallbackClient;
use crate::primary::PrimaryClient;

/// Provider gateway configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Primary provider base URL.
    pub primary_base_url: String,
    /// Fallback provider base URL; no fallback when absent.
    pub fallback_base_url: Option<String>,
    /// Fallback provider API key.
    pub fallback_api_key: Option<String>,
    /// Total budget for a text-to-image call.
    pub txt2img_budget_ms: u64,
    /// Slice of the text-to-image budget the primary may consume.
    pub txt2img_primary_slice_ms: u64,
    /// Total budget for an image-to-video call.
    pub img2vid_budget_ms: u64,
    /// Slice of the image-to-video budget the primary may consume.
    pub img2vid_primary_slice_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary_base_url: "http://localhost:8935".to_string(),
            fallback_base_url: None,
            fallback_api_key: None,
            txt2img_budget_ms: 30_000,
            txt2img_primary_slice_ms: 25_000,
            img2vid_budget_ms: 600_000,
            img2vid_primary_slice_ms: 540_000,
        }
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let primary_base_url = std::env::var("PROVIDER_PRIMARY_URL").map_err(|_| {
            ProviderError::new("PROVIDER_PRIMARY_URL not set", "config")
        })?;
        let defaults = Self::default();
        Ok(Self {
            primary_base_url,
            fallback_base_url: std::env::var("PROVIDER_FALLBACK_URL").ok(),
            fallback_api_key: std::env::var("PROVIDER_FALLBACK_API_KEY").ok(),
            txt2img_budget_ms: env_ms("TXT2IMG_BUDGET_MS", defaults.txt2img_budget_ms),
            txt2img_primary_slice_ms: env_ms(
                "TXT2IMG_PRIMARY_SLICE_MS",
                defaults.txt2img_primary_slice_ms,
            ),
            img2vid_budget_ms: env_ms("IMG2VID_BUDGET_MS", defaults.img2vid_budget_ms),
            img2vid_primary_slice_ms: env_ms(
                "IMG2VID_PRIMARY_SLICE_MS",
                defaults.img2vid_primary_slice_ms,
            ),
        })
    }
}

fn env_ms(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Normalized result of a generation call.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub id: String,
    pub timestamp: i64,
    pub status: &'static str,
    pub outputs: Vec<GenerationOutputItem>,
}

impl GenerationResult {
    fn success(id: String, timestamp: i64, outputs: Vec<GenerationOutputItem>) -> Self {
        Self {
            id,
            timestamp,
            status: "success",
            outputs,
        }
    }
}

/// Gateway over the primary and (optional) fallback providers.
#[derive(Clone)]
pub struct ProviderGateway {
    primary: PrimaryClient,
    fallback: Option<FallbackClient>,
    config: ProviderConfig,
}

impl ProviderGateway {
    pub fn new(config: ProviderConfig) -> Self {
        let http = Client::new();
        let primary = PrimaryClient::new(&config.primary_base_url, http.clone());
        let fallback = match (&config.fallback_base_url, &config.fallback_api_key) {
            (Some(url), Some(key)) => Some(FallbackClient::new(url, key, http)),
            _ => None,
        };
        Self {
            primary,
            fallback,
            config,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Text-to-image with fallback under `budget_ms`.
    pub async fn txt2img(
        &self,
        id: &str,
        timestamp: i64,
        params: &Txt2imgParams,
        budget_ms: u64,
    ) -> ProviderResult<GenerationResult> {
        let slice = self.config.txt2img_primary_slice_ms;
        let outputs = self
            .with_fallback(budget_ms, slice, |t| self.primary.txt2img(params, t), |t| {
                self.fallback.as_ref().map(|fb| fb.txt2img(params, t))
            })
            .await?;
        Ok(GenerationResult::success(id.to_string(), timestamp, outputs))
    }

    /// Image-to-image with fallback under `budget_ms`. Shares the
    /// image-class budget split with text-to-image.
    pub async fn img2img(
        &self,
        id: &str,
        timestamp: i64,
        params: &Img2imgParams,
        budget_ms: u64,
    ) -> ProviderResult<GenerationResult> {
        let slice = self.config.txt2img_primary_slice_ms;
        let outputs = self
            .with_fallback(budget_ms, slice, |t| self.primary.img2img(params, t), |t| {
                self.fallback.as_ref().map(|fb| fb.img2img(params, t))
            })
            .await?;
        Ok(GenerationResult::success(id.to_string(), timestamp, outputs))
    }

    /// Image-to-video with fallback under `budget_ms`.
    pub async fn img2vid(
        &self,
        id: &str,
        timestamp: i64,
        params: &Img2vidParams,
        budget_ms: u64,
    ) -> ProviderResult<GenerationResult> {
        let slice = self.config.img2vid_primary_slice_ms;
        let outputs = self
            .with_fallback(budget_ms, slice, |t| self.primary.img2vid(params, t), |t| {
                self.fallback.as_ref().map(|fb| fb.img2vid(params, t))
            })
            .await?;
        Ok(GenerationResult::success(id.to_string(), timestamp, outputs))
    }

    /// Run the primary inside its slice of the budget; on failure hand the
    /// unconsumed remainder to the fallback. Without a configured fallback
    /// the primary error propagates untouched.
    async fn with_fallback<'a, P, F, PFut, FFut>(
        &'a self,
        budget_ms: u64,
        primary_slice_ms: u64,
        primary: P,
        fallback: F,
    ) -> ProviderResult<Vec<GenerationOutputItem>>
    where
        P: FnOnce(Duration) -> PFut,
        F: FnOnce(Duration) -> Option<FFut>,
        PFut: std::future::Future<Output = ProviderResult<Vec<GenerationOutputItem>>> + 'a,
        FFut: std::future::Future<Output = ProviderResult<Vec<GenerationOutputItem>>> + 'a,
    {
        let primary_timeout = Duration::from_millis(primary_slice_ms.min(budget_ms));
        let started = Instant::now();

        let primary_err = match primary(primary_timeout).await {
            Ok(outputs) => return Ok(outputs),
            Err(e) => e,
        };

        let consumed = started.elapsed().as_millis() as u64;
        let remaining = budget_ms.saturating_sub(consumed);
        if remaining == 0 {
            return Err(primary_err);
        }

        match fallback(Duration::from_millis(remaining)) {
            Some(fut) => {
                warn!(
                    error = %primary_err,
                    remaining_ms = remaining,
                    "primary provider failed, invoking fallback"
                );
                fut.await
            }
            None => Err(primary_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::GenerationInput;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn txt2img_params(n: u32) -> Txt2imgParams {
        Txt2imgParams {
            model_id: "ByteDance/SDXL-Lightning".to_string(),
            prompt: "a baby cat".to_string(),
            negative_prompt: String::new(),
            guidance_scale: 7.0,
            seed: Some(1),
            width: 64,
            height: 64,
            num_images_per_prompt: n,
            user_id: None,
        }
    }

    fn img2vid_params(image_url: String) -> Img2vidParams {
        match GenerationInput::Img2vid(Img2vidParams {
            image_url,
            model_id: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            width: 64,
            height: 64,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: None,
            overlay_text: None,
            image_generation_id: None,
            output_type: None,
            output_width: None,
            user_id: None,
        }) {
            GenerationInput::Img2vid(p) => p,
            _ => unreachable!(),
        }
    }

    fn gateway(primary_url: String, fallback_url: Option<String>) -> ProviderGateway {
        ProviderGateway::new(ProviderConfig {
            primary_base_url: primary_url,
            fallback_api_key: fallback_url.as_ref().map(|_| "test-key".to_string()),
            fallback_base_url: fallback_url,
            ..ProviderConfig::default()
        })
    }

    fn primary_body() -> serde_json::Value {
        json!({ "images": [{ "url": "https://cdn.example.com/a.png", "seed": 7 }] })
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(primary_body()))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/fast-lightning-sdxl"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&fallback)
            .await;

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let result = gw
            .txt2img("id1", 1, &txt2img_params(1), 30_000)
            .await
            .unwrap();
        assert_eq!(result.status, "success");
        assert_eq!(result.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_invokes_fallback_once() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/fast-lightning-sdxl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://cdn.example.com/b.png" }],
                "seed": 3
            })))
            .expect(1)
            .mount(&fallback)
            .await;

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let result = gw
            .txt2img("id1", 1, &txt2img_params(1), 30_000)
            .await
            .unwrap();
        assert_eq!(result.outputs[0].url, "https://cdn.example.com/b.png");
    }

    #[tokio::test]
    async fn test_empty_primary_response_triggers_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/fast-lightning-sdxl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://cdn.example.com/c.png" }],
                "seed": 3
            })))
            .expect(1)
            .mount(&fallback)
            .await;

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let result = gw
            .txt2img("id1", 1, &txt2img_params(1), 30_000)
            .await
            .unwrap();
        assert_eq!(result.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_propagates_primary_error() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&primary)
            .await;

        let gw = gateway(primary.uri(), None);
        let err = gw
            .txt2img("id1", 1, &txt2img_params(1), 30_000)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 503);
        assert_eq!(err.path, "/text-to-image");
    }

    #[tokio::test]
    async fn test_both_providers_failing_reports_fallback_error() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/fast-lightning-sdxl"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&fallback)
            .await;

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let err = gw
            .txt2img("id1", 1, &txt2img_params(1), 30_000)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 429);
    }

    #[tokio::test]
    async fn test_multi_image_fallback_fans_out() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/text-to-image"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/fast-lightning-sdxl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://cdn.example.com/one.png" }],
                "seed": 3
            })))
            .expect(3)
            .mount(&fallback)
            .await;

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let result = gw
            .txt2img("id1", 1, &txt2img_params(3), 30_000)
            .await
            .unwrap();
        assert_eq!(result.outputs.len(), 3);
    }

    #[tokio::test]
    async fn test_img2img_fallback_routes_by_model() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/image-to-image"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/lcm-sd15-i2i"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://cdn.example.com/i2i.png" }],
                "seed": 5
            })))
            .expect(1)
            .mount(&fallback)
            .await;

        let params = Img2imgParams {
            model_id: "runwayml/stable-diffusion-v1-5".to_string(),
            prompt: "a baby cat".to_string(),
            negative_prompt: String::new(),
            image_url: "https://cdn.example.com/src.png".to_string(),
            strength: 0.6,
            guidance_scale: 7.0,
            seed: None,
            num_images_per_prompt: 1,
            user_id: None,
        };

        let gw = gateway(primary.uri(), Some(fallback.uri()));
        let result = gw.img2img("id1", 1, &params, 30_000).await.unwrap();
        assert_eq!(result.outputs[0].url, "https://cdn.example.com/i2i.png");
    }

    #[tokio::test]
    async fn test_img2vid_downloads_image_and_posts_multipart() {
        let primary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/src.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/image-to-video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://cdn.example.com/v.mp4", "seed": "9" }]
            })))
            .expect(1)
            .mount(&primary)
            .await;

        let gw = gateway(primary.uri(), None);
        let params = img2vid_params(format!("{}/src.png", primary.uri()));
        let result = gw.img2vid("id1", 1, &params, 600_000).await.unwrap();
        assert_eq!(result.outputs[0].url, "https://cdn.example.com/v.mp4");
    }
}
