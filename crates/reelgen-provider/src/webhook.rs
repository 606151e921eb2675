//! Completion webhook notifier.
//!
//! Posts a short message for every finished async generation. Delivery is
//! best effort: failures are logged and never surface to the caller.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

/// Webhook notifier. Inactive when no URL is configured.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url,
        }
    }

    /// Create from the `WEBHOOK_URL` environment variable.
    pub fn from_env() -> Self {
        Self::new(std::env::var("WEBHOOK_URL").ok())
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Announce a finished generation. Never fails.
    pub async fn notify_generation(&self, id: &str, action: &str, asset_url: &str) {
        let Some(url) = &self.url else {
            return;
        };

        let body = json!({
            "content": format!("{action} {id} finished: {asset_url}"),
        });

        match self.http.post(url).json(&body).send().await {
            Ok(res) if res.status().is_success() => {
                debug!(id, "webhook delivered");
            }
            Ok(res) => {
                warn!(id, status = %res.status(), "webhook rejected");
            }
            Err(e) => {
                warn!(id, error = %e, "webhook delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_disabled_notifier_is_silent() {
        let notifier = WebhookNotifier::new(None);
        assert!(!notifier.is_enabled());
        // Must not panic or block.
        notifier
            .notify_generation("abc", "img2vid", "https://cdn.example.com/abc.mp4")
            .await;
    }

    #[tokio::test]
    async fn test_notify_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "content": "img2vid abc finished: https://cdn.example.com/abc.mp4"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.uri())));
        notifier
            .notify_generation("abc", "img2vid", "https://cdn.example.com/abc.mp4")
            .await;
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.uri())));
        notifier.notify_generation("abc", "img2vid", "url").await;
    }
}
