//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// An upstream generation failure: network, timeout, non-2xx, or a 2xx body
/// with no usable assets. Carries the endpoint path and whatever status/code/
/// body the provider reported.
#[derive(Debug, Clone, Error)]
#[error("Provider request to {path} failed ({}): {message}", self.status())]
pub struct ProviderError {
    pub message: String,
    /// Endpoint path the attempt targeted.
    pub path: String,
    /// HTTP status, when one was received.
    pub status: Option<u16>,
    /// Transport-level error code, when available.
    pub code: Option<String>,
    /// Response body excerpt, when available.
    pub data: Option<String>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            status: None,
            code: None,
            data: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Build from a transport error on the given path.
    pub fn from_reqwest(path: impl Into<String>, err: &reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            Some("timeout".to_string())
        } else if err.is_connect() {
            Some("connect".to_string())
        } else {
            None
        };
        Self {
            message: err.to_string(),
            path: path.into(),
            status: err.status().map(|s| s.as_u16()),
            code,
            data: None,
        }
    }

    /// Status projection used at the request boundary. 500 when the provider
    /// never answered.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_500() {
        let e = ProviderError::new("boom", "/text-to-image");
        assert_eq!(e.status(), 500);
        assert_eq!(e.with_status(502).status(), 502);
    }

    #[test]
    fn test_display_carries_path() {
        let e = ProviderError::new("no assets", "/fast-svd").with_status(200);
        let s = e.to_string();
        assert!(s.contains("/fast-svd"));
        assert!(s.contains("200"));
    }
}
