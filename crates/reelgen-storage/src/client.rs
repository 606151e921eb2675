//! S3 client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the object store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Region for public URL construction.
    pub region: String,
    /// Custom S3 endpoint (local testing); AWS default when absent.
    pub endpoint_url: Option<String>,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

/// S3 object storage client. Credentials come from the default AWS chain.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    http: reqwest::Client,
    config: StorageConfig,
}

impl ObjectStore {
    /// Create a new object store from configuration.
    pub async fn new(config: StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_types::region::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> Self {
        Self::new(StorageConfig::from_env()).await
    }

    /// Upload bytes under `bucket/key`. Returns the object's public URL.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        debug!("Uploading {} bytes to {}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(self.public_url(bucket, key))
    }

    /// Upload a local file under `bucket/key`. Returns the object's public URL.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}/{}", path.display(), bucket, key);
        Ok(self.public_url(bucket, key))
    }

    /// Download `bucket/key` to a local file.
    pub async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading {}/{} to {}", bucket, key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("NoSuchKey") {
                    StorageError::not_found(format!("{bucket}/{key}"))
                } else {
                    StorageError::download_failed(msg)
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;
        tokio::fs::write(path, data.into_bytes()).await?;
        Ok(())
    }

    /// Fetch a remote URL and store it under `bucket/key`.
    ///
    /// The object is buffered in memory; generation outputs are short clips.
    pub async fn upload_from_url(
        &self,
        bucket: &str,
        key: &str,
        url: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        debug!("Staging {} to {}/{}", url, bucket, key);

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::remote_fetch_failed(e.to_string()))?;
        if !res.status().is_success() {
            return Err(StorageError::remote_fetch_failed(format!(
                "{url}: HTTP {}",
                res.status()
            )));
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| StorageError::remote_fetch_failed(e.to_string()))?;

        self.upload_bytes(bucket, key, bytes.to_vec(), content_type)
            .await
    }

    /// Public URL of an object.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        match &self.config.endpoint_url {
            Some(endpoint) => format!("{endpoint}/{bucket}/{key}"),
            None => format!(
                "https://{bucket}.s3.{}.amazonaws.com/{key}",
                self.config.region
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_public_url_shapes() {
        let store = ObjectStore::new(StorageConfig::default()).await;
        assert_eq!(
            store.public_url("media-dst", "abc.gif"),
            "https://media-dst.s3.us-east-1.amazonaws.com/abc.gif"
        );

        let store = ObjectStore::new(StorageConfig {
            region: "us-east-1".to_string(),
            endpoint_url: Some("http://localhost:9000".to_string()),
        })
        .await;
        assert_eq!(
            store.public_url("media-dst", "abc.gif"),
            "http://localhost:9000/media-dst/abc.gif"
        );
    }
}
