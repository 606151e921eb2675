//! Stage → process → publish → cleanup pipeline for generated video.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use reelgen_models::VideoExtension;
use reelgen_storage::ObjectStore;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::overlay::parse_base64_image;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bucket for staged intermediates.
    pub src_bucket: String,
    /// Bucket published outputs land in.
    pub dst_bucket: String,
    /// Local scratch directory.
    pub scratch_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            src_bucket: "reelgen-media-src".to_string(),
            dst_bucket: "reelgen-media-dst".to_string(),
            scratch_dir: PathBuf::from("/tmp"),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            src_bucket: std::env::var("MEDIA_SRC_BUCKET").unwrap_or(defaults.src_bucket),
            dst_bucket: std::env::var("MEDIA_DST_BUCKET").unwrap_or(defaults.dst_bucket),
            scratch_dir: std::env::var("MEDIA_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        }
    }
}

/// One post-processing request.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Generation id; all staged/scratch/published keys derive from it.
    pub id: String,
    /// Width the source video is scaled to when compositing.
    pub width: u32,
    /// URL of the provider's output video (mp4).
    pub source_url: String,
    /// Desired output container.
    pub target_ext: VideoExtension,
    /// Overlay image (base64, optional data-URI prefix).
    pub overlay_base64: Option<String>,
    /// Width of the final output (gif transcode).
    pub output_width: u32,
}

impl ProcessRequest {
    fn overlay(&self) -> Option<&str> {
        self.overlay_base64.as_deref().filter(|s| !s.is_empty())
    }
}

/// Composite filter: 6 fps, scale to the requested width, overlay at origin.
fn overlay_filter(width: u32) -> String {
    format!("[0:v]fps=6,scale={width}:-1[bg];[bg][1:v]overlay=0:0")
}

/// Two-pass palette gif filter at 6 fps.
fn gif_filter(width: u32) -> String {
    format!("[0:v]scale={width}:-1,split [a][b];[a] palettegen [p];[b][p] paletteuse,fps=6")
}

/// Local scratch files created during one pipeline run.
///
/// Every tracked file is deleted on all exit paths; deletion failures are
/// logged and swallowed.
struct Scratch {
    dir: PathBuf,
    created: Vec<PathBuf>,
}

impl Scratch {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            created: Vec::new(),
        }
    }

    fn track(&mut self, name: &str) -> PathBuf {
        let path = self.dir.join(name);
        self.created.push(path.clone());
        path
    }

    async fn cleanup(self) {
        for path in self.created {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

/// The media post-processing pipeline.
#[derive(Clone)]
pub struct VideoPipeline {
    storage: ObjectStore,
    config: PipelineConfig,
}

impl VideoPipeline {
    pub fn new(storage: ObjectStore, config: PipelineConfig) -> Self {
        Self { storage, config }
    }

    /// Process one generated video and return the URL of the final asset.
    ///
    /// Fast path: nothing to composite and the target container matches the
    /// source ⇒ the source URL is returned unchanged with no I/O at all.
    pub async fn process(&self, request: &ProcessRequest) -> MediaResult<String> {
        if request.overlay().is_none() && request.target_ext == VideoExtension::Mp4 {
            return Ok(request.source_url.clone());
        }

        let overlay_staged = self.stage(request).await?;

        let mut scratch = Scratch::new(self.config.scratch_dir.clone());
        let result = self.run_local(request, overlay_staged, &mut scratch).await;
        scratch.cleanup().await;

        let final_url = result?;
        info!(id = %request.id, url = %final_url, "pipeline published output");
        Ok(final_url)
    }

    /// Stage the source video (and decoded overlay, when present) into the
    /// intermediate bucket. The two transfers run concurrently.
    async fn stage(&self, request: &ProcessRequest) -> MediaResult<bool> {
        let video_key = format!("{}.mp4", request.id);

        match request.overlay() {
            Some(encoded) => {
                let image = parse_base64_image(encoded)?;
                let image_key = format!("{}.png", request.id);
                let content_type = image.content_type();
                tokio::try_join!(
                    self.storage.upload_from_url(
                        &self.config.src_bucket,
                        &video_key,
                        &request.source_url,
                        "video/mp4",
                    ),
                    self.storage.upload_bytes(
                        &self.config.src_bucket,
                        &image_key,
                        image.data,
                        &content_type,
                    ),
                )?;
                Ok(true)
            }
            None => {
                self.storage
                    .upload_from_url(
                        &self.config.src_bucket,
                        &video_key,
                        &request.source_url,
                        "video/mp4",
                    )
                    .await?;
                Ok(false)
            }
        }
    }

    async fn run_local(
        &self,
        request: &ProcessRequest,
        overlay_staged: bool,
        scratch: &mut Scratch,
    ) -> MediaResult<String> {
        let id = &request.id;

        let video_local = scratch.track(&format!("{id}.mp4"));
        self.storage
            .download_to_file(&self.config.src_bucket, &format!("{id}.mp4"), &video_local)
            .await?;

        let mut current = video_local;

        if overlay_staged {
            let image_local = scratch.track(&format!("{id}.png"));
            self.storage
                .download_to_file(&self.config.src_bucket, &format!("{id}.png"), &image_local)
                .await?;

            let composited = scratch.track(&format!("{id}-out.mp4"));
            FfmpegCommand::new(&current, &composited)
                .input(&image_local)
                .filter_complex(overlay_filter(request.width))
                .run()
                .await?;
            current = composited;
        }

        if request.target_ext == VideoExtension::Gif {
            let gif = scratch.track(&format!("{id}-out.gif"));
            FfmpegCommand::new(&current, &gif)
                .filter_complex(gif_filter(request.output_width))
                .run()
                .await?;
            current = gif;
        }

        self.publish(request, &current).await
    }

    async fn publish(&self, request: &ProcessRequest, local: &Path) -> MediaResult<String> {
        let ext = request.target_ext;
        let key = format!("{}.{}", request.id, ext.as_str());
        let url = self
            .storage
            .upload_file(&self.config.dst_bucket, &key, local, ext.content_type())
            .await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_storage::StorageConfig;

    fn request(overlay: Option<String>, ext: VideoExtension) -> ProcessRequest {
        ProcessRequest {
            id: "abc123".to_string(),
            width: 512,
            source_url: "https://cdn.example.com/abc123.mp4".to_string(),
            target_ext: ext,
            overlay_base64: overlay,
            output_width: 512,
        }
    }

    async fn pipeline() -> VideoPipeline {
        let storage = ObjectStore::new(StorageConfig::default()).await;
        VideoPipeline::new(storage, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_noop_fast_path_returns_source_url() {
        let p = pipeline().await;
        let req = request(None, VideoExtension::Mp4);
        let url = p.process(&req).await.unwrap();
        assert_eq!(url, req.source_url);
    }

    #[tokio::test]
    async fn test_empty_overlay_counts_as_absent() {
        let p = pipeline().await;
        let req = request(Some(String::new()), VideoExtension::Mp4);
        let url = p.process(&req).await.unwrap();
        assert_eq!(url, req.source_url);
    }

    #[test]
    fn test_overlay_filter_shape() {
        assert_eq!(
            overlay_filter(512),
            "[0:v]fps=6,scale=512:-1[bg];[bg][1:v]overlay=0:0"
        );
    }

    #[test]
    fn test_gif_filter_shape() {
        let f = gif_filter(320);
        assert!(f.starts_with("[0:v]scale=320:-1"));
        assert!(f.contains("palettegen"));
        assert!(f.contains("paletteuse"));
        assert!(f.ends_with("fps=6"));
    }

    #[tokio::test]
    async fn test_scratch_cleanup_removes_tracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(dir.path().to_path_buf());
        let a = scratch.track("x.mp4");
        let b = scratch.track("x.png");
        tokio::fs::write(&a, b"v").await.unwrap();
        tokio::fs::write(&b, b"i").await.unwrap();
        // A tracked-but-never-created file must not fail cleanup.
        scratch.track("x-out.gif");

        scratch.cleanup().await;
        assert!(!a.exists());
        assert!(!b.exists());
    }
}
