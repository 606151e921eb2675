//! FFmpeg post-processing pipeline for generated video.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution
//! - Overlay compositing and palette-based gif transcoding
//! - The stage → process → publish → cleanup pipeline over object storage

pub mod command;
pub mod error;
pub mod overlay;
pub mod pipeline;

pub use command::FfmpegCommand;
pub use error::{MediaError, MediaResult};
pub use overlay::{parse_base64_image, ParsedImage};
pub use pipeline::{PipelineConfig, ProcessRequest, VideoPipeline};
