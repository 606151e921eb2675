//! Generation provider gateway.
//!
//! This crate provides:
//! - A primary provider client (JSON text-to-image, multipart image-to-video)
//! - A fallback provider client with model → endpoint mapping and aspect-ratio
//!   size buckets
//! - A gateway that tries the primary inside a configured timeout slice and
//!   hands the remaining budget to the fallback
//! - Per-attempt request/latency/error metrics tagged by endpoint path

pub mod error;
pub mod fallback;
pub mod gateway;
pub mod metrics;
pub mod primary;
pub mod repair;
pub mod webhook;

pub use error::{ProviderError, ProviderResult};
pub use fallback::{FallbackClient, ImageSize};
pub use gateway::{GenerationResult, ProviderConfig, ProviderGateway};
pub use primary::PrimaryClient;
pub use repair::repair_image_url;
pub use webhook::WebhookNotifier;
