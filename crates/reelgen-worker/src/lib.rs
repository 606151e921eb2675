//! Async generation worker.
//!
//! Consumes queued image-to-video jobs, runs the generation and the local
//! ffmpeg post-processing, and overwrites the pending record with the
//! terminal one. Delivery is at most once: every attempt is acknowledged,
//! failed jobs are logged and dropped.

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::ProcessingContext;
