//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Provider error: {0}")]
    Provider(#[from] reelgen_provider::ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] reelgen_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] reelgen_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] reelgen_queue::QueueError),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
