//! S3 object storage client.
//!
//! This crate provides:
//! - Byte and file uploads keyed by bucket + key
//! - Downloads to local scratch files
//! - Remote-URL → bucket transfers for staging provider outputs
//! - Public URL construction for published objects

pub mod client;
pub mod error;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
