//! Durable generation record store.
//!
//! Records live in a single DynamoDB table keyed by `(id, timestamp)`, with
//! secondary indexes over action, owner, and visibility for timestamp-ordered
//! listings. Pagination is cursor-based and opaque to callers.

pub mod attrs;
pub mod client;
pub mod cursor;
pub mod error;
pub mod metrics;

pub use client::{GenerationsTable, ListQuery, Page, StoreConfig, DEFAULT_PAGE_SIZE};
pub use cursor::Cursor;
pub use error::{StoreError, StoreResult};
