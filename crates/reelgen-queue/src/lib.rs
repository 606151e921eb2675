//! Dispatch queue for asynchronous video generations.
//!
//! A thin Redis Streams consumer-group queue. Delivery is at-most-once by
//! construction: messages are acknowledged whether processing succeeded or
//! not, and the durable pending record is the source of truth for outcome.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{GenerateVideoJob, QueueJob};
pub use queue::{JobQueue, QueueConfig};
