//! Shared data models for the reelgen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation records and their lifecycle (pending → terminal)
//! - Request inputs, tagged by generation action
//! - Provider outputs (url/seed/nsfw)
//! - Short opaque generation ids

pub mod generation;
pub mod id;
pub mod input;

pub use generation::{
    GenerationAction, GenerationOutputItem, GenerationRecord, Seed, Visibility,
    SHARED_PLACEHOLDER_USER,
};
pub use id::{generation_id, GENERATION_ID_LEN};
pub use input::{
    GenerationInput, Img2imgParams, Img2vidParams, Txt2imgParams, VideoExtension,
};
