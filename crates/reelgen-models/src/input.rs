//! Request inputs, tagged by generation action.
//!
//! The persisted `input` column is discriminated by the record's `action`
//! field, so the enum serializes without an inline tag and deserialization
//! goes through [`GenerationInput::from_json`] with the action in hand.

use serde::{Deserialize, Serialize};

use crate::generation::GenerationAction;

/// Output container for video generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoExtension {
    #[default]
    Mp4,
    Gif,
}

impl VideoExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoExtension::Mp4 => "mp4",
            VideoExtension::Gif => "gif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            VideoExtension::Mp4 => "video/mp4",
            VideoExtension::Gif => "image/gif",
        }
    }
}

/// Text-to-image request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Txt2imgParams {
    pub model_id: String,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub guidance_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_num_images")]
    pub num_images_per_prompt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn default_num_images() -> u32 {
    1
}

/// Image-to-image request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Img2imgParams {
    pub model_id: String,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub image_url: String,
    pub strength: f64,
    pub guidance_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_num_images")]
    pub num_images_per_prompt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Image-to-video request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Img2vidParams {
    pub image_url: String,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub motion_bucket_id: u32,
    pub noise_aug_strength: f64,
    /// Inline overlay image (base64, optionally with a data-URI prefix).
    /// Stripped before persistence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_text: Option<String>,
    /// Prior image generation this video derives from; its nsfw flag
    /// propagates to the video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_generation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<VideoExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Img2vidParams {
    /// True if post-processing (overlay or gif transcode) is requested.
    pub fn needs_processing(&self) -> bool {
        self.overlay_base64.as_deref().is_some_and(|s| !s.is_empty())
            || self.output_type == Some(VideoExtension::Gif)
    }
}

/// A generation request payload, discriminated by [`GenerationAction`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationInput {
    Txt2img(Txt2imgParams),
    Img2img(Img2imgParams),
    Img2vid(Img2vidParams),
}

impl GenerationInput {
    /// Deserialize the input column for a record with the given action.
    pub fn from_json(
        action: GenerationAction,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        match action {
            GenerationAction::Txt2img => {
                serde_json::from_value(value).map(GenerationInput::Txt2img)
            }
            GenerationAction::Img2img => {
                serde_json::from_value(value).map(GenerationInput::Img2img)
            }
            GenerationAction::Img2vid | GenerationAction::Img2vidPending => {
                serde_json::from_value(value).map(GenerationInput::Img2vid)
            }
        }
    }

    /// Owner reference carried on the request, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            GenerationInput::Txt2img(p) => p.user_id.as_deref(),
            GenerationInput::Img2img(p) => p.user_id.as_deref(),
            GenerationInput::Img2vid(p) => p.user_id.as_deref(),
        }
    }

    /// Copy of the input with any large inline binary payload removed.
    ///
    /// Only this form may be persisted; the overlay image travels to the
    /// worker through the dispatch payload instead.
    pub fn stripped(&self) -> Self {
        match self {
            GenerationInput::Img2vid(p) => {
                let mut p = p.clone();
                p.overlay_base64 = None;
                GenerationInput::Img2vid(p)
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img2vid() -> Img2vidParams {
        Img2vidParams {
            image_url: "https://example.com/img.png".to_string(),
            model_id: "stabilityai/stable-video-diffusion-img2vid-xt".to_string(),
            width: 64,
            height: 64,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: Some("data:image/png;base64,AAAA".to_string()),
            overlay_text: None,
            image_generation_id: None,
            output_type: Some(VideoExtension::Gif),
            output_width: Some(512),
            user_id: Some("user-1".to_string()),
        }
    }

    #[test]
    fn test_stripped_removes_overlay() {
        let input = GenerationInput::Img2vid(img2vid());
        let stripped = input.stripped();
        match stripped {
            GenerationInput::Img2vid(p) => assert!(p.overlay_base64.is_none()),
            _ => panic!("variant changed"),
        }
        // Original untouched.
        match input {
            GenerationInput::Img2vid(p) => assert!(p.overlay_base64.is_some()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_from_json_discriminated_by_action() {
        let value = serde_json::to_value(img2vid()).unwrap();
        let input =
            GenerationInput::from_json(GenerationAction::Img2vidPending, value).unwrap();
        assert!(matches!(input, GenerationInput::Img2vid(_)));
    }

    #[test]
    fn test_needs_processing() {
        let mut p = img2vid();
        assert!(p.needs_processing());
        p.overlay_base64 = None;
        assert!(p.needs_processing()); // gif output still needs transcode
        p.output_type = Some(VideoExtension::Mp4);
        assert!(!p.needs_processing());
        p.overlay_base64 = Some(String::new());
        assert!(!p.needs_processing()); // empty overlay is ignored
    }

    #[test]
    fn test_extension_strings() {
        assert_eq!(VideoExtension::Mp4.as_str(), "mp4");
        assert_eq!(VideoExtension::Gif.content_type(), "image/gif");
    }
}
