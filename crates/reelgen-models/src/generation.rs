//! Generation records: the unit of persisted state.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::input::GenerationInput;

/// Distinguished shared owner id. Records owned by it may be claimed over by
/// anyone (pre-seeded showcase assets).
pub const SHARED_PLACEHOLDER_USER: &str = "static";

/// What kind of generation a record captures.
///
/// `Img2vidPending` is the placeholder state of the asynchronous flow; a
/// record only ever moves pending → `Img2vid`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationAction {
    #[serde(rename = "txt2img")]
    Txt2img,
    #[serde(rename = "img2img")]
    Img2img,
    #[serde(rename = "img2vid")]
    Img2vid,
    #[serde(rename = "img2vid-pending")]
    Img2vidPending,
}

impl GenerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationAction::Txt2img => "txt2img",
            GenerationAction::Img2img => "img2img",
            GenerationAction::Img2vid => "img2vid",
            GenerationAction::Img2vidPending => "img2vid-pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "txt2img" => Some(GenerationAction::Txt2img),
            "img2img" => Some(GenerationAction::Img2img),
            "img2vid" => Some(GenerationAction::Img2vid),
            "img2vid-pending" => Some(GenerationAction::Img2vidPending),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GenerationAction::Img2vidPending)
    }
}

/// Who can see a record in public listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Community,
    Private,
    None,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Community => "community",
            Visibility::Private => "private",
            Visibility::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "community" => Some(Visibility::Community),
            "private" => Some(Visibility::Private),
            "none" => Some(Visibility::None),
            _ => None,
        }
    }
}

/// Seed reported by a provider. Providers disagree on the wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Num(u64),
    Text(String),
}

/// One produced asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutputItem {
    pub url: String,
    pub seed: Seed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
}

/// A persisted generation.
///
/// `(id, timestamp)` is the primary key; the record is only ever rewritten as
/// a whole (pending → terminal) or touched by the claim/publish transitions.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRecord {
    pub id: String,
    /// Creation time, milliseconds since epoch.
    pub timestamp: i64,
    pub action: GenerationAction,
    pub input: GenerationInput,
    pub outputs: Vec<GenerationOutputItem>,
    /// Milliseconds from submission to completion; 0 while pending.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

// The input column carries no inline tag; its shape is discriminated by the
// record's action field, so deserialization reads the action first and routes
// the input through [`GenerationInput::from_json`].
impl<'de> Deserialize<'de> for GenerationRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            timestamp: i64,
            action: GenerationAction,
            input: serde_json::Value,
            #[serde(default)]
            outputs: Vec<GenerationOutputItem>,
            #[serde(default)]
            duration: i64,
            #[serde(default)]
            userid: Option<String>,
            #[serde(default)]
            visibility: Option<Visibility>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let input = GenerationInput::from_json(raw.action, raw.input)
            .map_err(serde::de::Error::custom)?;
        Ok(Self {
            id: raw.id,
            timestamp: raw.timestamp,
            action: raw.action,
            input,
            outputs: raw.outputs,
            duration: raw.duration,
            userid: raw.userid,
            visibility: raw.visibility,
        })
    }
}

impl GenerationRecord {
    /// Pending placeholder written by the async submit path before dispatch.
    pub fn pending(id: String, timestamp: i64, input: GenerationInput) -> Self {
        let userid = input.user_id().map(str::to_string);
        Self {
            id,
            timestamp,
            action: GenerationAction::Img2vidPending,
            input: input.stripped(),
            outputs: Vec::new(),
            duration: 0,
            userid,
            visibility: Some(Visibility::Community),
        }
    }

    /// Terminal record for a completed generation.
    pub fn completed(
        id: String,
        timestamp: i64,
        action: GenerationAction,
        input: GenerationInput,
        outputs: Vec<GenerationOutputItem>,
    ) -> Self {
        let userid = input.user_id().map(str::to_string);
        Self {
            id,
            timestamp,
            action,
            input: input.stripped(),
            outputs,
            duration: Utc::now().timestamp_millis() - timestamp,
            userid,
            visibility: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.action.is_pending()
    }

    /// NSFW flag of the first output, if reported.
    pub fn first_output_nsfw(&self) -> Option<bool> {
        self.outputs.first().and_then(|o| o.nsfw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Img2vidParams, Txt2imgParams};

    fn txt2img_input() -> GenerationInput {
        GenerationInput::Txt2img(Txt2imgParams {
            model_id: "ByteDance/SDXL-Lightning".to_string(),
            prompt: "a baby cat".to_string(),
            negative_prompt: String::new(),
            guidance_scale: 7.0,
            seed: Some(42),
            width: 64,
            height: 64,
            num_images_per_prompt: 1,
            user_id: None,
        })
    }

    #[test]
    fn test_action_roundtrip() {
        for action in [
            GenerationAction::Txt2img,
            GenerationAction::Img2img,
            GenerationAction::Img2vid,
            GenerationAction::Img2vidPending,
        ] {
            assert_eq!(GenerationAction::parse(action.as_str()), Some(action));
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_pending_record_invariants() {
        let input = GenerationInput::Img2vid(Img2vidParams {
            image_url: "https://example.com/i.png".to_string(),
            model_id: "m".to_string(),
            width: 64,
            height: 64,
            seed: None,
            motion_bucket_id: 127,
            noise_aug_strength: 0.05,
            overlay_base64: Some("AAAA".to_string()),
            overlay_text: None,
            image_generation_id: None,
            output_type: None,
            output_width: None,
            user_id: Some("u1".to_string()),
        });
        let rec = GenerationRecord::pending("abc".to_string(), 1_700_000_000_000, input);
        assert!(rec.is_pending());
        assert!(rec.outputs.is_empty());
        assert_eq!(rec.duration, 0);
        assert_eq!(rec.userid.as_deref(), Some("u1"));
        match &rec.input {
            GenerationInput::Img2vid(p) => assert!(p.overlay_base64.is_none()),
            _ => panic!("wrong input variant"),
        }
    }

    #[test]
    fn test_seed_untagged() {
        let n: Seed = serde_json::from_str("12345").unwrap();
        assert_eq!(n, Seed::Num(12345));
        let s: Seed = serde_json::from_str("\"12345\"").unwrap();
        assert_eq!(s, Seed::Text("12345".to_string()));
    }

    #[test]
    fn test_record_json_roundtrip() {
        let rec = GenerationRecord::completed(
            "abc".to_string(),
            1_700_000_000_000,
            GenerationAction::Txt2img,
            txt2img_input(),
            vec![GenerationOutputItem {
                url: "https://example.com/out.png".to_string(),
                seed: Seed::Text("7".to_string()),
                nsfw: Some(false),
            }],
        );
        let json = serde_json::to_value(&rec).unwrap();
        let back: GenerationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.action, GenerationAction::Txt2img);
        assert!(matches!(back.input, GenerationInput::Txt2img(_)));
        assert_eq!(back.outputs[0].seed, Seed::Text("7".to_string()));
    }

    #[test]
    fn test_completed_record_has_no_visibility() {
        let rec = GenerationRecord::completed(
            "abc".to_string(),
            Utc::now().timestamp_millis(),
            GenerationAction::Txt2img,
            txt2img_input(),
            vec![GenerationOutputItem {
                url: "https://example.com/out.png".to_string(),
                seed: Seed::Num(1),
                nsfw: None,
            }],
        );
        assert!(rec.visibility.is_none());
        assert!(!rec.is_pending());
        assert_eq!(rec.outputs.len(), 1);
    }
}
