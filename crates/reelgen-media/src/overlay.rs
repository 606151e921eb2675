//! Base64 overlay image decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{MediaError, MediaResult};

/// A decoded overlay image.
#[derive(Debug, Clone)]
pub struct ParsedImage {
    pub data: Vec<u8>,
    /// Image subtype from the data-URI prefix ("png" when absent).
    pub image_type: String,
}

impl ParsedImage {
    pub fn content_type(&self) -> String {
        format!("image/{}", self.image_type)
    }
}

/// Decode a base64 image, tolerating a `data:image/...;base64,` prefix.
pub fn parse_base64_image(encoded: &str) -> MediaResult<ParsedImage> {
    let (image_type, payload) = match encoded.split_once(";base64,") {
        Some((header, payload)) => {
            let image_type = header
                .strip_prefix("data:image/")
                .ok_or_else(|| MediaError::invalid_overlay("unsupported data-URI header"))?;
            (image_type.to_string(), payload)
        }
        None => ("png".to_string(), encoded),
    };

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| MediaError::invalid_overlay(e.to_string()))?;
    if data.is_empty() {
        return Err(MediaError::invalid_overlay("empty image payload"));
    }

    Ok(ParsedImage { data, image_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_parse_with_data_uri_prefix() {
        let encoded = format!("data:image/png;base64,{PNG_B64}");
        let img = parse_base64_image(&encoded).unwrap();
        assert_eq!(img.image_type, "png");
        assert_eq!(img.content_type(), "image/png");
        assert!(!img.data.is_empty());
    }

    #[test]
    fn test_parse_bare_base64_defaults_to_png() {
        let img = parse_base64_image(PNG_B64).unwrap();
        assert_eq!(img.image_type, "png");
    }

    #[test]
    fn test_parse_jpeg_prefix() {
        let encoded = format!("data:image/jpeg;base64,{PNG_B64}");
        let img = parse_base64_image(&encoded).unwrap();
        assert_eq!(img.image_type, "jpeg");
    }

    #[test]
    fn test_content_type_usable_after_data_is_consumed() {
        // Staging uploads bind the content type first, then hand the byte
        // buffer to the storage client by value.
        let img = parse_base64_image(PNG_B64).unwrap();
        let content_type = img.content_type();
        let bytes: Vec<u8> = img.data;
        assert_eq!(content_type, "image/png");
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(parse_base64_image("!!not base64!!").is_err());
    }

    #[test]
    fn test_non_image_data_uri_rejected() {
        let encoded = format!("data:text/plain;base64,{PNG_B64}");
        assert!(parse_base64_image(&encoded).is_err());
    }
}
