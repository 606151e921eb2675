//! Opaque pagination cursors.
//!
//! A cursor is the base64 form of the last returned item's full index key:
//! table primary key (`id`, `timestamp`) plus the partition value of the
//! index the listing ran against.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{StoreError, StoreResult};

/// Decoded resume position of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Record id.
    pub id: String,
    /// Partition value of the index queried (action, owner, or visibility).
    pub index_key: String,
    /// Record timestamp, milliseconds since epoch.
    pub timestamp: i64,
}

impl Cursor {
    pub fn new(id: impl Into<String>, index_key: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            index_key: index_key.into(),
            timestamp,
        }
    }

    /// Encode into the opaque wire form.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}|{}", self.id, self.index_key, self.timestamp);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Decode the opaque wire form. Any malformed input is rejected.
    pub fn decode(encoded: &str) -> StoreResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| StoreError::invalid_cursor(e.to_string()))?;
        let raw = String::from_utf8(raw)
            .map_err(|_| StoreError::invalid_cursor("cursor is not valid UTF-8"))?;

        // Ids are fixed-charset hex so the first separator is unambiguous;
        // the timestamp sits after the last one.
        let (id, rest) = raw
            .split_once('|')
            .ok_or_else(|| StoreError::invalid_cursor("missing separators"))?;
        let (index_key, ts) = rest
            .rsplit_once('|')
            .ok_or_else(|| StoreError::invalid_cursor("missing timestamp"))?;
        let timestamp: i64 = ts
            .parse()
            .map_err(|_| StoreError::invalid_cursor("timestamp is not an integer"))?;

        if id.is_empty() || index_key.is_empty() {
            return Err(StoreError::invalid_cursor("empty cursor component"));
        }

        Ok(Self {
            id: id.to_string(),
            index_key: index_key.to_string(),
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cursor = Cursor::new("a1b2c3d4e5", "img2vid", 1_700_000_000_123);
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_index_key_may_contain_separator() {
        let cursor = Cursor::new("a1b2c3d4e5", "user|odd", 42);
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded.index_key, "user|odd");
        assert_eq!(decoded.timestamp, 42);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Cursor::decode("!!!").is_err());
        assert!(Cursor::decode("").is_err());
        // valid base64, wrong shape
        let bad = URL_SAFE_NO_PAD.encode("no-separators-here");
        assert!(Cursor::decode(&bad).is_err());
        let bad_ts = URL_SAFE_NO_PAD.encode("id|key|not-a-number");
        assert!(Cursor::decode(&bad_ts).is_err());
    }

    #[test]
    fn test_opaque_form_is_url_safe() {
        let encoded = Cursor::new("a1b2c3d4e5", "community", 1_700_000_000_123).encode();
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
    }
}
