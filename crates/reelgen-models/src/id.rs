//! Short generation id generation.

use uuid::Uuid;

/// Length of a generation id.
pub const GENERATION_ID_LEN: usize = 10;

/// Generate a short opaque generation id.
///
/// Ids are client-unguessable but not cryptographically secret; they act as
/// share-friendly slugs, not access tokens. Derived from a v4 UUID so no
/// extra RNG dependency is needed.
pub fn generation_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..GENERATION_ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_length() {
        assert_eq!(generation_id().len(), GENERATION_ID_LEN);
    }

    #[test]
    fn test_ids_unique() {
        let a = generation_id();
        let b = generation_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_is_lower_alphanumeric() {
        let id = generation_id();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
