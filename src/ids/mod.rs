//! Semantic ID generation utilities
//!
//! This module provides collision-resistant ID generation using a universal
//! `prefix_hash` paradigm. All IDs follow the pattern: `{prefix}_{hash16}`
//!
//! The hash is derived from "uniqueness components" - a set of values that together
//! define what makes this entity unique.
//!
//! # Example
//! ```ignore
//! // All IDs use the same function
//! let session_id = generate_id("session", &["My Chat", "2024-01-15T10:30:00Z"]);
//! let archive_id = generate_id("archive", &[&storage_key]);
//! let msg_id = generate_id("msg", &[&session_id, &uuid::Uuid::new_v4().to_string()]);
//! ```

use sha2::{Digest, Sha256};

// ============================================================================
// Prefix Constants
// ============================================================================

pub const CATEGORY_PREFIX: &str = "cat";
pub const CATEGORY_KEYWORD_PREFIX: &str = "kw";
pub const EXPENSE_PREFIX: &str = "expense";
pub const PRICING_CONFIG_PREFIX: &str = "pricing";
pub const AI_COST_LOG_PREFIX: &str = "aicost";
pub const INTERACTION_LOG_PREFIX: &str = "interaction";
pub const SHORT_LINK_PREFIX: &str = "shortlink";

// ============================================================================
// Universal ID Generation - ONE FUNCTION FOR EVERYTHING
// ============================================================================

/// Generate a collision-resistant ID from components.
/// Format: `{prefix}_{hash16}`
///
/// This is the ONLY ID generation function. Use it for everything.
/// The hash is deterministic - same components always produce the same ID.
///
/// # Arguments
/// * `prefix` - The entity type prefix (e.g., "session", "archive", "msg")
/// * `components` - Slice of strings that together define uniqueness
///
/// # Examples
/// ```ignore
/// // Session: unique by title + creation time
/// let id = generate_id("session", &[title, &timestamp]);
///
/// // Archive job: unique by storage key
/// let id = generate_id("archive", &[&storage_key]);
///
/// // Message: unique by session + random UUID
/// let id = generate_id("msg", &[&session_id, &uuid::Uuid::new_v4().to_string()]);
///
/// // Checkpoint: unique by source + stream + key
/// let id = generate_id("checkpoint", &[source_id, stream_name, checkpoint_key]);
///
/// // Day: unique by date
/// let id = generate_id("day", &[date]);
/// ```
pub fn generate_id(prefix: &str, components: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for component in components {
        hasher.update(component.as_bytes());
        hasher.update(b"|"); // Separator to avoid collisions like ["ab", "c"] vs ["a", "bc"]
    }
    let hash = hasher.finalize();
    let hash_str = hex::encode(&hash[..8]); // 16 hex chars from 8 bytes
    format!("{}_{}", prefix, hash_str)
}

// ============================================================================
// ID Parsing and Validation
// ============================================================================

/// Extract prefix from a semantic ID
/// Example: `session_a1b2c3d4e5f6g7h8` → `session`
pub fn extract_prefix(id: &str) -> Option<&str> {
    id.split('_').next()
}

/// Extract hash from a semantic ID
/// Example: `session_a1b2c3d4e5f6g7h8` → `a1b2c3d4e5f6g7h8`
pub fn extract_hash(id: &str) -> Option<&str> {
    id.splitn(2, '_').nth(1)
}

/// Validate if an ID matches a specific prefix
pub fn validate_prefix(id: &str, expected_prefix: &str) -> bool {
    extract_prefix(id) == Some(expected_prefix)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_deterministic() {
        // Same components should always produce the same ID
        let id1 = generate_id("archive", &["calendar", "job_123"]);
        let id2 = generate_id("archive", &["calendar", "job_123"]);
        assert_eq!(id1, id2);

        // Different components should produce different IDs
        let id3 = generate_id("archive", &["calendar", "job_456"]);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("checkpoint", &["source_1", "stream_x"]);
        assert!(id.starts_with("checkpoint_"));
        // prefix + underscore + 16 hex chars
        assert_eq!(id.len(), "checkpoint_".len() + 16);
    }

    #[test]
    fn test_generate_id_separator_prevents_collisions() {
        // ["ab", "c"] should differ from ["a", "bc"]
        let id1 = generate_id("test", &["ab", "c"]);
        let id2 = generate_id("test", &["a", "bc"]);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_id_empty_components() {
        // Even with empty components, should produce valid ID
        let id = generate_id("test", &[]);
        assert!(id.starts_with("test_"));
        assert_eq!(id.len(), "test_".len() + 16);
    }

    #[test]
    fn test_extract_prefix() {
        assert_eq!(extract_prefix("session_a1b2c3d4e5f6g7h8"), Some("session"));
        assert_eq!(extract_prefix("day_f9e8d7c6b5a43210"), Some("day"));
        assert_eq!(extract_prefix("nounderscore"), Some("nounderscore"));
    }

    #[test]
    fn test_extract_hash() {
        assert_eq!(extract_hash("session_a1b2c3d4e5f6g7h8"), Some("a1b2c3d4e5f6g7h8"));
        assert_eq!(extract_hash("nounderscore"), None);
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("session_a1b2c3d4e5f6g7h8", "session"));
        assert!(!validate_prefix("session_a1b2c3d4e5f6g7h8", "archive"));
        assert!(validate_prefix("day_f9e8d7c6b5a43210", "day"));
    }
}
