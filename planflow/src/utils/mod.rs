//! Utility functions for UUID generation and timestamp handling.

pub mod timestamps;

pub use timestamps::{elapsed_ms, format_iso8601, iso_timestamp, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new UUID v7 (time-ordered).
#[must_use]
pub fn generate_uuid_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_generate_uuid_v7_is_time_ordered() {
        let first = generate_uuid_v7();
        let second = generate_uuid_v7();
        assert_eq!(first.get_version_num(), 7);
        assert!(first <= second);
    }
}
