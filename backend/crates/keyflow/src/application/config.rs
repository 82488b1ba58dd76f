//! Application Configuration
//!
//! Configuration for the key-system application layer.

use std::time::Duration;

/// Key-system application configuration
#[derive(Debug, Clone)]
pub struct KeySystemConfig {
    /// Literal prefix on every issued key
    pub key_prefix: String,
    /// Number of random segments after the prefix
    pub key_segment_count: usize,
    /// Characters per segment
    pub key_segment_len: usize,
    /// Validity window attached at issuance
    pub key_ttl: Duration,
}

impl Default for KeySystemConfig {
    fn default() -> Self {
        Self {
            key_prefix: "KG".to_string(),
            key_segment_count: 4,
            key_segment_len: 4,
            key_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl KeySystemConfig {
    /// Override the validity window, keeping the key format defaults.
    pub fn with_key_ttl(ttl: Duration) -> Self {
        Self {
            key_ttl: ttl,
            ..Default::default()
        }
    }

    pub fn key_ttl_secs(&self) -> i64 {
        self.key_ttl.as_secs() as i64
    }
}
