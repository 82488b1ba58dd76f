//! Domain Entities
//!
//! Core business entities for the key-system domain.

use crate::domain::value_objects::{KeyValidation, Provider};
use chrono::{DateTime, Duration, Utc};
use kernel::id::{AccessKeyId, CheckpointId, CompletionId, OwnerId, ScriptId};

/// Script entity - an owner's configured key flow.
#[derive(Debug, Clone)]
pub struct Script {
    pub id: ScriptId,
    pub owner_id: OwnerId,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Checkpoint entity - one monetized step in a script's key flow.
///
/// `order_index` is positive and unique within a script; it defines
/// presentation order only and never gates completion of other checkpoints.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub script_id: ScriptId,
    pub order_index: i32,
    pub provider: Provider,
    pub target_url: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Completion entity - the fact "session S completed checkpoint C at time T".
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: CompletionId,
    pub checkpoint_id: CheckpointId,
    pub session_token: String,
    pub hwid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Completion {
    pub fn new(checkpoint_id: CheckpointId, session_token: String, hwid: Option<String>) -> Self {
        Self {
            id: CompletionId::new(),
            checkpoint_id,
            session_token,
            hwid,
            created_at: Utc::now(),
        }
    }
}

/// AccessKey entity - an issued, expiring credential.
///
/// Never mutated after issuance; becomes semantically dead (but is not
/// deleted) once its expiry passes.
#[derive(Debug, Clone)]
pub struct AccessKey {
    pub id: AccessKeyId,
    pub script_id: ScriptId,
    pub key_value: String,
    pub hwid: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccessKey {
    /// Create a new key valid for `ttl_secs` seconds from now.
    pub fn new(
        script_id: ScriptId,
        key_value: String,
        hwid: Option<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccessKeyId::new(),
            script_id,
            key_value,
            hwid,
            expires_at: now + Duration::seconds(ttl_secs),
            created_at: now,
        }
    }

    /// Check if the key has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Validate this key against an optionally supplied hardware id.
    ///
    /// Hwid binding is only enforced when both the stored and the supplied
    /// hwid are present; a key issued without one validates from any device.
    pub fn validate(&self, hwid: Option<&str>) -> KeyValidation {
        if self.is_expired() {
            return KeyValidation::Expired;
        }
        if let (Some(supplied), Some(stored)) = (hwid, self.hwid.as_deref()) {
            if supplied != stored {
                return KeyValidation::HwidMismatch;
            }
        }
        KeyValidation::Valid {
            expires_at: self.expires_at,
        }
    }
}

/// Profile entity - a script owner's public directory entry.
///
/// Read-only here; used to build the post-callback redirect target.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: OwnerId,
    pub username: String,
}
