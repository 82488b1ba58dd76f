//! Domain Value Objects
//!
//! Immutable value types for the key-system domain.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Monetization provider behind a checkpoint link.
///
/// The set is closed: callbacks naming any other provider are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Lootlabs,
    Linkvertise,
    Workink,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Lootlabs, Provider::Linkvertise, Provider::Workink];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Lootlabs => "lootlabs",
            Provider::Linkvertise => "linkvertise",
            Provider::Workink => "workink",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for unrecognized provider names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProviderError(pub String);

impl fmt::Display for UnknownProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProviderError {}

impl FromStr for Provider {
    type Err = UnknownProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lootlabs" => Ok(Provider::Lootlabs),
            "linkvertise" => Ok(Provider::Linkvertise),
            "workink" => Ok(Provider::Workink),
            other => Err(UnknownProviderError(other.to_string())),
        }
    }
}

/// Outcome of recording a completion. Re-recording is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new completion row was persisted.
    Recorded,
    /// The (checkpoint, session) pair was already recorded; no side effects.
    AlreadyRecorded,
}

/// Outcome of validating an issued key.
///
/// These are response data, not errors: the validation endpoint reports
/// them with HTTP 200 and `valid: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyValidation {
    Valid { expires_at: DateTime<Utc> },
    NotFound,
    Expired,
    HwidMismatch,
}

impl KeyValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeyValidation::Valid { .. })
    }
}
