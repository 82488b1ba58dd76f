//! Common ID Types
//!
//! Type-safe ID wrappers for domain entities.

use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Generic typed ID wrapper
///
/// Usage:
/// ```
/// use kernel::id::{Id, markers};
/// type ScriptId = Id<markers::Script>;
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: Uuid,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random ID (UUID v4)
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4(),
            _marker: PhantomData,
        }
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            value: uuid,
            _marker: PhantomData,
        }
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    /// Convert to UUID
    pub fn into_uuid(self) -> Uuid {
        self.value
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

/// Marker types for different entity IDs
pub mod markers {
    /// Marker for Script IDs
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Script;

    /// Marker for Checkpoint IDs
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Checkpoint;

    /// Marker for Completion IDs
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Completion;

    /// Marker for issued key IDs
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessKey;

    /// Marker for script-owner (profile) IDs
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Owner;
}

/// Type aliases for common IDs
pub type ScriptId = Id<markers::Script>;
pub type CheckpointId = Id<markers::Checkpoint>;
pub type CompletionId = Id<markers::Completion>;
pub type AccessKeyId = Id<markers::AccessKey>;
pub type OwnerId = Id<markers::Owner>;
