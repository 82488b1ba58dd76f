//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use crate::domain::entities::{AccessKey, Checkpoint, Completion, Profile, Script};
use crate::domain::value_objects::RecordOutcome;
use crate::error::KeyflowResult;
use kernel::id::{CheckpointId, OwnerId, ScriptId};

/// Checkpoint repository trait
#[trait_variant::make(CheckpointRepository: Send)]
pub trait LocalCheckpointRepository {
    /// Look up a single checkpoint
    async fn find_checkpoint(&self, id: CheckpointId) -> KeyflowResult<Option<Checkpoint>>;

    /// All checkpoints under a script, ordered by order_index
    async fn checkpoints_for_script(&self, script_id: ScriptId) -> KeyflowResult<Vec<Checkpoint>>;
}

/// Completion ledger trait
#[trait_variant::make(CompletionRepository: Send)]
pub trait LocalCompletionRepository {
    /// Record a completion idempotently.
    ///
    /// A row for the same (checkpoint, session) pair must resolve to
    /// `AlreadyRecorded` with no side effects, including under concurrent
    /// attempts (the store's uniqueness constraint is the arbiter).
    async fn record(&self, completion: &Completion) -> KeyflowResult<RecordOutcome>;

    /// Which of the given checkpoints the session has completed
    async fn completed_checkpoints(
        &self,
        checkpoint_ids: &[CheckpointId],
        session_token: &str,
    ) -> KeyflowResult<Vec<CheckpointId>>;
}

/// Issued-key repository trait
#[trait_variant::make(KeyRepository: Send)]
pub trait LocalKeyRepository {
    /// Persist an issued key
    async fn create_key(&self, key: &AccessKey) -> KeyflowResult<()>;

    /// Exact-match lookup by script and key value
    async fn find_key(
        &self,
        script_id: ScriptId,
        key_value: &str,
    ) -> KeyflowResult<Option<AccessKey>>;
}

/// Read-only script/profile directory trait
#[trait_variant::make(ScriptDirectory: Send)]
pub trait LocalScriptDirectory {
    /// Look up a script
    async fn find_script(&self, id: ScriptId) -> KeyflowResult<Option<Script>>;

    /// Look up an owner's public profile
    async fn find_profile(&self, owner_id: OwnerId) -> KeyflowResult<Option<Profile>>;
}
