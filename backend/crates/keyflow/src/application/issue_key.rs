//! Issue Key Use Case
//!
//! Mints a random expiring key once every checkpoint of the script has a
//! completion under the caller's session token.

use crate::application::config::KeySystemConfig;
use crate::domain::entities::AccessKey;
use crate::domain::repository::{CheckpointRepository, CompletionRepository, KeyRepository};
use crate::domain::services::generate_key;
use crate::error::{KeyflowError, KeyflowResult};
use chrono::{DateTime, Utc};
use kernel::id::ScriptId;
use std::collections::HashSet;
use std::sync::Arc;

/// Input DTO for issue key
#[derive(Debug, Clone)]
pub struct IssueKeyInput {
    pub script_id: ScriptId,
    pub session_token: String,
    pub hwid: Option<String>,
}

/// Output DTO for issue key
#[derive(Debug, Clone)]
pub struct IssueKeyOutput {
    pub key: String,
    pub expires_at: DateTime<Utc>,
    /// False when the store rejected the insert and the key was returned
    /// anyway (the documented soft-fail path).
    pub persisted: bool,
}

/// Issue Key Use Case
pub struct IssueKeyUseCase<C, L, K>
where
    C: CheckpointRepository,
    L: CompletionRepository,
    K: KeyRepository,
{
    checkpoint_repo: Arc<C>,
    completion_repo: Arc<L>,
    key_repo: Arc<K>,
    config: Arc<KeySystemConfig>,
}

impl<C, L, K> IssueKeyUseCase<C, L, K>
where
    C: CheckpointRepository,
    L: CompletionRepository,
    K: KeyRepository,
{
    pub fn new(
        checkpoint_repo: Arc<C>,
        completion_repo: Arc<L>,
        key_repo: Arc<K>,
        config: Arc<KeySystemConfig>,
    ) -> Self {
        Self {
            checkpoint_repo,
            completion_repo,
            key_repo,
            config,
        }
    }

    pub async fn execute(&self, input: IssueKeyInput) -> KeyflowResult<IssueKeyOutput> {
        // A script with zero checkpoints is not completable
        let checkpoints = self
            .checkpoint_repo
            .checkpoints_for_script(input.script_id)
            .await?;
        if checkpoints.is_empty() {
            return Err(KeyflowError::NoCheckpoints);
        }

        let checkpoint_ids: Vec<_> = checkpoints.iter().map(|c| c.id).collect();
        let completed: HashSet<_> = self
            .completion_repo
            .completed_checkpoints(&checkpoint_ids, &input.session_token)
            .await?
            .into_iter()
            .collect();

        let total = checkpoint_ids.len();
        if !checkpoint_ids.iter().all(|id| completed.contains(id)) {
            tracing::debug!(
                script_id = %input.script_id,
                completed = completed.len(),
                total,
                "Key requested before all checkpoints complete"
            );
            return Err(KeyflowError::IncompleteFlow {
                completed: completed.len(),
                total,
            });
        }

        let key_value = generate_key(
            &self.config.key_prefix,
            self.config.key_segment_count,
            self.config.key_segment_len,
        );
        let key = AccessKey::new(
            input.script_id,
            key_value,
            input.hwid,
            self.config.key_ttl_secs(),
        );

        // Soft-fail: a rejected insert (e.g. a storage-level ownership policy
        // blocking anonymous writes) still returns the generated key; validity
        // is re-checked at validation time against whatever state exists.
        let persisted = match self.key_repo.create_key(&key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    script_id = %input.script_id,
                    error = %e,
                    "Key insert rejected; returning generated key anyway"
                );
                false
            }
        };

        tracing::info!(
            script_id = %input.script_id,
            key_id = %key.id,
            persisted,
            "Key issued"
        );

        Ok(IssueKeyOutput {
            key: key.key_value,
            expires_at: key.expires_at,
            persisted,
        })
    }
}
