//! Verify Callback Use Case
//!
//! Provider callbacks arrive either as GET redirects (completion token in
//! query parameters) or as POST callbacks (fields in the body). Both feed
//! the same policy: checkpoint must exist, its stored provider must match
//! the route, and the redirect channel must carry a non-empty token.
//!
//! The token itself is trusted as-is; no outbound call to the provider's
//! verification API is made.

use crate::domain::entities::Completion;
use crate::domain::repository::{CheckpointRepository, CompletionRepository, ScriptDirectory};
use crate::domain::value_objects::{Provider, RecordOutcome};
use crate::error::{KeyflowError, KeyflowResult};
use kernel::id::{CheckpointId, ScriptId};
use std::sync::Arc;

/// How the callback reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackChannel {
    /// GET redirect from the provider; requires a completion token.
    Redirect,
    /// POST callback from the provider; field presence is sufficient.
    Callback,
}

/// Input DTO for verify callback
#[derive(Debug, Clone)]
pub struct VerifyCallbackInput {
    pub provider: Provider,
    pub channel: CallbackChannel,
    pub checkpoint_id: CheckpointId,
    pub session_token: String,
    pub completion_token: Option<String>,
}

/// Output DTO for verify callback
#[derive(Debug, Clone)]
pub struct VerifyCallbackOutput {
    pub script_id: ScriptId,
    pub outcome: RecordOutcome,
    /// Owner's public username, when the directory resolves one.
    /// Redirect-channel callbacks use it to send the visitor onward.
    pub owner_username: Option<String>,
}

/// Verify Callback Use Case
pub struct VerifyCallbackUseCase<C, L, D>
where
    C: CheckpointRepository,
    L: CompletionRepository,
    D: ScriptDirectory,
{
    checkpoint_repo: Arc<C>,
    completion_repo: Arc<L>,
    directory: Arc<D>,
}

impl<C, L, D> VerifyCallbackUseCase<C, L, D>
where
    C: CheckpointRepository,
    L: CompletionRepository,
    D: ScriptDirectory,
{
    pub fn new(checkpoint_repo: Arc<C>, completion_repo: Arc<L>, directory: Arc<D>) -> Self {
        Self {
            checkpoint_repo,
            completion_repo,
            directory,
        }
    }

    pub async fn execute(&self, input: VerifyCallbackInput) -> KeyflowResult<VerifyCallbackOutput> {
        let checkpoint = self
            .checkpoint_repo
            .find_checkpoint(input.checkpoint_id)
            .await?
            .ok_or(KeyflowError::CheckpointNotFound)?;

        // Provider mismatch is a hard error; nothing is recorded
        if checkpoint.provider != input.provider {
            tracing::warn!(
                checkpoint_id = %input.checkpoint_id,
                stored = %checkpoint.provider,
                route = %input.provider,
                "Callback provider does not match checkpoint"
            );
            return Err(KeyflowError::ProviderMismatch);
        }

        // Channel policy: redirects must carry a non-empty completion token
        if input.channel == CallbackChannel::Redirect
            && !input
                .completion_token
                .as_deref()
                .is_some_and(|t| !t.is_empty())
        {
            return Err(KeyflowError::VerificationFailed);
        }

        // A callback for an already-recorded checkpoint is a no-op, not an error
        let completion = Completion::new(input.checkpoint_id, input.session_token, None);
        let outcome = self.completion_repo.record(&completion).await?;

        tracing::info!(
            checkpoint_id = %input.checkpoint_id,
            provider = %input.provider,
            recorded = matches!(outcome, RecordOutcome::Recorded),
            "Callback verified"
        );

        let owner_username = match self.directory.find_script(checkpoint.script_id).await? {
            Some(script) => self
                .directory
                .find_profile(script.owner_id)
                .await?
                .map(|profile| profile.username),
            None => None,
        };

        Ok(VerifyCallbackOutput {
            script_id: checkpoint.script_id,
            outcome,
            owner_username,
        })
    }
}
