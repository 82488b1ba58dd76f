//! Record Completion Use Case
//!
//! The client-facing completion report: confirms the checkpoint exists,
//! then records the (checkpoint, session) fact idempotently.

use crate::domain::entities::Completion;
use crate::domain::repository::{CheckpointRepository, CompletionRepository};
use crate::domain::value_objects::RecordOutcome;
use crate::error::{KeyflowError, KeyflowResult};
use kernel::id::CheckpointId;
use std::sync::Arc;

/// Input DTO for record completion
#[derive(Debug, Clone)]
pub struct RecordCompletionInput {
    pub checkpoint_id: CheckpointId,
    pub session_token: String,
    pub hwid: Option<String>,
}

/// Record Completion Use Case
pub struct RecordCompletionUseCase<C, L>
where
    C: CheckpointRepository,
    L: CompletionRepository,
{
    checkpoint_repo: Arc<C>,
    completion_repo: Arc<L>,
}

impl<C, L> RecordCompletionUseCase<C, L>
where
    C: CheckpointRepository,
    L: CompletionRepository,
{
    pub fn new(checkpoint_repo: Arc<C>, completion_repo: Arc<L>) -> Self {
        Self {
            checkpoint_repo,
            completion_repo,
        }
    }

    pub async fn execute(&self, input: RecordCompletionInput) -> KeyflowResult<RecordOutcome> {
        // The checkpoint must exist before anything is recorded against it
        self.checkpoint_repo
            .find_checkpoint(input.checkpoint_id)
            .await?
            .ok_or(KeyflowError::CheckpointNotFound)?;

        let completion = Completion::new(input.checkpoint_id, input.session_token, input.hwid);
        let outcome = self.completion_repo.record(&completion).await?;

        match outcome {
            RecordOutcome::Recorded => {
                tracing::info!(
                    checkpoint_id = %input.checkpoint_id,
                    "Checkpoint completion recorded"
                );
            }
            RecordOutcome::AlreadyRecorded => {
                tracing::debug!(
                    checkpoint_id = %input.checkpoint_id,
                    "Checkpoint completion already recorded"
                );
            }
        }

        Ok(outcome)
    }
}
