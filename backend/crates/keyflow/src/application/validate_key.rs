//! Validate Key Use Case

use crate::domain::repository::KeyRepository;
use crate::domain::value_objects::KeyValidation;
use crate::error::KeyflowResult;
use kernel::id::ScriptId;
use std::sync::Arc;

/// Validate Key Use Case
pub struct ValidateKeyUseCase<K>
where
    K: KeyRepository,
{
    key_repo: Arc<K>,
}

impl<K> ValidateKeyUseCase<K>
where
    K: KeyRepository,
{
    pub fn new(key_repo: Arc<K>) -> Self {
        Self { key_repo }
    }

    /// Determine validity of `key` for `script_id`, optionally bound to an
    /// hwid. All outcomes are data; only store failures are errors.
    pub async fn execute(
        &self,
        script_id: ScriptId,
        key: &str,
        hwid: Option<&str>,
    ) -> KeyflowResult<KeyValidation> {
        let Some(stored) = self.key_repo.find_key(script_id, key).await? else {
            tracing::debug!(script_id = %script_id, "Key lookup missed");
            return Ok(KeyValidation::NotFound);
        };

        let validation = stored.validate(hwid);
        tracing::debug!(
            script_id = %script_id,
            key_id = %stored.id,
            valid = validation.is_valid(),
            "Key validated"
        );
        Ok(validation)
    }
}
