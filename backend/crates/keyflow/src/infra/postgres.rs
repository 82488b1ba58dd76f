//! PostgreSQL Repository Implementations

use crate::domain::entities::{AccessKey, Checkpoint, Completion, Profile, Script};
use crate::domain::repository::{
    CheckpointRepository, CompletionRepository, KeyRepository, ScriptDirectory,
};
use crate::domain::value_objects::RecordOutcome;
use crate::error::{KeyflowError, KeyflowResult};
use kernel::id::{CheckpointId, OwnerId, ScriptId};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgKeyflowRepository {
    pool: PgPool,
}

impl PgKeyflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CheckpointRepository for PgKeyflowRepository {
    async fn find_checkpoint(&self, id: CheckpointId) -> KeyflowResult<Option<Checkpoint>> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT
                checkpoint_id,
                script_id,
                order_index,
                provider,
                target_url,
                label,
                created_at
            FROM checkpoints
            WHERE checkpoint_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    async fn checkpoints_for_script(&self, script_id: ScriptId) -> KeyflowResult<Vec<Checkpoint>> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT
                checkpoint_id,
                script_id,
                order_index,
                provider,
                target_url,
                label,
                created_at
            FROM checkpoints
            WHERE script_id = $1
            ORDER BY order_index
            "#,
        )
        .bind(script_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(CheckpointRow::into_checkpoint)
            .collect()
    }
}

impl CompletionRepository for PgKeyflowRepository {
    async fn record(&self, completion: &Completion) -> KeyflowResult<RecordOutcome> {
        // The uniqueness constraint on (checkpoint_id, session_token) makes
        // the insert the arbiter under concurrent attempts; rows_affected
        // tells us which side of the race we were on.
        let inserted = sqlx::query(
            r#"
            INSERT INTO checkpoint_completions (
                completion_id,
                checkpoint_id,
                session_token,
                hwid,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (checkpoint_id, session_token) DO NOTHING
            "#,
        )
        .bind(completion.id.as_uuid())
        .bind(completion.checkpoint_id.as_uuid())
        .bind(&completion.session_token)
        .bind(completion.hwid.as_deref())
        .bind(completion.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(
                completion_id = %completion.id,
                checkpoint_id = %completion.checkpoint_id,
                "Completion recorded"
            );
            Ok(RecordOutcome::Recorded)
        } else {
            Ok(RecordOutcome::AlreadyRecorded)
        }
    }

    async fn completed_checkpoints(
        &self,
        checkpoint_ids: &[CheckpointId],
        session_token: &str,
    ) -> KeyflowResult<Vec<CheckpointId>> {
        let ids: Vec<Uuid> = checkpoint_ids.iter().map(|id| id.into_uuid()).collect();

        let rows = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT checkpoint_id
            FROM checkpoint_completions
            WHERE checkpoint_id = ANY($1) AND session_token = $2
            "#,
        )
        .bind(&ids)
        .bind(session_token)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CheckpointId::from_uuid).collect())
    }
}

impl KeyRepository for PgKeyflowRepository {
    async fn create_key(&self, key: &AccessKey) -> KeyflowResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_keys (
                key_id,
                script_id,
                key_value,
                hwid,
                expires_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(key.script_id.as_uuid())
        .bind(&key.key_value)
        .bind(key.hwid.as_deref())
        .bind(key.expires_at)
        .bind(key.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            key_id = %key.id,
            script_id = %key.script_id,
            expires_at = %key.expires_at,
            "Key persisted"
        );

        Ok(())
    }

    async fn find_key(
        &self,
        script_id: ScriptId,
        key_value: &str,
    ) -> KeyflowResult<Option<AccessKey>> {
        let row = sqlx::query_as::<_, AccessKeyRow>(
            r#"
            SELECT
                key_id,
                script_id,
                key_value,
                hwid,
                expires_at,
                created_at
            FROM access_keys
            WHERE script_id = $1 AND key_value = $2
            "#,
        )
        .bind(script_id.as_uuid())
        .bind(key_value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccessKeyRow::into_access_key))
    }
}

impl ScriptDirectory for PgKeyflowRepository {
    async fn find_script(&self, id: ScriptId) -> KeyflowResult<Option<Script>> {
        let row = sqlx::query_as::<_, ScriptRow>(
            r#"
            SELECT
                script_id,
                owner_id,
                title,
                is_public,
                created_at
            FROM scripts
            WHERE script_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ScriptRow::into_script))
    }

    async fn find_profile(&self, owner_id: OwnerId) -> KeyflowResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT profile_id, username FROM profiles WHERE profile_id = $1",
        )
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProfileRow::into_profile))
    }
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct CheckpointRow {
    checkpoint_id: Uuid,
    script_id: Uuid,
    order_index: i32,
    provider: String,
    target_url: String,
    label: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl CheckpointRow {
    fn into_checkpoint(self) -> KeyflowResult<Checkpoint> {
        let provider = self.provider.parse().map_err(|_| {
            KeyflowError::Internal(format!(
                "checkpoint {} has unrecognized provider {:?}",
                self.checkpoint_id, self.provider
            ))
        })?;
        Ok(Checkpoint {
            id: CheckpointId::from_uuid(self.checkpoint_id),
            script_id: ScriptId::from_uuid(self.script_id),
            order_index: self.order_index,
            provider,
            target_url: self.target_url,
            label: self.label,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccessKeyRow {
    key_id: Uuid,
    script_id: Uuid,
    key_value: String,
    hwid: Option<String>,
    expires_at: chrono::DateTime<chrono::Utc>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl AccessKeyRow {
    fn into_access_key(self) -> AccessKey {
        AccessKey {
            id: kernel::id::AccessKeyId::from_uuid(self.key_id),
            script_id: ScriptId::from_uuid(self.script_id),
            key_value: self.key_value,
            hwid: self.hwid,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScriptRow {
    script_id: Uuid,
    owner_id: Uuid,
    title: String,
    is_public: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ScriptRow {
    fn into_script(self) -> Script {
        Script {
            id: ScriptId::from_uuid(self.script_id),
            owner_id: OwnerId::from_uuid(self.owner_id),
            title: self.title,
            is_public: self.is_public,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    profile_id: Uuid,
    username: String,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            id: OwnerId::from_uuid(self.profile_id),
            username: self.username,
        }
    }
}
