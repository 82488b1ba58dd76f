//! Unit tests for the key-flow crate

#[cfg(test)]
mod keygen_tests {
    use crate::domain::services::*;

    #[test]
    fn test_generated_key_format() {
        let key = generate_key("KG", 4, 4);

        assert_eq!(key.len(), 2 + 4 * 5);
        assert!(key.starts_with("KG-"));
        assert!(is_well_formed_key(&key, "KG", 4, 4));

        let groups: Vec<&str> = key.split('-').collect();
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0], "KG");
        for group in &groups[1..] {
            assert_eq!(group.len(), 4);
            assert!(group.bytes().all(|b| KEY_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_keys_are_independent() {
        let a = generate_key("KG", 4, 4);
        let b = generate_key("KG", 4, 4);
        // 36^16 possibilities; a collision here means the RNG is broken
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_key_custom_shape() {
        let key = generate_key("DEMO", 2, 6);
        assert!(key.starts_with("DEMO-"));
        assert!(is_well_formed_key(&key, "DEMO", 2, 6));
        assert!(!is_well_formed_key(&key, "KG", 2, 6));
    }

    #[test]
    fn test_is_well_formed_key_rejects_bad_shapes() {
        assert!(!is_well_formed_key("KG-abcd-ABCD-ABCD-ABCD", "KG", 4, 4));
        assert!(!is_well_formed_key("KG-ABCD-ABCD-ABCD", "KG", 4, 4));
        assert!(!is_well_formed_key("XX-ABCD-ABCD-ABCD-ABCD", "KG", 4, 4));
        assert!(!is_well_formed_key("KG-ABCDE-ABCD-ABCD-ABCD", "KG", 4, 4));
        assert!(!is_well_formed_key("KG-AB!D-ABCD-ABCD-ABCD", "KG", 4, 4));
        assert!(is_well_formed_key("KG-ABCD-1234-WXYZ-0009", "KG", 4, 4));
    }

    #[test]
    fn test_alphabet_is_uppercase_alphanumeric() {
        assert_eq!(KEY_ALPHABET.len(), 36);
        assert!(
            KEY_ALPHABET
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        );
    }
}

#[cfg(test)]
mod config_tests {
    use crate::application::config::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = KeySystemConfig::default();

        assert_eq!(config.key_prefix, "KG");
        assert_eq!(config.key_segment_count, 4);
        assert_eq!(config.key_segment_len, 4);
        assert_eq!(config.key_ttl, Duration::from_secs(86_400));
        assert_eq!(config.key_ttl_secs(), 86_400);
    }

    #[test]
    fn test_with_key_ttl() {
        let config = KeySystemConfig::with_key_ttl(Duration::from_secs(3600));

        assert_eq!(config.key_ttl_secs(), 3600);
        assert_eq!(config.key_prefix, "KG");
    }
}

#[cfg(test)]
mod dto_tests {
    use crate::presentation::dto::*;
    use chrono::Utc;

    #[test]
    fn test_validate_response_valid_shape() {
        let response = ValidateKeyResponse::valid(Utc::now());
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""valid":true"#));
        assert!(json.contains("expires_at"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_validate_response_invalid_shape() {
        let response = ValidateKeyResponse::invalid("Key expired");
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""valid":false"#));
        assert!(json.contains(r#""error":"Key expired""#));
        assert!(!json.contains("expires_at"));
    }

    #[test]
    fn test_callback_response_omits_empty_message() {
        let response = CallbackResponse {
            success: true,
            message: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let response = CallbackResponse {
            success: true,
            message: Some("Checkpoint verified"),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Checkpoint verified"));
    }

    #[test]
    fn test_issue_key_request_deserialization() {
        let json = r#"{"script_id":"00000000-0000-0000-0000-000000000000","session_token":"s1"}"#;
        let request: IssueKeyRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.script_id, Some(uuid::Uuid::nil()));
        assert_eq!(request.session_token.as_deref(), Some("s1"));
        assert!(request.hwid.is_none());
    }

    #[test]
    fn test_issue_key_request_missing_fields() {
        let request: IssueKeyRequest = serde_json::from_str(r#"{"session_token":"s1"}"#).unwrap();
        assert!(request.script_id.is_none());
    }

    #[test]
    fn test_complete_request_with_hwid() {
        let json = r#"{"checkpoint_id":"00000000-0000-0000-0000-000000000000","session_token":"s1","hwid":"hw-1"}"#;
        let request: CompleteRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.hwid.as_deref(), Some("hw-1"));
    }

    #[test]
    fn test_issue_key_response_expiry_is_iso8601() {
        let response = IssueKeyResponse {
            key: "KG-AAAA-BBBB-CCCC-DDDD".to_string(),
            expires_at: "2026-08-25T00:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("2026-08-25T00:00:00Z"));
    }
}

#[cfg(test)]
mod domain_tests {
    use crate::domain::entities::*;
    use crate::domain::value_objects::*;
    use kernel::id::{CheckpointId, ScriptId};

    #[test]
    fn test_access_key_expiry_window() {
        let key = AccessKey::new(ScriptId::new(), "KG-TEST".to_string(), None, 86_400);

        let window = (key.expires_at - key.created_at).num_seconds();
        assert_eq!(window, 86_400);
        assert!(!key.is_expired());
    }

    #[test]
    fn test_access_key_expired() {
        let key = AccessKey::new(ScriptId::new(), "KG-TEST".to_string(), None, -1);

        assert!(key.is_expired());
        assert_eq!(key.validate(None), KeyValidation::Expired);
        // Expiry wins regardless of hwid
        assert_eq!(key.validate(Some("hw-1")), KeyValidation::Expired);
    }

    #[test]
    fn test_access_key_hwid_matrix() {
        let bound = AccessKey::new(
            ScriptId::new(),
            "KG-TEST".to_string(),
            Some("hw-1".to_string()),
            3600,
        );
        assert!(bound.validate(Some("hw-1")).is_valid());
        assert_eq!(bound.validate(Some("hw-2")), KeyValidation::HwidMismatch);
        // No supplied hwid: binding is not enforced
        assert!(bound.validate(None).is_valid());

        let unbound = AccessKey::new(ScriptId::new(), "KG-TEST".to_string(), None, 3600);
        assert!(unbound.validate(None).is_valid());
        assert!(unbound.validate(Some("anything")).is_valid());
    }

    #[test]
    fn test_valid_reports_stored_expiry() {
        let key = AccessKey::new(ScriptId::new(), "KG-TEST".to_string(), None, 3600);
        match key.validate(None) {
            KeyValidation::Valid { expires_at } => assert_eq!(expires_at, key.expires_at),
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn test_completion_creation() {
        let checkpoint_id = CheckpointId::new();
        let completion = Completion::new(checkpoint_id, "s1".to_string(), None);

        assert_eq!(completion.checkpoint_id, checkpoint_id);
        assert_eq!(completion.session_token, "s1");
        assert!(completion.hwid.is_none());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("lootlabs".parse::<Provider>(), Ok(Provider::Lootlabs));
        assert_eq!("linkvertise".parse::<Provider>(), Ok(Provider::Linkvertise));
        assert_eq!("workink".parse::<Provider>(), Ok(Provider::Workink));
        assert!("adfly".parse::<Provider>().is_err());
        assert!("Lootlabs".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_roundtrip() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>(), Ok(provider));
        }
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use kernel::error::app_error::AppError;
    use kernel::error::kind::ErrorKind;

    #[test]
    fn test_error_into_response_status_codes() {
        let test_cases: Vec<(KeyflowError, StatusCode)> = vec![
            (
                KeyflowError::MissingField("script_id or session_token"),
                StatusCode::BAD_REQUEST,
            ),
            (KeyflowError::CheckpointNotFound, StatusCode::NOT_FOUND),
            (
                KeyflowError::UnknownProvider("adfly".into()),
                StatusCode::BAD_REQUEST,
            ),
            (KeyflowError::ProviderMismatch, StatusCode::BAD_REQUEST),
            (KeyflowError::VerificationFailed, StatusCode::FORBIDDEN),
            (KeyflowError::InvalidCallback, StatusCode::BAD_REQUEST),
            (KeyflowError::NoCheckpoints, StatusCode::BAD_REQUEST),
            (
                KeyflowError::IncompleteFlow {
                    completed: 1,
                    total: 2,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                KeyflowError::Internal("test".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            let response = error.into_response();
            assert_eq!(
                response.status(),
                expected_status,
                "Error should return correct status code"
            );
        }
    }

    #[test]
    fn test_error_to_app_error_kind() {
        let app_err: AppError = KeyflowError::CheckpointNotFound.into();
        assert_eq!(app_err.kind(), ErrorKind::NotFound);

        let app_err: AppError = KeyflowError::IncompleteFlow {
            completed: 0,
            total: 3,
        }
        .into();
        assert_eq!(app_err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            KeyflowError::MissingField("script_id or session_token").to_string(),
            "Missing script_id or session_token"
        );
        assert_eq!(
            KeyflowError::NoCheckpoints.to_string(),
            "No checkpoints configured for this script"
        );
        assert_eq!(
            KeyflowError::IncompleteFlow {
                completed: 1,
                total: 2
            }
            .to_string(),
            "Not all checkpoints completed"
        );
    }
}

#[cfg(test)]
mod flow_tests {
    use crate::application::config::KeySystemConfig;
    use crate::application::issue_key::{IssueKeyInput, IssueKeyUseCase};
    use crate::application::record_completion::{RecordCompletionInput, RecordCompletionUseCase};
    use crate::application::validate_key::ValidateKeyUseCase;
    use crate::application::verify_callback::{
        CallbackChannel, VerifyCallbackInput, VerifyCallbackUseCase,
    };
    use crate::domain::entities::{AccessKey, Checkpoint, Completion, Profile, Script};
    use crate::domain::repository::{
        CheckpointRepository, CompletionRepository, KeyRepository, ScriptDirectory,
    };
    use crate::domain::services::is_well_formed_key;
    use crate::domain::value_objects::{KeyValidation, Provider, RecordOutcome};
    use crate::error::{KeyflowError, KeyflowResult};
    use chrono::Utc;
    use kernel::id::{CheckpointId, OwnerId, ScriptId};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemStoreInner {
        scripts: Vec<Script>,
        profiles: Vec<Profile>,
        checkpoints: Vec<Checkpoint>,
        completions: Vec<Completion>,
        keys: Vec<AccessKey>,
    }

    /// In-memory stand-in for the Postgres repository.
    #[derive(Clone, Default)]
    struct MemStore {
        inner: Arc<Mutex<MemStoreInner>>,
        reject_key_inserts: bool,
    }

    impl MemStore {
        fn rejecting_key_inserts() -> Self {
            Self {
                reject_key_inserts: true,
                ..Default::default()
            }
        }

        fn add_script(&self, owner_id: OwnerId, username: &str) -> ScriptId {
            let script = Script {
                id: ScriptId::new(),
                owner_id,
                title: "Test Script".to_string(),
                is_public: true,
                created_at: Utc::now(),
            };
            let script_id = script.id;
            let mut inner = self.inner.lock().unwrap();
            inner.scripts.push(script);
            inner.profiles.push(Profile {
                id: owner_id,
                username: username.to_string(),
            });
            script_id
        }

        fn add_checkpoint(
            &self,
            script_id: ScriptId,
            order_index: i32,
            provider: Provider,
        ) -> CheckpointId {
            let checkpoint = Checkpoint {
                id: CheckpointId::new(),
                script_id,
                order_index,
                provider,
                target_url: format!("https://{}.example/offer", provider),
                label: format!("Step {}", order_index),
                created_at: Utc::now(),
            };
            let id = checkpoint.id;
            self.inner.lock().unwrap().checkpoints.push(checkpoint);
            id
        }

        fn completion_count(&self) -> usize {
            self.inner.lock().unwrap().completions.len()
        }

        fn stored_key_count(&self) -> usize {
            self.inner.lock().unwrap().keys.len()
        }

        fn push_key(&self, key: AccessKey) {
            self.inner.lock().unwrap().keys.push(key);
        }
    }

    impl CheckpointRepository for MemStore {
        async fn find_checkpoint(&self, id: CheckpointId) -> KeyflowResult<Option<Checkpoint>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.checkpoints.iter().find(|c| c.id == id).cloned())
        }

        async fn checkpoints_for_script(
            &self,
            script_id: ScriptId,
        ) -> KeyflowResult<Vec<Checkpoint>> {
            let inner = self.inner.lock().unwrap();
            let mut checkpoints: Vec<_> = inner
                .checkpoints
                .iter()
                .filter(|c| c.script_id == script_id)
                .cloned()
                .collect();
            checkpoints.sort_by_key(|c| c.order_index);
            Ok(checkpoints)
        }
    }

    impl CompletionRepository for MemStore {
        async fn record(&self, completion: &Completion) -> KeyflowResult<RecordOutcome> {
            let mut inner = self.inner.lock().unwrap();
            let exists = inner.completions.iter().any(|c| {
                c.checkpoint_id == completion.checkpoint_id
                    && c.session_token == completion.session_token
            });
            if exists {
                return Ok(RecordOutcome::AlreadyRecorded);
            }
            inner.completions.push(completion.clone());
            Ok(RecordOutcome::Recorded)
        }

        async fn completed_checkpoints(
            &self,
            checkpoint_ids: &[CheckpointId],
            session_token: &str,
        ) -> KeyflowResult<Vec<CheckpointId>> {
            let inner = self.inner.lock().unwrap();
            Ok(checkpoint_ids
                .iter()
                .copied()
                .filter(|id| {
                    inner
                        .completions
                        .iter()
                        .any(|c| c.checkpoint_id == *id && c.session_token == session_token)
                })
                .collect())
        }
    }

    impl KeyRepository for MemStore {
        async fn create_key(&self, key: &AccessKey) -> KeyflowResult<()> {
            if self.reject_key_inserts {
                return Err(KeyflowError::Internal(
                    "storage policy rejected anonymous insert".to_string(),
                ));
            }
            self.inner.lock().unwrap().keys.push(key.clone());
            Ok(())
        }

        async fn find_key(
            &self,
            script_id: ScriptId,
            key_value: &str,
        ) -> KeyflowResult<Option<AccessKey>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .keys
                .iter()
                .find(|k| k.script_id == script_id && k.key_value == key_value)
                .cloned())
        }
    }

    impl ScriptDirectory for MemStore {
        async fn find_script(&self, id: ScriptId) -> KeyflowResult<Option<Script>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.scripts.iter().find(|s| s.id == id).cloned())
        }

        async fn find_profile(&self, owner_id: OwnerId) -> KeyflowResult<Option<Profile>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.profiles.iter().find(|p| p.id == owner_id).cloned())
        }
    }

    fn record_use_case(store: &MemStore) -> RecordCompletionUseCase<MemStore, MemStore> {
        RecordCompletionUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn verify_use_case(store: &MemStore) -> VerifyCallbackUseCase<MemStore, MemStore, MemStore> {
        VerifyCallbackUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    fn issue_use_case(store: &MemStore) -> IssueKeyUseCase<MemStore, MemStore, MemStore> {
        IssueKeyUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(KeySystemConfig::default()),
        )
    }

    async fn complete(store: &MemStore, checkpoint_id: CheckpointId, session: &str) {
        let outcome = record_use_case(store)
            .execute(RecordCompletionInput {
                checkpoint_id,
                session_token: session.to_string(),
                hwid: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
    }

    #[tokio::test]
    async fn test_record_completion_is_idempotent() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let checkpoint_id = store.add_checkpoint(script_id, 1, Provider::Lootlabs);

        let use_case = record_use_case(&store);
        let input = RecordCompletionInput {
            checkpoint_id,
            session_token: "s1".to_string(),
            hwid: Some("hw-1".to_string()),
        };

        let first = use_case.execute(input.clone()).await.unwrap();
        assert_eq!(first, RecordOutcome::Recorded);

        let second = use_case.execute(input).await.unwrap();
        assert_eq!(second, RecordOutcome::AlreadyRecorded);

        assert_eq!(store.completion_count(), 1);
    }

    #[tokio::test]
    async fn test_record_completion_unknown_checkpoint() {
        let store = MemStore::default();

        let result = record_use_case(&store)
            .execute(RecordCompletionInput {
                checkpoint_id: CheckpointId::new(),
                session_token: "s1".to_string(),
                hwid: None,
            })
            .await;

        assert!(matches!(result, Err(KeyflowError::CheckpointNotFound)));
    }

    #[tokio::test]
    async fn test_issue_key_refuses_script_without_checkpoints() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");

        let result = issue_use_case(&store)
            .execute(IssueKeyInput {
                script_id,
                session_token: "s1".to_string(),
                hwid: None,
            })
            .await;

        assert!(matches!(result, Err(KeyflowError::NoCheckpoints)));
    }

    #[tokio::test]
    async fn test_issue_key_reports_progress_when_incomplete() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let cp1 = store.add_checkpoint(script_id, 1, Provider::Lootlabs);
        let _cp2 = store.add_checkpoint(script_id, 2, Provider::Workink);

        complete(&store, cp1, "s1").await;

        let result = issue_use_case(&store)
            .execute(IssueKeyInput {
                script_id,
                session_token: "s1".to_string(),
                hwid: None,
            })
            .await;

        match result {
            Err(KeyflowError::IncompleteFlow { completed, total }) => {
                assert_eq!(completed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("expected IncompleteFlow, got {:?}", other),
        }
        assert_eq!(store.stored_key_count(), 0);
    }

    #[tokio::test]
    async fn test_completions_are_per_session() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let cp1 = store.add_checkpoint(script_id, 1, Provider::Lootlabs);
        let cp2 = store.add_checkpoint(script_id, 2, Provider::Workink);

        // Another session's progress must not count for "s1"
        complete(&store, cp1, "someone-else").await;
        complete(&store, cp2, "someone-else").await;
        complete(&store, cp1, "s1").await;

        let result = issue_use_case(&store)
            .execute(IssueKeyInput {
                script_id,
                session_token: "s1".to_string(),
                hwid: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(KeyflowError::IncompleteFlow {
                completed: 1,
                total: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_issue_and_validate_round_trip() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let cp1 = store.add_checkpoint(script_id, 1, Provider::Lootlabs);
        let cp2 = store.add_checkpoint(script_id, 2, Provider::Workink);

        // Order-independent: second checkpoint first
        complete(&store, cp2, "s1").await;
        complete(&store, cp1, "s1").await;

        let before = Utc::now();
        let output = issue_use_case(&store)
            .execute(IssueKeyInput {
                script_id,
                session_token: "s1".to_string(),
                hwid: Some("hw-1".to_string()),
            })
            .await
            .unwrap();

        assert!(is_well_formed_key(&output.key, "KG", 4, 4));
        assert!(output.persisted);
        let ttl = (output.expires_at - before).num_seconds();
        assert!((86_395..=86_405).contains(&ttl), "unexpected ttl {}", ttl);

        let validation = ValidateKeyUseCase::new(Arc::new(store.clone()))
            .execute(script_id, &output.key, Some("hw-1"))
            .await
            .unwrap();
        match validation {
            KeyValidation::Valid { expires_at } => assert_eq!(expires_at, output.expires_at),
            other => panic!("expected Valid, got {:?}", other),
        }

        // Wrong device is refused; unbound lookups are not
        let mismatch = ValidateKeyUseCase::new(Arc::new(store.clone()))
            .execute(script_id, &output.key, Some("hw-2"))
            .await
            .unwrap();
        assert_eq!(mismatch, KeyValidation::HwidMismatch);
    }

    #[tokio::test]
    async fn test_reissue_mints_fresh_key() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let cp1 = store.add_checkpoint(script_id, 1, Provider::Linkvertise);
        complete(&store, cp1, "s1").await;

        let use_case = issue_use_case(&store);
        let input = IssueKeyInput {
            script_id,
            session_token: "s1".to_string(),
            hwid: None,
        };
        let first = use_case.execute(input.clone()).await.unwrap();
        let second = use_case.execute(input).await.unwrap();

        // Issuance is not a terminal lock; every call mints a new key
        assert_ne!(first.key, second.key);
        assert_eq!(store.stored_key_count(), 2);
    }

    #[tokio::test]
    async fn test_validate_unknown_and_expired_keys() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");

        let use_case = ValidateKeyUseCase::new(Arc::new(store.clone()));

        let missing = use_case
            .execute(script_id, "KG-AAAA-BBBB-CCCC-DDDD", None)
            .await
            .unwrap();
        assert_eq!(missing, KeyValidation::NotFound);

        store.push_key(AccessKey::new(
            script_id,
            "KG-DEAD-DEAD-DEAD-DEAD".to_string(),
            None,
            -60,
        ));
        let expired = use_case
            .execute(script_id, "KG-DEAD-DEAD-DEAD-DEAD", Some("hw-1"))
            .await
            .unwrap();
        assert_eq!(expired, KeyValidation::Expired);
    }

    #[tokio::test]
    async fn test_callback_provider_mismatch_records_nothing() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let checkpoint_id = store.add_checkpoint(script_id, 1, Provider::Lootlabs);

        let result = verify_use_case(&store)
            .execute(VerifyCallbackInput {
                provider: Provider::Workink,
                channel: CallbackChannel::Redirect,
                checkpoint_id,
                session_token: "s1".to_string(),
                completion_token: Some("tok".to_string()),
            })
            .await;

        assert!(matches!(result, Err(KeyflowError::ProviderMismatch)));
        assert_eq!(store.completion_count(), 0);
    }

    #[tokio::test]
    async fn test_redirect_callback_requires_token() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let checkpoint_id = store.add_checkpoint(script_id, 1, Provider::Linkvertise);

        for token in [None, Some(String::new())] {
            let result = verify_use_case(&store)
                .execute(VerifyCallbackInput {
                    provider: Provider::Linkvertise,
                    channel: CallbackChannel::Redirect,
                    checkpoint_id,
                    session_token: "s1".to_string(),
                    completion_token: token,
                })
                .await;
            assert!(matches!(result, Err(KeyflowError::VerificationFailed)));
        }
        assert_eq!(store.completion_count(), 0);
    }

    #[tokio::test]
    async fn test_post_callback_records_without_token() {
        let store = MemStore::default();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let checkpoint_id = store.add_checkpoint(script_id, 1, Provider::Lootlabs);

        let output = verify_use_case(&store)
            .execute(VerifyCallbackInput {
                provider: Provider::Lootlabs,
                channel: CallbackChannel::Callback,
                checkpoint_id,
                session_token: "s1".to_string(),
                completion_token: None,
            })
            .await
            .unwrap();

        assert_eq!(output.outcome, RecordOutcome::Recorded);
        assert_eq!(output.script_id, script_id);
        assert_eq!(output.owner_username.as_deref(), Some("alice"));
        assert_eq!(store.completion_count(), 1);

        // Repeated callback is a no-op, not an error
        let again = verify_use_case(&store)
            .execute(VerifyCallbackInput {
                provider: Provider::Lootlabs,
                channel: CallbackChannel::Callback,
                checkpoint_id,
                session_token: "s1".to_string(),
                completion_token: None,
            })
            .await
            .unwrap();
        assert_eq!(again.outcome, RecordOutcome::AlreadyRecorded);
        assert_eq!(store.completion_count(), 1);
    }

    #[tokio::test]
    async fn test_issuance_soft_fail_still_returns_key() {
        let store = MemStore::rejecting_key_inserts();
        let script_id = store.add_script(OwnerId::new(), "alice");
        let cp1 = store.add_checkpoint(script_id, 1, Provider::Workink);
        complete(&store, cp1, "s1").await;

        let output = issue_use_case(&store)
            .execute(IssueKeyInput {
                script_id,
                session_token: "s1".to_string(),
                hwid: None,
            })
            .await
            .unwrap();

        assert!(is_well_formed_key(&output.key, "KG", 4, 4));
        assert!(!output.persisted);
        assert_eq!(store.stored_key_count(), 0);
    }
}
