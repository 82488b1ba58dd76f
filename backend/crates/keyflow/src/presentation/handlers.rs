//! HTTP Handlers

use crate::application::config::KeySystemConfig;
use crate::application::issue_key::{IssueKeyInput, IssueKeyUseCase};
use crate::application::record_completion::{RecordCompletionInput, RecordCompletionUseCase};
use crate::application::validate_key::ValidateKeyUseCase;
use crate::application::verify_callback::{
    CallbackChannel, VerifyCallbackInput, VerifyCallbackUseCase,
};
use crate::domain::repository::{
    CheckpointRepository, CompletionRepository, KeyRepository, ScriptDirectory,
};
use crate::domain::value_objects::{KeyValidation, Provider, RecordOutcome};
use crate::error::{KeyflowError, KeyflowResult};
use crate::presentation::dto::{
    CallbackBody, CallbackQuery, CallbackResponse, CompleteRequest, CompleteResponse,
    IssueKeyRequest, IssueKeyResponse, ValidateKeyQuery, ValidateKeyResponse,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use kernel::id::{CheckpointId, ScriptId};
use std::sync::Arc;

/// Shared state for key-flow handlers
#[derive(Clone)]
pub struct KeyflowAppState<R>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<KeySystemConfig>,
}

/// GET /api/callback/{provider}
///
/// Redirect-style verification: the provider sends the visitor back with a
/// completion token in the query string. On success the visitor is sent to
/// the script owner's public profile when one resolves.
pub async fn callback_redirect<R>(
    State(state): State<KeyflowAppState<R>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> KeyflowResult<Response>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    let provider: Provider = provider.parse()?;
    let (Some(checkpoint_id), Some(session_token)) = (query.checkpoint_id, query.session_token)
    else {
        return Err(KeyflowError::MissingField("checkpoint_id or session_token"));
    };

    let use_case = VerifyCallbackUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
    );

    let output = use_case
        .execute(VerifyCallbackInput {
            provider,
            channel: CallbackChannel::Redirect,
            checkpoint_id: CheckpointId::from_uuid(checkpoint_id),
            session_token,
            completion_token: query.token,
        })
        .await?;

    if let Some(username) = output.owner_username {
        let target = format!("/u/{}?script={}", username, output.script_id);
        return Ok(Redirect::to(&target).into_response());
    }

    Ok(Json(CallbackResponse {
        success: true,
        message: Some("Checkpoint verified"),
    })
    .into_response())
}

/// POST /api/callback/{provider}
///
/// Callback-style verification: the provider posts the fields directly.
pub async fn callback_post<R>(
    State(state): State<KeyflowAppState<R>>,
    Path(provider): Path<String>,
    Json(body): Json<CallbackBody>,
) -> KeyflowResult<Json<CallbackResponse>>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    let provider: Provider = provider.parse()?;
    let (Some(checkpoint_id), Some(session_token)) = (body.checkpoint_id, body.session_token)
    else {
        return Err(KeyflowError::InvalidCallback);
    };

    let use_case = VerifyCallbackUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
    );

    use_case
        .execute(VerifyCallbackInput {
            provider,
            channel: CallbackChannel::Callback,
            checkpoint_id: CheckpointId::from_uuid(checkpoint_id),
            session_token,
            completion_token: body.token,
        })
        .await?;

    Ok(Json(CallbackResponse {
        success: true,
        message: None,
    }))
}

/// POST /api/checkpoint/complete
pub async fn complete_checkpoint<R>(
    State(state): State<KeyflowAppState<R>>,
    Json(req): Json<CompleteRequest>,
) -> KeyflowResult<Json<CompleteResponse>>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    let (Some(checkpoint_id), Some(session_token)) = (req.checkpoint_id, req.session_token) else {
        return Err(KeyflowError::MissingField("checkpoint_id or session_token"));
    };

    let use_case = RecordCompletionUseCase::new(state.repo.clone(), state.repo.clone());

    let outcome = use_case
        .execute(RecordCompletionInput {
            checkpoint_id: CheckpointId::from_uuid(checkpoint_id),
            session_token,
            hwid: req.hwid,
        })
        .await?;

    let message = match outcome {
        RecordOutcome::Recorded => "Checkpoint completed",
        RecordOutcome::AlreadyRecorded => "Already completed",
    };

    Ok(Json(CompleteResponse { message }))
}

/// POST /api/key/get
pub async fn issue_key<R>(
    State(state): State<KeyflowAppState<R>>,
    Json(req): Json<IssueKeyRequest>,
) -> KeyflowResult<Json<IssueKeyResponse>>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    let (Some(script_id), Some(session_token)) = (req.script_id, req.session_token) else {
        return Err(KeyflowError::MissingField("script_id or session_token"));
    };

    let use_case = IssueKeyUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    let output = use_case
        .execute(IssueKeyInput {
            script_id: ScriptId::from_uuid(script_id),
            session_token,
            hwid: req.hwid,
        })
        .await?;

    Ok(Json(IssueKeyResponse {
        key: output.key,
        expires_at: output.expires_at,
    }))
}

/// GET /api/key/get
///
/// Validation endpoint for third-party scripts. Invalid keys are reported
/// with 200 and `valid: false`; only missing parameters are a 400.
pub async fn validate_key<R>(
    State(state): State<KeyflowAppState<R>>,
    Query(query): Query<ValidateKeyQuery>,
) -> KeyflowResult<Response>
where
    R: CheckpointRepository
        + CompletionRepository
        + KeyRepository
        + ScriptDirectory
        + Clone
        + Send
        + Sync
        + 'static,
{
    let (Some(script_id), Some(key)) = (query.script_id, query.key) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ValidateKeyResponse::invalid("Missing script_id or key")),
        )
            .into_response());
    };

    let use_case = ValidateKeyUseCase::new(state.repo.clone());

    let validation = use_case
        .execute(ScriptId::from_uuid(script_id), &key, query.hwid.as_deref())
        .await?;

    let body = match validation {
        KeyValidation::Valid { expires_at } => ValidateKeyResponse::valid(expires_at),
        KeyValidation::NotFound => ValidateKeyResponse::invalid("Key not found"),
        KeyValidation::Expired => ValidateKeyResponse::invalid("Key expired"),
        KeyValidation::HwidMismatch => ValidateKeyResponse::invalid("HWID mismatch"),
    };

    Ok(Json(body).into_response())
}
