//! Key-Flow Router

use crate::application::config::KeySystemConfig;
use crate::domain::repository::{
    CheckpointRepository, CompletionRepository, KeyRepository, ScriptDirectory,
};
use crate::infra::postgres::PgKeyflowRepository;
use crate::presentation::handlers::{self, KeyflowAppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Create the key-flow router with PostgreSQL repository
pub fn keyflow_router(repo: PgKeyflowRepository, config: KeySystemConfig) -> Router {
    keyflow_router_generic(repo, config)
}

/// Create a generic key-flow router for any repository implementation
pub fn keyflow_router_generic<R>(repo: R, config: KeySystemConfig) -> Router
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
    let state = KeyflowAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    Router::new()
        .route(
            "/callback/{provider}",
            get(handlers::callback_redirect::<R>).post(handlers::callback_post::<R>),
        )
        .route(
            "/checkpoint/complete",
            post(handlers::complete_checkpoint::<R>),
        )
        .route(
            "/key/get",
            get(handlers::validate_key::<R>).post(handlers::issue_key::<R>),
        )
        .with_state(state)
}
