//! Key-System Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers
//!
//! ## Trust Model
//! - Session tokens are client-generated, unauthenticated identifiers that
//!   correlate completions and key issuance for one visitor attempt
//! - Provider callbacks are trusted on token presence; no outbound call to
//!   the provider's verification API is made
//! - Completion recording is idempotent per (checkpoint, session), backed by
//!   a store uniqueness constraint
//! - Keys expire after a fixed window and are never mutated or deleted

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::KeySystemConfig;
pub use error::{KeyflowError, KeyflowResult};
pub use infra::postgres::PgKeyflowRepository;
pub use presentation::router::{keyflow_router, keyflow_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, OptionExt, ResultExt},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
