//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations.

pub mod config;
pub mod issue_key;
pub mod record_completion;
pub mod validate_key;
pub mod verify_callback;
