//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Script, Checkpoint, Completion, AccessKey)
//! - Domain value objects (Provider, RecordOutcome, KeyValidation)
//! - Domain services (key-string generation)
//! - Repository traits (interfaces)

pub mod entities;
pub mod services;
pub mod repository;
pub mod value_objects;
