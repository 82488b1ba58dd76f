//! Infrastructure Layer
//!
//! PostgreSQL implementations of the domain repository traits.

pub mod postgres;
