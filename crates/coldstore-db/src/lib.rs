//! ColdStore Database Layer
//!
//! This crate provides PostgreSQL database access for the ColdStore billing
//! system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for all domain entities
//! - Gateways to the warehouse collaborators (document sequences, stock
//!   moves, invoices, income account resolution)

pub mod collaborators;
pub mod pool;
pub mod repositories;

pub use collaborators::*;
pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use coldstore_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
