//! ColdStore Core Library
//!
//! This crate provides the foundational types, billing math, traits, and
//! error handling for the ColdStore cold-storage billing system. It includes:
//!
//! - Domain models (Intake, StorageLine, Release, TariffRule, Contract, etc.)
//! - The billing engine (duration rounding, tariff matching, charge and
//!   period-window calculations)
//! - Common traits for repositories and external collaborators
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod billing;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
