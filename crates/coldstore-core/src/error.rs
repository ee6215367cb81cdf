//! Unified error handling for ColdStore
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== State Errors ====================
    #[error("Invalid state for {entity}: expected {expected}, found {actual}")]
    InvalidState {
        entity: String,
        expected: String,
        actual: String,
    },

    // ==================== Billing Eligibility Errors ====================
    #[error("No active intakes found. Only intakes in 'checked in' or 'partially released' state can be billed")]
    NoActiveIntakes,

    #[error("No billable intakes found for the window {from} to {to}. Check that the window covers intake check-in dates and that intakes are still in storage")]
    NoIntakesInRange { from: NaiveDate, to: NaiveDate },

    #[error("All intakes in the window {from} to {to} have already been billed. Widen the window or disable 'unbilled only' to re-bill")]
    AllIntakesBilled { from: NaiveDate, to: NaiveDate },

    // ==================== Resolution Failures ====================
    #[error("No income account resolvable for service product {0}. Configure an income account on the product or its category before billing")]
    AccountResolution(i64),

    // ==================== Collaborator Errors ====================
    #[error("Stock move failed: {0}")]
    Stock(String),

    #[error("Sequence generation failed: {0}")]
    Sequence(String),

    #[error("Invoice creation failed: {0}")]
    InvoiceCreation(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::InvalidState { .. } | AppError::Conflict(_) | AppError::AlreadyExists(_) => {
                StatusCode::CONFLICT
            }

            // 422 Unprocessable Entity
            AppError::NoActiveIntakes
            | AppError::NoIntakesInRange { .. }
            | AppError::AllIntakesBilled { .. }
            | AppError::AccountResolution(_)
            | AppError::Stock(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 502 Bad Gateway - downstream collaborator failed
            AppError::InvoiceCreation(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::NoActiveIntakes => "no_active_intakes",
            AppError::NoIntakesInRange { .. } => "no_intakes_in_range",
            AppError::AllIntakesBilled { .. } => "all_intakes_billed",
            AppError::AccountResolution(_) => "account_resolution_failed",
            AppError::Stock(_) => "stock_error",
            AppError::Sequence(_) => "sequence_error",
            AppError::InvoiceCreation(_) => "invoice_creation_failed",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Shorthand for state errors
    pub fn invalid_state(entity: &str, expected: &str, actual: impl ToString) -> Self {
        AppError::InvalidState {
            entity: entity.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Validation("qty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("intake 7".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::invalid_state("release", "draft", "done").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NoActiveIntakes.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NoActiveIntakes.error_code(), "no_active_intakes");
        assert_eq!(
            AppError::AccountResolution(42).error_code(),
            "account_resolution_failed"
        );
    }

    #[test]
    fn test_eligibility_messages_are_actionable() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let msg = AppError::AllIntakesBilled { from, to }.to_string();
        assert!(msg.contains("already been billed"));
        assert!(msg.contains("2024-01-01"));
    }
}
