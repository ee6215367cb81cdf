//! Health check handlers

use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use serde_json::json;
use sqlx::PgPool;
use tracing::error;

/// Liveness check
///
/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "coldstore",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check including database connectivity
///
/// GET /health/ready
pub async fn ready(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    sqlx::query("SELECT 1")
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!("Readiness check failed: {}", e);
            AppError::Database(format!("Database unreachable: {}", e))
        })?;

    Ok(HttpResponse::Ok().json(json!({ "status": "ready" })))
}

/// Configure health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(health))
            .route("/ready", web::get().to(ready)),
    );
}
