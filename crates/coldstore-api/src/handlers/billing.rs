//! Billing run handlers

use crate::dto::billing::{BillingRunRequest, WatermarkResetRequest};
use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use coldstore_services::BillingRunService;
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Preview a billing run without side effects
///
/// POST /api/v1/billing/preview
#[instrument(skip(service, req), fields(company_id = req.company_id))]
pub async fn preview_run(
    service: web::Data<BillingRunService>,
    req: web::Json<BillingRunRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Billing run validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let lines = service.preview(&req.criteria()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(lines)))
}

/// Execute a billing run
///
/// POST /api/v1/billing/runs
#[instrument(skip(service, req), fields(company_id = req.company_id))]
pub async fn execute_run(
    service: web::Data<BillingRunService>,
    req: web::Json<BillingRunRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Billing run validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let outcome = service
        .execute(&req.criteria(), &req.deselected_intake_ids)
        .await?;
    info!(
        run_id = %outcome.run_id,
        invoices = outcome.invoices.len(),
        failures = outcome.failures.len(),
        "Billing run completed"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// Clear watermarks left behind by cancelled or missing invoices
///
/// POST /api/v1/billing/reset-watermarks
#[instrument(skip(service))]
pub async fn reset_watermarks(
    service: web::Data<BillingRunService>,
    req: web::Json<WatermarkResetRequest>,
) -> Result<HttpResponse, AppError> {
    let reset = service.reset_watermarks(req.company_id).await?;
    info!(company_id = req.company_id, reset, "Watermark reset completed");
    Ok(HttpResponse::Ok().json(ApiResponse::success(json!({ "reset": reset }))))
}

/// Configure billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/billing")
            .route("/preview", web::post().to(preview_run))
            .route("/runs", web::post().to(execute_run))
            .route("/reset-watermarks", web::post().to(reset_watermarks)),
    );
}
