//! Gate entry handlers

use crate::dto::gate::{GateEntryCreateRequest, GateEntryResponse, GateQueryParams};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use coldstore_services::GateEntryService;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Record a gate movement
///
/// POST /api/v1/gate-entries
#[instrument(skip(service, req))]
pub async fn create_entry(
    service: web::Data<GateEntryService>,
    req: web::Json<GateEntryCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Gate entry validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let entry = service.create(req.into_inner().into()).await?;
    info!(number = %entry.number, "Gate entry created");
    Ok(HttpResponse::Created().json(ApiResponse::success(GateEntryResponse::from(entry))))
}

/// List gate entries, optionally filtered to a linked document
///
/// GET /api/v1/gate-entries
#[instrument(skip(service))]
pub async fn list_entries(
    service: web::Data<GateEntryService>,
    filter: web::Query<GateQueryParams>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    if filter.intake_id.is_some() || filter.release_id.is_some() {
        let entries = service
            .list_for_document(filter.intake_id, filter.release_id)
            .await?;
        let data: Vec<GateEntryResponse> = entries.into_iter().map(Into::into).collect();
        return Ok(HttpResponse::Ok().json(ApiResponse::success(data)));
    }

    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let entries = service.list(query.limit(), query.offset()).await?;
    let total = service.count().await?;
    let data: Vec<GateEntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Fetch a gate entry
///
/// GET /api/v1/gate-entries/{id}
#[instrument(skip(service))]
pub async fn get_entry(
    service: web::Data<GateEntryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let entry = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(GateEntryResponse::from(entry))))
}

/// Confirm a gate entry
///
/// POST /api/v1/gate-entries/{id}/confirm
#[instrument(skip(service))]
pub async fn confirm_entry(
    service: web::Data<GateEntryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let entry = service.confirm(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        GateEntryResponse::from(entry),
        "Gate entry confirmed",
    )))
}

/// Cancel a gate entry
///
/// POST /api/v1/gate-entries/{id}/cancel
#[instrument(skip(service))]
pub async fn cancel_entry(
    service: web::Data<GateEntryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let entry = service.cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        GateEntryResponse::from(entry),
        "Gate entry cancelled",
    )))
}

/// Configure gate entry routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gate-entries")
            .route("", web::get().to(list_entries))
            .route("", web::post().to(create_entry))
            .route("/{id}", web::get().to(get_entry))
            .route("/{id}/confirm", web::post().to(confirm_entry))
            .route("/{id}/cancel", web::post().to(cancel_entry)),
    );
}
