//! Release handlers

use crate::dto::release::{
    ReleaseCreateRequest, ReleaseDetailResponse, ReleaseQueryParams, ReleaseResponse,
};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use coldstore_services::ReleaseService;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Create a draft release against an intake
///
/// POST /api/v1/releases
#[instrument(skip(service, req))]
pub async fn create_release(
    service: web::Data<ReleaseService>,
    req: web::Json<ReleaseCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Release validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let (release, lines) = service.create(req.into_inner().into()).await?;
    info!(number = %release.number, "Release created");
    Ok(HttpResponse::Created()
        .json(ApiResponse::success(ReleaseDetailResponse::new(release, lines))))
}

/// List releases, optionally filtered to one intake
///
/// GET /api/v1/releases
#[instrument(skip(service))]
pub async fn list_releases(
    service: web::Data<ReleaseService>,
    filter: web::Query<ReleaseQueryParams>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    if let Some(intake_id) = filter.intake_id {
        let releases = service.list_for_intake(intake_id).await?;
        let data: Vec<ReleaseResponse> = releases.into_iter().map(Into::into).collect();
        return Ok(HttpResponse::Ok().json(ApiResponse::success(data)));
    }

    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let releases = service.list(query.limit(), query.offset()).await?;
    let total = service.count().await?;
    let data: Vec<ReleaseResponse> = releases.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Fetch a release with its lines
///
/// GET /api/v1/releases/{id}
#[instrument(skip(service))]
pub async fn get_release(
    service: web::Data<ReleaseService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (release, lines) = service.get_with_lines(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ReleaseDetailResponse::new(release, lines))))
}

/// Validate a draft release, executing stock moves
///
/// POST /api/v1/releases/{id}/validate
#[instrument(skip(service))]
pub async fn validate_release(
    service: web::Data<ReleaseService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let release = service.validate(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ReleaseResponse::from(release),
        "Release validated",
    )))
}

/// Cancel a draft release
///
/// POST /api/v1/releases/{id}/cancel
#[instrument(skip(service))]
pub async fn cancel_release(
    service: web::Data<ReleaseService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let release = service.cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ReleaseResponse::from(release),
        "Release cancelled",
    )))
}

/// Invoice a validated release
///
/// POST /api/v1/releases/{id}/invoice
#[instrument(skip(service))]
pub async fn invoice_release(
    service: web::Data<ReleaseService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let invoice = service.invoice_release(path.into_inner()).await?;
    info!(number = %invoice.number, "Release invoiced");
    Ok(HttpResponse::Created().json(ApiResponse::success(invoice)))
}

/// Configure release routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/releases")
            .route("", web::get().to(list_releases))
            .route("", web::post().to(create_release))
            .route("/{id}", web::get().to(get_release))
            .route("/{id}/validate", web::post().to(validate_release))
            .route("/{id}/cancel", web::post().to(cancel_release))
            .route("/{id}/invoice", web::post().to(invoice_release)),
    );
}
