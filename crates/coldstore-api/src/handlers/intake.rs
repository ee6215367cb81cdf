//! Intake and temperature handlers

use crate::dto::intake::{
    IntakeCreateRequest, IntakeDetailResponse, IntakeResponse, TemperatureLogRequest,
    TemperatureLogResponse, TemperatureQueryParams,
};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use coldstore_services::IntakeService;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Create a draft intake with its storage lines
///
/// POST /api/v1/intakes
#[instrument(skip(service, req))]
pub async fn create_intake(
    service: web::Data<IntakeService>,
    req: web::Json<IntakeCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Intake validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let (intake, lines) = service.create(req.into_inner().into()).await?;
    info!(number = %intake.number, "Intake created");

    let totals = coldstore_core::models::Intake::totals(&lines);
    Ok(HttpResponse::Created()
        .json(ApiResponse::success(IntakeDetailResponse::new(intake, lines, totals))))
}

/// List intakes
///
/// GET /api/v1/intakes
#[instrument(skip(service))]
pub async fn list_intakes(
    service: web::Data<IntakeService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let intakes = service.list(query.limit(), query.offset()).await?;
    let total = service.count().await?;
    let data: Vec<IntakeResponse> = intakes.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Fetch an intake with lines and totals
///
/// GET /api/v1/intakes/{id}
#[instrument(skip(service))]
pub async fn get_intake(
    service: web::Data<IntakeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (intake, lines, totals) = service.get_with_lines(path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .json(ApiResponse::success(IntakeDetailResponse::new(intake, lines, totals))))
}

/// Check an intake in, moving goods into the freezer location
///
/// POST /api/v1/intakes/{id}/check-in
#[instrument(skip(service))]
pub async fn check_in_intake(
    service: web::Data<IntakeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let intake = service.check_in(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        IntakeResponse::from(intake),
        "Intake checked in",
    )))
}

/// Cancel an intake
///
/// POST /api/v1/intakes/{id}/cancel
#[instrument(skip(service))]
pub async fn cancel_intake(
    service: web::Data<IntakeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let intake = service.cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        IntakeResponse::from(intake),
        "Intake cancelled",
    )))
}

/// Close a fully released intake
///
/// POST /api/v1/intakes/{id}/close
#[instrument(skip(service))]
pub async fn close_intake(
    service: web::Data<IntakeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let intake = service.close(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        IntakeResponse::from(intake),
        "Intake closed",
    )))
}

/// Recompute lifetime charges for an intake
///
/// POST /api/v1/intakes/{id}/recompute
#[instrument(skip(service))]
pub async fn recompute_intake(
    service: web::Data<IntakeService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let totals = service.recompute_charges(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(totals)))
}

/// Record a temperature reading
///
/// POST /api/v1/temperature-logs
#[instrument(skip(service, req))]
pub async fn record_temperature(
    service: web::Data<IntakeService>,
    req: web::Json<TemperatureLogRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Temperature log validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let log = service.record_temperature(req.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(TemperatureLogResponse::from(log))))
}

/// Temperature history for a location or an intake
///
/// GET /api/v1/temperature-logs
#[instrument(skip(service))]
pub async fn list_temperature_logs(
    service: web::Data<IntakeService>,
    query: web::Query<TemperatureQueryParams>,
) -> Result<HttpResponse, AppError> {
    let logs = match (query.intake_id, query.location_id) {
        (Some(intake_id), _) => service.temperature_for_intake(intake_id).await?,
        (None, Some(location_id)) => {
            service.temperature_for_location(location_id, query.limit).await?
        }
        (None, None) => {
            return Err(AppError::Validation(
                "either intake_id or location_id is required".into(),
            ))
        }
    };

    let data: Vec<TemperatureLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Configure intake and temperature routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/intakes")
            .route("", web::get().to(list_intakes))
            .route("", web::post().to(create_intake))
            .route("/{id}", web::get().to(get_intake))
            .route("/{id}/check-in", web::post().to(check_in_intake))
            .route("/{id}/cancel", web::post().to(cancel_intake))
            .route("/{id}/close", web::post().to(close_intake))
            .route("/{id}/recompute", web::post().to(recompute_intake)),
    );
    cfg.service(
        web::scope("/temperature-logs")
            .route("", web::get().to(list_temperature_logs))
            .route("", web::post().to(record_temperature)),
    );
}
