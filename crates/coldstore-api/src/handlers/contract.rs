//! Storage contract handlers

use crate::dto::contract::{ContractCreateRequest, ContractResponse};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use coldstore_core::AppError;
use coldstore_services::{ContractBillingSweep, ContractService};
use tracing::{info, instrument, warn};
use validator::Validate;

/// Create a draft contract
///
/// POST /api/v1/contracts
#[instrument(skip(service, req))]
pub async fn create_contract(
    service: web::Data<ContractService>,
    req: web::Json<ContractCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Contract validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let contract = service.create(req.into_inner().into()).await?;
    info!(number = %contract.number, "Contract created");
    Ok(HttpResponse::Created().json(ApiResponse::success(ContractResponse::from(contract))))
}

/// List contracts
///
/// GET /api/v1/contracts
#[instrument(skip(service))]
pub async fn list_contracts(
    service: web::Data<ContractService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let contracts = service.list(query.limit(), query.offset()).await?;
    let total = service.count().await?;
    let data: Vec<ContractResponse> = contracts.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Fetch a contract
///
/// GET /api/v1/contracts/{id}
#[instrument(skip(service))]
pub async fn get_contract(
    service: web::Data<ContractService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let contract = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ContractResponse::from(contract))))
}

/// Activate a contract, scheduling its first invoice date
///
/// POST /api/v1/contracts/{id}/activate
#[instrument(skip(service))]
pub async fn activate_contract(
    service: web::Data<ContractService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let contract = service.activate(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ContractResponse::from(contract),
        "Contract activated",
    )))
}

/// Suspend a contract
///
/// POST /api/v1/contracts/{id}/suspend
#[instrument(skip(service))]
pub async fn suspend_contract(
    service: web::Data<ContractService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let contract = service.suspend(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ContractResponse::from(contract),
        "Contract suspended",
    )))
}

/// Close a contract
///
/// POST /api/v1/contracts/{id}/close
#[instrument(skip(service))]
pub async fn close_contract(
    service: web::Data<ContractService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let contract = service.close(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ContractResponse::from(contract),
        "Contract closed",
    )))
}

/// Run the contract billing sweep immediately
///
/// POST /api/v1/contracts/sweep
#[instrument(skip(sweep))]
pub async fn run_sweep(
    sweep: web::Data<ContractBillingSweep>,
) -> Result<HttpResponse, AppError> {
    let outcome = sweep.run_once().await?;
    info!(
        billed = outcome.billed,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "Manual contract sweep completed"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// Configure contract routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/contracts")
            .route("", web::get().to(list_contracts))
            .route("", web::post().to(create_contract))
            .route("/sweep", web::post().to(run_sweep))
            .route("/{id}", web::get().to(get_contract))
            .route("/{id}/activate", web::post().to(activate_contract))
            .route("/{id}/suspend", web::post().to(suspend_contract))
            .route("/{id}/close", web::post().to(close_contract)),
    );
}
