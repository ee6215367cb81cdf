//! Tariff rule handlers
//!
//! CRUD over the tariff rules the matcher selects from. Rules are plain
//! records; the business logic lives in the matcher and the billing
//! calculators.

use crate::dto::tariff::{
    TariffMatchRequest, TariffRuleCreateRequest, TariffRuleResponse, TariffRuleUpdateRequest,
    TariffSearchParams,
};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use coldstore_core::models::{tariff::match_rule, StorageLine};
use coldstore_core::traits::{Repository, TariffRepository};
use coldstore_core::AppError;
use rust_decimal::Decimal;
use coldstore_db::PgTariffRepository;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Search tariff rules for a company, by name
///
/// GET /api/v1/tariff-rules
#[instrument(skip(pool))]
pub async fn list_rules(
    pool: web::Data<PgPool>,
    search: web::Query<TariffSearchParams>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let (rules, total) = repo
        .search(
            search.company_id,
            search.name.as_deref(),
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<TariffRuleResponse> = rules.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Active rules in matching order, for a company
///
/// GET /api/v1/tariff-rules/active
#[instrument(skip(pool))]
pub async fn list_active_rules(
    pool: web::Data<PgPool>,
    search: web::Query<TariffSearchParams>,
) -> Result<HttpResponse, AppError> {
    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let rules = repo.find_active(search.company_id).await?;
    let data: Vec<TariffRuleResponse> = rules.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Fetch a tariff rule
///
/// GET /api/v1/tariff-rules/{id}
#[instrument(skip(pool))]
pub async fn get_rule(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let rule_id = path.into_inner();
    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let rule = repo
        .find_by_id(rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tariff rule {rule_id}")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(TariffRuleResponse::from(rule))))
}

/// Create a tariff rule
///
/// POST /api/v1/tariff-rules
#[instrument(skip(pool, req))]
pub async fn create_rule(
    pool: web::Data<PgPool>,
    req: web::Json<TariffRuleCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Tariff rule validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let rule = req.to_rule();
    rule.validate()?;

    debug!(name = %rule.name, "Creating tariff rule");
    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let created = repo.create(&rule).await?;

    info!(id = created.id, name = %created.name, "Tariff rule created");
    Ok(HttpResponse::Created().json(ApiResponse::success(TariffRuleResponse::from(created))))
}

/// Update a tariff rule
///
/// PUT /api/v1/tariff-rules/{id}
#[instrument(skip(pool, req))]
pub async fn update_rule(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    req: web::Json<TariffRuleUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Tariff rule validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let rule_id = path.into_inner();
    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let mut rule = repo
        .find_by_id(rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tariff rule {rule_id}")))?;

    req.apply(&mut rule);
    rule.validate()?;
    let updated = repo.update(&rule).await?;

    info!(id = updated.id, "Tariff rule updated");
    Ok(HttpResponse::Ok().json(ApiResponse::success(TariffRuleResponse::from(updated))))
}

/// Preview which rule would match a hypothetical storage line
///
/// POST /api/v1/tariff-rules/match
#[instrument(skip(pool, req), fields(company_id = req.company_id))]
pub async fn match_preview(
    pool: web::Data<PgPool>,
    req: web::Json<TariffMatchRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Match preview validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let repo = PgTariffRepository::new(pool.get_ref().clone());
    let rules = repo.find_active(req.company_id).await?;

    let candidate = StorageLine {
        id: 0,
        intake_id: 0,
        product_id: req.product_id,
        product_category_id: req.product_category_id,
        lot: None,
        qty_in: req.qty_in,
        qty_out: 0.0,
        uom: "kg".to_string(),
        weight: req.weight,
        volume: req.volume,
        pallet_count: req.pallet_count,
        checked_in_at: Utc::now(),
        released_at: None,
        tariff_rule_id: None,
        price_unit: Decimal::ZERO,
        bill_basis: None,
        subtotal: Decimal::ZERO,
        remark: None,
    };

    let matched = match_rule(&rules, &candidate, req.temperature_target)
        .cloned()
        .map(TariffRuleResponse::from);
    Ok(HttpResponse::Ok().json(ApiResponse::success(matched)))
}

/// Delete a tariff rule
///
/// DELETE /api/v1/tariff-rules/{id}
#[instrument(skip(pool))]
pub async fn delete_rule(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let rule_id = path.into_inner();
    let repo = PgTariffRepository::new(pool.get_ref().clone());

    if repo.delete(rule_id).await? {
        info!(id = rule_id, "Tariff rule deleted");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(AppError::NotFound(format!("tariff rule {rule_id}")))
    }
}

/// Configure tariff rule routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tariff-rules")
            .route("", web::get().to(list_rules))
            .route("", web::post().to(create_rule))
            .route("/active", web::get().to(list_active_rules))
            .route("/match", web::post().to(match_preview))
            .route("/{id}", web::get().to(get_rule))
            .route("/{id}", web::put().to(update_rule))
            .route("/{id}", web::delete().to(delete_rule)),
    );
}
