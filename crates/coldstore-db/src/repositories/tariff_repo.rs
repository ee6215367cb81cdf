//! Tariff rule repository implementation

use coldstore_core::{
    models::{BillingBasis, RoundingPolicy, TariffRule},
    traits::{Repository, TariffRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

const SELECT_COLUMNS: &str = r#"
    id, name, company_id, active, sequence, basis,
    product_id, category_id, min_temp, max_temp, min_qty,
    price_unit, currency, rounding_policy, min_bill_days,
    service_product_id, created_at, updated_at
"#;

/// PostgreSQL implementation of TariffRepository
pub struct PgTariffRepository {
    pool: PgPool,
}

impl PgTariffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<TariffRule, i64> for PgTariffRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<TariffRule>> {
        debug!("Finding tariff rule by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM tariff_rules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding tariff rule {}: {}", id, e);
            AppError::Database(format!("Failed to find tariff rule: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<TariffRule>> {
        let rows = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM tariff_rules ORDER BY sequence, id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding tariff rules: {}", e);
            AppError::Database(format!("Failed to fetch tariff rules: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tariff_rules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting tariff rules: {}", e);
                AppError::Database(format!("Failed to count tariff rules: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &TariffRule) -> AppResult<TariffRule> {
        debug!("Creating tariff rule: {}", entity.name);

        let row = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            r#"
            INSERT INTO tariff_rules (
                name, company_id, active, sequence, basis,
                product_id, category_id, min_temp, max_temp, min_qty,
                price_unit, currency, rounding_policy, min_bill_days,
                service_product_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&entity.name)
        .bind(entity.company_id)
        .bind(entity.active)
        .bind(entity.sequence)
        .bind(entity.basis.as_str())
        .bind(entity.product_id)
        .bind(entity.category_id)
        .bind(entity.min_temp)
        .bind(entity.max_temp)
        .bind(entity.min_qty)
        .bind(entity.price_unit)
        .bind(&entity.currency)
        .bind(entity.rounding_policy.to_string())
        .bind(entity.min_bill_days)
        .bind(entity.service_product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating tariff rule: {}", e);
            AppError::Database(format!("Failed to create tariff rule: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &TariffRule) -> AppResult<TariffRule> {
        debug!("Updating tariff rule: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            r#"
            UPDATE tariff_rules
            SET name = $2,
                active = $3,
                sequence = $4,
                basis = $5,
                product_id = $6,
                category_id = $7,
                min_temp = $8,
                max_temp = $9,
                min_qty = $10,
                price_unit = $11,
                currency = $12,
                rounding_policy = $13,
                min_bill_days = $14,
                service_product_id = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.active)
        .bind(entity.sequence)
        .bind(entity.basis.as_str())
        .bind(entity.product_id)
        .bind(entity.category_id)
        .bind(entity.min_temp)
        .bind(entity.max_temp)
        .bind(entity.min_qty)
        .bind(entity.price_unit)
        .bind(&entity.currency)
        .bind(entity.rounding_policy.to_string())
        .bind(entity.min_bill_days)
        .bind(entity.service_product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating tariff rule {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update tariff rule: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tariff_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting tariff rule {}: {}", id, e);
                AppError::Database(format!("Failed to delete tariff rule: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TariffRepository for PgTariffRepository {
    #[instrument(skip(self))]
    async fn find_active(&self, company_id: i64) -> AppResult<Vec<TariffRule>> {
        debug!("Finding active tariff rules for company {}", company_id);

        let rows = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tariff_rules
            WHERE company_id = $1 AND active = TRUE
            ORDER BY sequence, id
            "#
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding active tariff rules: {}", e);
            AppError::Database(format!("Failed to fetch active tariff rules: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        company_id: i64,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<TariffRule>, i64)> {
        let pattern = name.map(|n| format!("%{n}%"));

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM tariff_rules
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(company_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting searched tariff rules: {}", e);
            AppError::Database(format!("Failed to count tariff rules: {}", e))
        })?;

        let rows = sqlx::query_as::<sqlx::Postgres, TariffRuleRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tariff_rules
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY sequence, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(company_id)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error searching tariff rules: {}", e);
            AppError::Database(format!("Failed to search tariff rules: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct TariffRuleRow {
    id: i64,
    name: String,
    company_id: i64,
    active: bool,
    sequence: i32,
    basis: String,
    product_id: Option<i64>,
    category_id: Option<i64>,
    min_temp: Option<f64>,
    max_temp: Option<f64>,
    min_qty: Option<f64>,
    price_unit: Decimal,
    currency: String,
    rounding_policy: String,
    min_bill_days: f64,
    service_product_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TariffRuleRow> for TariffRule {
    fn from(row: TariffRuleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            company_id: row.company_id,
            active: row.active,
            sequence: row.sequence,
            basis: BillingBasis::from_str(&row.basis).unwrap_or_default(),
            product_id: row.product_id,
            category_id: row.category_id,
            min_temp: row.min_temp,
            max_temp: row.max_temp,
            min_qty: row.min_qty,
            price_unit: row.price_unit,
            currency: row.currency,
            rounding_policy: RoundingPolicy::from_str(&row.rounding_policy).unwrap_or_default(),
            min_bill_days: row.min_bill_days,
            service_product_id: row.service_product_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
