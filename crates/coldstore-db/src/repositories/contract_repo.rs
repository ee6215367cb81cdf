//! Storage contract repository implementation

use coldstore_core::{
    models::{ContractState, InvoiceCycle, PricingModel, StorageContract},
    traits::{ContractRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

const SELECT_COLUMNS: &str = r#"
    id, number, customer_id, company_id, pricing_model, tariff_rule_id,
    credit_limit, currency, invoice_cycle, next_invoice_date, state,
    date_start, date_end, created_at, updated_at
"#;

/// PostgreSQL implementation of ContractRepository
pub struct PgContractRepository {
    pool: PgPool,
}

impl PgContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<StorageContract, i64> for PgContractRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<StorageContract>> {
        debug!("Finding contract by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM storage_contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding contract {}: {}", id, e);
            AppError::Database(format!("Failed to find contract: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<StorageContract>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM storage_contracts ORDER BY id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding contracts: {}", e);
            AppError::Database(format!("Failed to fetch contracts: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storage_contracts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting contracts: {}", e);
                AppError::Database(format!("Failed to count contracts: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &StorageContract) -> AppResult<StorageContract> {
        debug!("Creating contract: {}", entity.number);

        let row = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            r#"
            INSERT INTO storage_contracts (
                number, customer_id, company_id, pricing_model, tariff_rule_id,
                credit_limit, currency, invoice_cycle, next_invoice_date, state,
                date_start, date_end
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&entity.number)
        .bind(entity.customer_id)
        .bind(entity.company_id)
        .bind(entity.pricing_model.to_string())
        .bind(entity.tariff_rule_id)
        .bind(entity.credit_limit)
        .bind(&entity.currency)
        .bind(entity.invoice_cycle.to_string())
        .bind(entity.next_invoice_date)
        .bind(entity.state.to_string())
        .bind(entity.date_start)
        .bind(entity.date_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating contract: {}", e);
            AppError::Database(format!("Failed to create contract: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &StorageContract) -> AppResult<StorageContract> {
        let row = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            r#"
            UPDATE storage_contracts
            SET pricing_model = $2,
                tariff_rule_id = $3,
                credit_limit = $4,
                invoice_cycle = $5,
                next_invoice_date = $6,
                state = $7,
                date_start = $8,
                date_end = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.pricing_model.to_string())
        .bind(entity.tariff_rule_id)
        .bind(entity.credit_limit)
        .bind(entity.invoice_cycle.to_string())
        .bind(entity.next_invoice_date)
        .bind(entity.state.to_string())
        .bind(entity.date_start)
        .bind(entity.date_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating contract {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update contract: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM storage_contracts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting contract {}: {}", id, e);
                AppError::Database(format!("Failed to delete contract: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContractRepository for PgContractRepository {
    #[instrument(skip(self))]
    async fn find_by_number(&self, number: &str) -> AppResult<Option<StorageContract>> {
        let result = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM storage_contracts WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding contract {}: {}", number, e);
            AppError::Database(format!("Failed to find contract: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_due(&self, today: NaiveDate) -> AppResult<Vec<StorageContract>> {
        debug!("Finding contracts due on or before {}", today);

        let rows = sqlx::query_as::<sqlx::Postgres, ContractRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM storage_contracts
            WHERE state = 'active'
              AND invoice_cycle != 'manual'
              AND next_invoice_date IS NOT NULL
              AND next_invoice_date <= $1
            ORDER BY next_invoice_date, id
            "#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding due contracts: {}", e);
            AppError::Database(format!("Failed to fetch due contracts: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_next_invoice_date(&self, contract_id: i64, next: NaiveDate) -> AppResult<()> {
        sqlx::query(
            "UPDATE storage_contracts SET next_invoice_date = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(contract_id)
        .bind(next)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error updating next invoice date for contract {}: {}",
                contract_id, e
            );
            AppError::Database(format!("Failed to update next invoice date: {}", e))
        })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ContractRow {
    id: i64,
    number: String,
    customer_id: i64,
    company_id: i64,
    pricing_model: String,
    tariff_rule_id: Option<i64>,
    credit_limit: Decimal,
    currency: String,
    invoice_cycle: String,
    next_invoice_date: Option<NaiveDate>,
    state: String,
    date_start: NaiveDate,
    date_end: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContractRow> for StorageContract {
    fn from(row: ContractRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            customer_id: row.customer_id,
            company_id: row.company_id,
            pricing_model: PricingModel::from_str(&row.pricing_model).unwrap_or_default(),
            tariff_rule_id: row.tariff_rule_id,
            credit_limit: row.credit_limit,
            currency: row.currency,
            invoice_cycle: InvoiceCycle::from_str(&row.invoice_cycle).unwrap_or_default(),
            next_invoice_date: row.next_invoice_date,
            state: ContractState::from_str(&row.state).unwrap_or_default(),
            date_start: row.date_start,
            date_end: row.date_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
