//! Intake repository implementation
//!
//! Besides CRUD, this repository owns the two queries billing correctness
//! depends on: the eligibility selection for a run and the compare-and-swap
//! watermark advance.

use coldstore_core::{
    models::{BillingBasis, EligibilityQuery, Intake, IntakeState, StorageLine},
    traits::{IntakeRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};

const INTAKE_COLUMNS: &str = r#"
    id, number, customer_id, location_id, contract_id, company_id,
    checked_in_at, planned_out, temperature_target, state,
    last_billed_date, currency, note, created_at, updated_at
"#;

const LINE_COLUMNS: &str = r#"
    id, intake_id, product_id, product_category_id, lot,
    qty_in, qty_out, uom, weight, volume, pallet_count,
    checked_in_at, released_at, tariff_rule_id, price_unit,
    bill_basis, subtotal, remark
"#;

/// PostgreSQL implementation of IntakeRepository
pub struct PgIntakeRepository {
    pool: PgPool,
}

impl PgIntakeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Intake, i64> for PgIntakeRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Intake>> {
        debug!("Finding intake by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            "SELECT {INTAKE_COLUMNS} FROM intakes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding intake {}: {}", id, e);
            AppError::Database(format!("Failed to find intake: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Intake>> {
        let rows = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            "SELECT {INTAKE_COLUMNS} FROM intakes ORDER BY checked_in_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding intakes: {}", e);
            AppError::Database(format!("Failed to fetch intakes: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM intakes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting intakes: {}", e);
                AppError::Database(format!("Failed to count intakes: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Intake) -> AppResult<Intake> {
        debug!("Creating intake: {}", entity.number);

        let row = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            r#"
            INSERT INTO intakes (
                number, customer_id, location_id, contract_id, company_id,
                checked_in_at, planned_out, temperature_target, state,
                last_billed_date, currency, note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {INTAKE_COLUMNS}
            "#
        ))
        .bind(&entity.number)
        .bind(entity.customer_id)
        .bind(entity.location_id)
        .bind(entity.contract_id)
        .bind(entity.company_id)
        .bind(entity.checked_in_at)
        .bind(entity.planned_out)
        .bind(entity.temperature_target)
        .bind(entity.state.to_string())
        .bind(entity.last_billed_date)
        .bind(&entity.currency)
        .bind(&entity.note)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating intake: {}", e);
            AppError::Database(format!("Failed to create intake: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Intake) -> AppResult<Intake> {
        debug!("Updating intake: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            r#"
            UPDATE intakes
            SET customer_id = $2,
                location_id = $3,
                contract_id = $4,
                planned_out = $5,
                temperature_target = $6,
                state = $7,
                currency = $8,
                note = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INTAKE_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.customer_id)
        .bind(entity.location_id)
        .bind(entity.contract_id)
        .bind(entity.planned_out)
        .bind(entity.temperature_target)
        .bind(entity.state.to_string())
        .bind(&entity.currency)
        .bind(&entity.note)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating intake {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update intake: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM intakes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting intake {}: {}", id, e);
                AppError::Database(format!("Failed to delete intake: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IntakeRepository for PgIntakeRepository {
    #[instrument(skip(self))]
    async fn find_by_number(&self, number: &str) -> AppResult<Option<Intake>> {
        let result = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            "SELECT {INTAKE_COLUMNS} FROM intakes WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding intake {}: {}", number, e);
            AppError::Database(format!("Failed to find intake: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_lines(&self, intake_id: i64) -> AppResult<Vec<StorageLine>> {
        let rows = sqlx::query_as::<sqlx::Postgres, StorageLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM storage_lines WHERE intake_id = $1 ORDER BY id"
        ))
        .bind(intake_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding lines for intake {}: {}", intake_id, e);
            AppError::Database(format!("Failed to fetch storage lines: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, line))]
    async fn create_line(&self, line: &StorageLine) -> AppResult<StorageLine> {
        let row = sqlx::query_as::<sqlx::Postgres, StorageLineRow>(&format!(
            r#"
            INSERT INTO storage_lines (
                intake_id, product_id, product_category_id, lot,
                qty_in, qty_out, uom, weight, volume, pallet_count,
                checked_in_at, released_at, tariff_rule_id, price_unit,
                bill_basis, subtotal, remark
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {LINE_COLUMNS}
            "#
        ))
        .bind(line.intake_id)
        .bind(line.product_id)
        .bind(line.product_category_id)
        .bind(&line.lot)
        .bind(line.qty_in)
        .bind(line.qty_out)
        .bind(&line.uom)
        .bind(line.weight)
        .bind(line.volume)
        .bind(line.pallet_count)
        .bind(line.checked_in_at)
        .bind(line.released_at)
        .bind(line.tariff_rule_id)
        .bind(line.price_unit)
        .bind(line.bill_basis.map(|b| b.as_str()))
        .bind(line.subtotal)
        .bind(&line.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating storage line: {}", e);
            AppError::Database(format!("Failed to create storage line: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, line))]
    async fn update_line(&self, line: &StorageLine) -> AppResult<StorageLine> {
        let row = sqlx::query_as::<sqlx::Postgres, StorageLineRow>(&format!(
            r#"
            UPDATE storage_lines
            SET qty_out = $2,
                released_at = $3,
                tariff_rule_id = $4,
                price_unit = $5,
                bill_basis = $6,
                subtotal = $7,
                remark = $8
            WHERE id = $1
            RETURNING {LINE_COLUMNS}
            "#
        ))
        .bind(line.id)
        .bind(line.qty_out)
        .bind(line.released_at)
        .bind(line.tariff_rule_id)
        .bind(line.price_unit)
        .bind(line.bill_basis.map(|b| b.as_str()))
        .bind(line.subtotal)
        .bind(&line.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating storage line {}: {}", line.id, e);
            AppError::Database(format!("Failed to update storage line: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, query))]
    async fn find_eligible_for_billing(&self, query: &EligibilityQuery) -> AppResult<Vec<Intake>> {
        debug!(
            "Selecting billable intakes for company {} in {}..{} (unbilled_only={})",
            query.company_id, query.date_from, query.date_to, query.unbilled_only
        );

        // Unbilled-only mode picks up long-running intakes checked in before
        // the window, as long as the watermark has not reached it. All-in-range
        // mode re-bills anything checked in within the window.
        let rows = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            r#"
            SELECT {INTAKE_COLUMNS}
            FROM intakes
            WHERE company_id = $1
              AND state IN ('checked_in', 'partially_out')
              AND (
                    ($4 AND (last_billed_date IS NULL OR last_billed_date < $2)
                        AND checked_in_at::DATE <= $3)
                 OR (NOT $4 AND checked_in_at::DATE >= $2 AND checked_in_at::DATE <= $3)
              )
              AND (CARDINALITY($5::BIGINT[]) = 0 OR customer_id = ANY($5))
              AND (CARDINALITY($6::BIGINT[]) = 0 OR contract_id = ANY($6))
            ORDER BY customer_id, checked_in_at, id
            "#
        ))
        .bind(query.company_id)
        .bind(query.date_from)
        .bind(query.date_to)
        .bind(query.unbilled_only)
        .bind(&query.customer_ids)
        .bind(&query.contract_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error selecting billable intakes: {}", e);
            AppError::Database(format!("Failed to select billable intakes: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count_active(&self, company_id: i64) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM intakes
            WHERE company_id = $1 AND state IN ('checked_in', 'partially_out')
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting active intakes: {}", e);
            AppError::Database(format!("Failed to count active intakes: {}", e))
        })?;

        Ok(result.0)
    }

    #[instrument(skip(self))]
    async fn count_checked_in_between(
        &self,
        company_id: i64,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM intakes
            WHERE company_id = $1
              AND state IN ('checked_in', 'partially_out')
              AND checked_in_at::DATE >= $2 AND checked_in_at::DATE <= $3
            "#,
        )
        .bind(company_id)
        .bind(date_from)
        .bind(date_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting intakes in range: {}", e);
            AppError::Database(format!("Failed to count intakes in range: {}", e))
        })?;

        Ok(result.0)
    }

    #[instrument(skip(self))]
    async fn advance_watermark(
        &self,
        intake_id: i64,
        expected: Option<NaiveDate>,
        new: NaiveDate,
    ) -> AppResult<bool> {
        // Compare-and-swap on the watermark read at selection time. A lost
        // race means another run billed this intake concurrently; the caller
        // must not invoice it again.
        let result = sqlx::query(
            r#"
            UPDATE intakes
            SET last_billed_date = $3, updated_at = NOW()
            WHERE id = $1 AND last_billed_date IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(intake_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error advancing watermark for intake {}: {}", intake_id, e);
            AppError::Database(format!("Failed to advance watermark: {}", e))
        })?;

        let advanced = result.rows_affected() > 0;
        if !advanced {
            warn!(
                "Watermark advance lost race for intake {} (expected {:?})",
                intake_id, expected
            );
        }

        Ok(advanced)
    }

    #[instrument(skip(self))]
    async fn clear_watermark(&self, intake_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE intakes SET last_billed_date = NULL, updated_at = NOW() WHERE id = $1")
            .bind(intake_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error clearing watermark for intake {}: {}", intake_id, e);
                AppError::Database(format!("Failed to clear watermark: {}", e))
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_watermarked_active(&self, company_id: i64) -> AppResult<Vec<Intake>> {
        let rows = sqlx::query_as::<sqlx::Postgres, IntakeRow>(&format!(
            r#"
            SELECT {INTAKE_COLUMNS}
            FROM intakes
            WHERE company_id = $1
              AND state IN ('checked_in', 'partially_out')
              AND last_billed_date IS NOT NULL
            ORDER BY id
            "#
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding watermarked intakes: {}", e);
            AppError::Database(format!("Failed to fetch watermarked intakes: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping intake rows
#[derive(Debug, sqlx::FromRow)]
struct IntakeRow {
    id: i64,
    number: String,
    customer_id: i64,
    location_id: i64,
    contract_id: Option<i64>,
    company_id: i64,
    checked_in_at: DateTime<Utc>,
    planned_out: Option<DateTime<Utc>>,
    temperature_target: f64,
    state: String,
    last_billed_date: Option<NaiveDate>,
    currency: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IntakeRow> for Intake {
    fn from(row: IntakeRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            customer_id: row.customer_id,
            location_id: row.location_id,
            contract_id: row.contract_id,
            company_id: row.company_id,
            checked_in_at: row.checked_in_at,
            planned_out: row.planned_out,
            temperature_target: row.temperature_target,
            state: IntakeState::from_str(&row.state).unwrap_or_default(),
            last_billed_date: row.last_billed_date,
            currency: row.currency,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping storage line rows
#[derive(Debug, sqlx::FromRow)]
struct StorageLineRow {
    id: i64,
    intake_id: i64,
    product_id: i64,
    product_category_id: Option<i64>,
    lot: Option<String>,
    qty_in: f64,
    qty_out: f64,
    uom: String,
    weight: f64,
    volume: f64,
    pallet_count: f64,
    checked_in_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
    tariff_rule_id: Option<i64>,
    price_unit: Decimal,
    bill_basis: Option<String>,
    subtotal: Decimal,
    remark: Option<String>,
}

impl From<StorageLineRow> for StorageLine {
    fn from(row: StorageLineRow) -> Self {
        Self {
            id: row.id,
            intake_id: row.intake_id,
            product_id: row.product_id,
            product_category_id: row.product_category_id,
            lot: row.lot,
            qty_in: row.qty_in,
            qty_out: row.qty_out,
            uom: row.uom,
            weight: row.weight,
            volume: row.volume,
            pallet_count: row.pallet_count,
            checked_in_at: row.checked_in_at,
            released_at: row.released_at,
            tariff_rule_id: row.tariff_rule_id,
            price_unit: row.price_unit,
            bill_basis: row.bill_basis.as_deref().and_then(BillingBasis::from_str),
            subtotal: row.subtotal,
            remark: row.remark,
        }
    }
}
