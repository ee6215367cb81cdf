//! Release repository implementation

use coldstore_core::{
    models::{Release, ReleaseLine, ReleaseState},
    traits::{ReleaseRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

const RELEASE_COLUMNS: &str = r#"
    id, number, intake_id, customer_id, company_id, released_at,
    state, currency, gate_entry_id, vehicle_number, driver_name,
    created_at, updated_at
"#;

const LINE_COLUMNS: &str = r#"
    id, release_id, storage_line_id, product_id, lot, qty_out, amount
"#;

/// PostgreSQL implementation of ReleaseRepository
pub struct PgReleaseRepository {
    pool: PgPool,
}

impl PgReleaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Release, i64> for PgReleaseRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Release>> {
        debug!("Finding release by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            "SELECT {RELEASE_COLUMNS} FROM releases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding release {}: {}", id, e);
            AppError::Database(format!("Failed to find release: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Release>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            "SELECT {RELEASE_COLUMNS} FROM releases ORDER BY released_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding releases: {}", e);
            AppError::Database(format!("Failed to fetch releases: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM releases")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting releases: {}", e);
                AppError::Database(format!("Failed to count releases: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Release) -> AppResult<Release> {
        debug!("Creating release: {}", entity.number);

        let row = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            r#"
            INSERT INTO releases (
                number, intake_id, customer_id, company_id, released_at,
                state, currency, gate_entry_id, vehicle_number, driver_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {RELEASE_COLUMNS}
            "#
        ))
        .bind(&entity.number)
        .bind(entity.intake_id)
        .bind(entity.customer_id)
        .bind(entity.company_id)
        .bind(entity.released_at)
        .bind(entity.state.to_string())
        .bind(&entity.currency)
        .bind(entity.gate_entry_id)
        .bind(&entity.vehicle_number)
        .bind(&entity.driver_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating release: {}", e);
            AppError::Database(format!("Failed to create release: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Release) -> AppResult<Release> {
        let row = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            r#"
            UPDATE releases
            SET released_at = $2,
                state = $3,
                gate_entry_id = $4,
                vehicle_number = $5,
                driver_name = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RELEASE_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.released_at)
        .bind(entity.state.to_string())
        .bind(entity.gate_entry_id)
        .bind(&entity.vehicle_number)
        .bind(&entity.driver_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating release {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update release: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting release {}: {}", id, e);
                AppError::Database(format!("Failed to delete release: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReleaseRepository for PgReleaseRepository {
    #[instrument(skip(self))]
    async fn find_by_number(&self, number: &str) -> AppResult<Option<Release>> {
        let result = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            "SELECT {RELEASE_COLUMNS} FROM releases WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding release {}: {}", number, e);
            AppError::Database(format!("Failed to find release: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_lines(&self, release_id: i64) -> AppResult<Vec<ReleaseLine>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReleaseLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM release_lines WHERE release_id = $1 ORDER BY id"
        ))
        .bind(release_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding lines for release {}: {}", release_id, e);
            AppError::Database(format!("Failed to fetch release lines: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, line))]
    async fn create_line(&self, line: &ReleaseLine) -> AppResult<ReleaseLine> {
        let row = sqlx::query_as::<sqlx::Postgres, ReleaseLineRow>(&format!(
            r#"
            INSERT INTO release_lines (
                release_id, storage_line_id, product_id, lot, qty_out, amount
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINE_COLUMNS}
            "#
        ))
        .bind(line.release_id)
        .bind(line.storage_line_id)
        .bind(line.product_id)
        .bind(&line.lot)
        .bind(line.qty_out)
        .bind(line.amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating release line: {}", e);
            AppError::Database(format!("Failed to create release line: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_intake(&self, intake_id: i64) -> AppResult<Vec<Release>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReleaseRow>(&format!(
            r#"
            SELECT {RELEASE_COLUMNS} FROM releases
            WHERE intake_id = $1
            ORDER BY released_at DESC, id DESC
            "#
        ))
        .bind(intake_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding releases for intake {}: {}", intake_id, e);
            AppError::Database(format!("Failed to fetch releases: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping release rows
#[derive(Debug, sqlx::FromRow)]
struct ReleaseRow {
    id: i64,
    number: String,
    intake_id: i64,
    customer_id: i64,
    company_id: i64,
    released_at: DateTime<Utc>,
    state: String,
    currency: String,
    gate_entry_id: Option<i64>,
    vehicle_number: Option<String>,
    driver_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            intake_id: row.intake_id,
            customer_id: row.customer_id,
            company_id: row.company_id,
            released_at: row.released_at,
            state: ReleaseState::from_str(&row.state).unwrap_or_default(),
            currency: row.currency,
            gate_entry_id: row.gate_entry_id,
            vehicle_number: row.vehicle_number,
            driver_name: row.driver_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping release line rows
#[derive(Debug, sqlx::FromRow)]
struct ReleaseLineRow {
    id: i64,
    release_id: i64,
    storage_line_id: i64,
    product_id: i64,
    lot: Option<String>,
    qty_out: f64,
    amount: Decimal,
}

impl From<ReleaseLineRow> for ReleaseLine {
    fn from(row: ReleaseLineRow) -> Self {
        Self {
            id: row.id,
            release_id: row.release_id,
            storage_line_id: row.storage_line_id,
            product_id: row.product_id,
            lot: row.lot,
            qty_out: row.qty_out,
            amount: row.amount,
        }
    }
}
