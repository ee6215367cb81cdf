//! Gate entry repository implementation

use coldstore_core::{
    models::{GateEntry, GateEntryState, GateEntryType},
    traits::{GateEntryRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

const SELECT_COLUMNS: &str = r#"
    id, number, entry_type, vehicle_number, driver_name, driver_contact,
    entry_time, intake_id, release_id, guard_id, state, notes,
    company_id, created_at
"#;

/// PostgreSQL implementation of GateEntryRepository
pub struct PgGateEntryRepository {
    pool: PgPool,
}

impl PgGateEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<GateEntry, i64> for PgGateEntryRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<GateEntry>> {
        debug!("Finding gate entry by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, GateEntryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM gate_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding gate entry {}: {}", id, e);
            AppError::Database(format!("Failed to find gate entry: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<GateEntry>> {
        let rows = sqlx::query_as::<sqlx::Postgres, GateEntryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM gate_entries ORDER BY entry_time DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding gate entries: {}", e);
            AppError::Database(format!("Failed to fetch gate entries: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gate_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting gate entries: {}", e);
                AppError::Database(format!("Failed to count gate entries: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &GateEntry) -> AppResult<GateEntry> {
        debug!("Creating gate entry: {}", entity.number);

        let row = sqlx::query_as::<sqlx::Postgres, GateEntryRow>(&format!(
            r#"
            INSERT INTO gate_entries (
                number, entry_type, vehicle_number, driver_name, driver_contact,
                entry_time, intake_id, release_id, guard_id, state, notes,
                company_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&entity.number)
        .bind(entity.entry_type.to_string())
        .bind(&entity.vehicle_number)
        .bind(&entity.driver_name)
        .bind(&entity.driver_contact)
        .bind(entity.entry_time)
        .bind(entity.intake_id)
        .bind(entity.release_id)
        .bind(entity.guard_id)
        .bind(entity.state.to_string())
        .bind(&entity.notes)
        .bind(entity.company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating gate entry: {}", e);
            AppError::Database(format!("Failed to create gate entry: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &GateEntry) -> AppResult<GateEntry> {
        let row = sqlx::query_as::<sqlx::Postgres, GateEntryRow>(&format!(
            r#"
            UPDATE gate_entries
            SET vehicle_number = $2,
                driver_name = $3,
                driver_contact = $4,
                entry_time = $5,
                state = $6,
                notes = $7
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.vehicle_number)
        .bind(&entity.driver_name)
        .bind(&entity.driver_contact)
        .bind(entity.entry_time)
        .bind(entity.state.to_string())
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating gate entry {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update gate entry: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM gate_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting gate entry {}: {}", id, e);
                AppError::Database(format!("Failed to delete gate entry: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GateEntryRepository for PgGateEntryRepository {
    #[instrument(skip(self))]
    async fn find_by_document(
        &self,
        intake_id: Option<i64>,
        release_id: Option<i64>,
    ) -> AppResult<Vec<GateEntry>> {
        let rows = sqlx::query_as::<sqlx::Postgres, GateEntryRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM gate_entries
            WHERE ($1::BIGINT IS NOT NULL AND intake_id = $1)
               OR ($2::BIGINT IS NOT NULL AND release_id = $2)
            ORDER BY entry_time DESC, id DESC
            "#
        ))
        .bind(intake_id)
        .bind(release_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding gate entries by document: {}", e);
            AppError::Database(format!("Failed to fetch gate entries: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct GateEntryRow {
    id: i64,
    number: String,
    entry_type: String,
    vehicle_number: String,
    driver_name: String,
    driver_contact: Option<String>,
    entry_time: DateTime<Utc>,
    intake_id: Option<i64>,
    release_id: Option<i64>,
    guard_id: i64,
    state: String,
    notes: Option<String>,
    company_id: i64,
    created_at: DateTime<Utc>,
}

impl From<GateEntryRow> for GateEntry {
    fn from(row: GateEntryRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            entry_type: GateEntryType::from_str(&row.entry_type).unwrap_or_default(),
            vehicle_number: row.vehicle_number,
            driver_name: row.driver_name,
            driver_contact: row.driver_contact,
            entry_time: row.entry_time,
            intake_id: row.intake_id,
            release_id: row.release_id,
            guard_id: row.guard_id,
            state: GateEntryState::from_str(&row.state).unwrap_or_default(),
            notes: row.notes,
            company_id: row.company_id,
            created_at: row.created_at,
        }
    }
}
