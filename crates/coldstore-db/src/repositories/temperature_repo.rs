//! Temperature log repository implementation

use coldstore_core::{
    models::{TemperatureLog, TemperatureStatus},
    traits::TemperatureLogRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, instrument};

const SELECT_COLUMNS: &str = r#"
    id, intake_id, location_id, recorded_at, temperature, sensor_ref,
    status, company_id
"#;

/// PostgreSQL implementation of TemperatureLogRepository
pub struct PgTemperatureLogRepository {
    pool: PgPool,
}

impl PgTemperatureLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemperatureLogRepository for PgTemperatureLogRepository {
    #[instrument(skip(self, log))]
    async fn create(&self, log: &TemperatureLog) -> AppResult<TemperatureLog> {
        let row = sqlx::query_as::<sqlx::Postgres, TemperatureLogRow>(&format!(
            r#"
            INSERT INTO temperature_logs (
                intake_id, location_id, recorded_at, temperature, sensor_ref,
                status, company_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(log.intake_id)
        .bind(log.location_id)
        .bind(log.recorded_at)
        .bind(log.temperature)
        .bind(&log.sensor_ref)
        .bind(log.status.to_string())
        .bind(log.company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating temperature log: {}", e);
            AppError::Database(format!("Failed to create temperature log: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_location(&self, location_id: i64, limit: i64) -> AppResult<Vec<TemperatureLog>> {
        let rows = sqlx::query_as::<sqlx::Postgres, TemperatureLogRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM temperature_logs
            WHERE location_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(location_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding temperature logs: {}", e);
            AppError::Database(format!("Failed to fetch temperature logs: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_intake(&self, intake_id: i64) -> AppResult<Vec<TemperatureLog>> {
        let rows = sqlx::query_as::<sqlx::Postgres, TemperatureLogRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM temperature_logs
            WHERE intake_id = $1
            ORDER BY recorded_at DESC, id DESC
            "#
        ))
        .bind(intake_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding temperature logs for intake {}: {}", intake_id, e);
            AppError::Database(format!("Failed to fetch temperature logs: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct TemperatureLogRow {
    id: i64,
    intake_id: Option<i64>,
    location_id: i64,
    recorded_at: DateTime<Utc>,
    temperature: f64,
    sensor_ref: Option<String>,
    status: String,
    company_id: i64,
}

impl From<TemperatureLogRow> for TemperatureLog {
    fn from(row: TemperatureLogRow) -> Self {
        let status = match row.status.as_str() {
            "high" => TemperatureStatus::High,
            "low" => TemperatureStatus::Low,
            "critical" => TemperatureStatus::Critical,
            _ => TemperatureStatus::Normal,
        };
        Self {
            id: row.id,
            intake_id: row.intake_id,
            location_id: row.location_id,
            recorded_at: row.recorded_at,
            temperature: row.temperature,
            sensor_ref: row.sensor_ref,
            status,
            company_id: row.company_id,
        }
    }
}
