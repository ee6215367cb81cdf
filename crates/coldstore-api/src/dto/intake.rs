//! Intake and temperature DTOs

use chrono::{DateTime, NaiveDate, Utc};
use coldstore_core::models::{
    BillingBasis, Intake, IntakeState, IntakeTotals, StorageLine, TemperatureLog,
    TemperatureStatus,
};
use coldstore_services::intake_service::{NewIntake, NewStorageLine, NewTemperatureReading};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create an intake
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IntakeCreateRequest {
    pub customer_id: i64,
    pub location_id: i64,
    pub contract_id: Option<i64>,
    pub company_id: i64,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub planned_out: Option<DateTime<Utc>>,

    #[serde(default = "default_temperature_target")]
    #[validate(range(min = -50.0, max = 50.0))]
    pub temperature_target: f64,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    pub note: Option<String>,

    #[validate(length(min = 1), nested)]
    pub lines: Vec<StorageLineRequest>,
}

fn default_temperature_target() -> f64 {
    -18.0
}

fn default_currency() -> String {
    "USD".to_string()
}

/// One storage line in an intake creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageLineRequest {
    pub product_id: i64,
    pub product_category_id: Option<i64>,
    pub lot: Option<String>,

    #[validate(range(min = 0.000001))]
    pub qty_in: f64,

    #[serde(default = "default_uom")]
    pub uom: String,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub weight: f64,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub volume: f64,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub pallet_count: f64,

    pub tariff_rule_id: Option<i64>,
    pub price_unit: Option<Decimal>,
    pub remark: Option<String>,
}

fn default_uom() -> String {
    "kg".to_string()
}

impl From<IntakeCreateRequest> for NewIntake {
    fn from(req: IntakeCreateRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            location_id: req.location_id,
            contract_id: req.contract_id,
            company_id: req.company_id,
            checked_in_at: req.checked_in_at,
            planned_out: req.planned_out,
            temperature_target: req.temperature_target,
            currency: req.currency,
            note: req.note,
            lines: req.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<StorageLineRequest> for NewStorageLine {
    fn from(req: StorageLineRequest) -> Self {
        Self {
            product_id: req.product_id,
            product_category_id: req.product_category_id,
            lot: req.lot,
            qty_in: req.qty_in,
            uom: req.uom,
            weight: req.weight,
            volume: req.volume,
            pallet_count: req.pallet_count,
            tariff_rule_id: req.tariff_rule_id,
            price_unit: req.price_unit,
            remark: req.remark,
        }
    }
}

/// Intake response
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResponse {
    pub id: i64,
    pub number: String,
    pub customer_id: i64,
    pub location_id: i64,
    pub contract_id: Option<i64>,
    pub company_id: i64,
    pub checked_in_at: DateTime<Utc>,
    pub planned_out: Option<DateTime<Utc>>,
    pub temperature_target: f64,
    pub state: IntakeState,
    pub last_billed_date: Option<NaiveDate>,
    pub currency: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Intake> for IntakeResponse {
    fn from(intake: Intake) -> Self {
        Self {
            id: intake.id,
            number: intake.number,
            customer_id: intake.customer_id,
            location_id: intake.location_id,
            contract_id: intake.contract_id,
            company_id: intake.company_id,
            checked_in_at: intake.checked_in_at,
            planned_out: intake.planned_out,
            temperature_target: intake.temperature_target,
            state: intake.state,
            last_billed_date: intake.last_billed_date,
            currency: intake.currency,
            note: intake.note,
            created_at: intake.created_at,
            updated_at: intake.updated_at,
        }
    }
}

/// Storage line response
#[derive(Debug, Clone, Serialize)]
pub struct StorageLineResponse {
    pub id: i64,
    pub intake_id: i64,
    pub product_id: i64,
    pub product_category_id: Option<i64>,
    pub lot: Option<String>,
    pub qty_in: f64,
    pub qty_out: f64,
    pub qty_available: f64,
    pub uom: String,
    pub weight: f64,
    pub volume: f64,
    pub pallet_count: f64,
    pub checked_in_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub tariff_rule_id: Option<i64>,
    pub price_unit: Decimal,
    pub bill_basis: Option<BillingBasis>,
    pub subtotal: Decimal,
    pub remark: Option<String>,
}

impl From<StorageLine> for StorageLineResponse {
    fn from(line: StorageLine) -> Self {
        Self {
            id: line.id,
            intake_id: line.intake_id,
            product_id: line.product_id,
            product_category_id: line.product_category_id,
            lot: line.lot.clone(),
            qty_in: line.qty_in,
            qty_out: line.qty_out,
            qty_available: line.qty_available(),
            uom: line.uom.clone(),
            weight: line.weight,
            volume: line.volume,
            pallet_count: line.pallet_count,
            checked_in_at: line.checked_in_at,
            released_at: line.released_at,
            tariff_rule_id: line.tariff_rule_id,
            price_unit: line.price_unit,
            bill_basis: line.bill_basis,
            subtotal: line.subtotal,
            remark: line.remark,
        }
    }
}

/// Intake with its lines and aggregated totals
#[derive(Debug, Clone, Serialize)]
pub struct IntakeDetailResponse {
    #[serde(flatten)]
    pub intake: IntakeResponse,
    pub lines: Vec<StorageLineResponse>,
    pub totals: IntakeTotals,
}

impl IntakeDetailResponse {
    pub fn new(intake: Intake, lines: Vec<StorageLine>, totals: IntakeTotals) -> Self {
        Self {
            intake: intake.into(),
            lines: lines.into_iter().map(Into::into).collect(),
            totals,
        }
    }
}

/// Request to record a temperature reading
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TemperatureLogRequest {
    pub intake_id: Option<i64>,
    pub location_id: i64,
    pub recorded_at: Option<DateTime<Utc>>,

    #[validate(range(min = -50.0, max = 50.0))]
    pub temperature: f64,

    pub sensor_ref: Option<String>,
    pub company_id: i64,
}

impl From<TemperatureLogRequest> for NewTemperatureReading {
    fn from(req: TemperatureLogRequest) -> Self {
        Self {
            intake_id: req.intake_id,
            location_id: req.location_id,
            recorded_at: req.recorded_at,
            temperature: req.temperature,
            sensor_ref: req.sensor_ref,
            company_id: req.company_id,
        }
    }
}

/// Temperature reading response
#[derive(Debug, Clone, Serialize)]
pub struct TemperatureLogResponse {
    pub id: i64,
    pub intake_id: Option<i64>,
    pub location_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub temperature: f64,
    pub sensor_ref: Option<String>,
    pub status: TemperatureStatus,
    pub company_id: i64,
}

impl From<TemperatureLog> for TemperatureLogResponse {
    fn from(log: TemperatureLog) -> Self {
        Self {
            id: log.id,
            intake_id: log.intake_id,
            location_id: log.location_id,
            recorded_at: log.recorded_at,
            temperature: log.temperature,
            sensor_ref: log.sensor_ref,
            status: log.status,
            company_id: log.company_id,
        }
    }
}

/// Query parameters for temperature history
#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureQueryParams {
    pub location_id: Option<i64>,
    pub intake_id: Option<i64>,

    #[serde(default = "default_temperature_limit")]
    pub limit: i64,
}

fn default_temperature_limit() -> i64 {
    100
}
