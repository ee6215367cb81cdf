//! Release DTOs

use chrono::{DateTime, Utc};
use coldstore_core::models::{Release, ReleaseLine, ReleaseState};
use coldstore_services::release_service::{NewRelease, NewReleaseLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a release
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReleaseCreateRequest {
    pub intake_id: i64,
    pub released_at: Option<DateTime<Utc>>,
    pub gate_entry_id: Option<i64>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,

    #[validate(length(min = 1), nested)]
    pub lines: Vec<ReleaseLineRequest>,
}

/// One requested quantity in a release creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReleaseLineRequest {
    pub storage_line_id: i64,

    #[validate(range(min = 0.000001))]
    pub qty_out: f64,
}

impl From<ReleaseCreateRequest> for NewRelease {
    fn from(req: ReleaseCreateRequest) -> Self {
        Self {
            intake_id: req.intake_id,
            released_at: req.released_at,
            gate_entry_id: req.gate_entry_id,
            vehicle_number: req.vehicle_number,
            driver_name: req.driver_name,
            lines: req
                .lines
                .into_iter()
                .map(|l| NewReleaseLine {
                    storage_line_id: l.storage_line_id,
                    qty_out: l.qty_out,
                })
                .collect(),
        }
    }
}

/// Release response
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    pub id: i64,
    pub number: String,
    pub intake_id: i64,
    pub customer_id: i64,
    pub company_id: i64,
    pub released_at: DateTime<Utc>,
    pub state: ReleaseState,
    pub currency: String,
    pub gate_entry_id: Option<i64>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Release> for ReleaseResponse {
    fn from(release: Release) -> Self {
        Self {
            id: release.id,
            number: release.number,
            intake_id: release.intake_id,
            customer_id: release.customer_id,
            company_id: release.company_id,
            released_at: release.released_at,
            state: release.state,
            currency: release.currency,
            gate_entry_id: release.gate_entry_id,
            vehicle_number: release.vehicle_number,
            driver_name: release.driver_name,
            created_at: release.created_at,
            updated_at: release.updated_at,
        }
    }
}

/// Release line response
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseLineResponse {
    pub id: i64,
    pub release_id: i64,
    pub storage_line_id: i64,
    pub product_id: i64,
    pub lot: Option<String>,
    pub qty_out: f64,
    pub amount: Decimal,
}

impl From<ReleaseLine> for ReleaseLineResponse {
    fn from(line: ReleaseLine) -> Self {
        Self {
            id: line.id,
            release_id: line.release_id,
            storage_line_id: line.storage_line_id,
            product_id: line.product_id,
            lot: line.lot,
            qty_out: line.qty_out,
            amount: line.amount,
        }
    }
}

/// Release with its lines
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseDetailResponse {
    #[serde(flatten)]
    pub release: ReleaseResponse,
    pub lines: Vec<ReleaseLineResponse>,
}

impl ReleaseDetailResponse {
    pub fn new(release: Release, lines: Vec<ReleaseLine>) -> Self {
        Self {
            release: release.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Query parameters for listing releases
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseQueryParams {
    pub intake_id: Option<i64>,
}
