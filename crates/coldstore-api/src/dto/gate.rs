//! Gate entry DTOs

use chrono::{DateTime, Utc};
use coldstore_core::models::{GateEntry, GateEntryState, GateEntryType};
use coldstore_services::gate_service::NewGateEntry;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to record a gate movement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GateEntryCreateRequest {
    #[serde(default)]
    pub entry_type: GateEntryType,

    #[validate(length(min = 1, max = 32))]
    pub vehicle_number: String,

    #[validate(length(min = 1, max = 128))]
    pub driver_name: String,

    pub driver_contact: Option<String>,
    pub entry_time: Option<DateTime<Utc>>,
    pub intake_id: Option<i64>,
    pub release_id: Option<i64>,
    pub guard_id: i64,
    pub notes: Option<String>,
    pub company_id: i64,
}

impl From<GateEntryCreateRequest> for NewGateEntry {
    fn from(req: GateEntryCreateRequest) -> Self {
        Self {
            entry_type: req.entry_type,
            vehicle_number: req.vehicle_number,
            driver_name: req.driver_name,
            driver_contact: req.driver_contact,
            entry_time: req.entry_time,
            intake_id: req.intake_id,
            release_id: req.release_id,
            guard_id: req.guard_id,
            notes: req.notes,
            company_id: req.company_id,
        }
    }
}

/// Gate entry response
#[derive(Debug, Clone, Serialize)]
pub struct GateEntryResponse {
    pub id: i64,
    pub number: String,
    pub entry_type: GateEntryType,
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_contact: Option<String>,
    pub entry_time: DateTime<Utc>,
    pub intake_id: Option<i64>,
    pub release_id: Option<i64>,
    pub guard_id: i64,
    pub state: GateEntryState,
    pub notes: Option<String>,
    pub company_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<GateEntry> for GateEntryResponse {
    fn from(entry: GateEntry) -> Self {
        Self {
            id: entry.id,
            number: entry.number,
            entry_type: entry.entry_type,
            vehicle_number: entry.vehicle_number,
            driver_name: entry.driver_name,
            driver_contact: entry.driver_contact,
            entry_time: entry.entry_time,
            intake_id: entry.intake_id,
            release_id: entry.release_id,
            guard_id: entry.guard_id,
            state: entry.state,
            notes: entry.notes,
            company_id: entry.company_id,
            created_at: entry.created_at,
        }
    }
}

/// Query parameters for listing gate entries
#[derive(Debug, Clone, Deserialize)]
pub struct GateQueryParams {
    pub intake_id: Option<i64>,
    pub release_id: Option<i64>,
}
