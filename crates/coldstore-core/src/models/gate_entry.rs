//! Gate entry model
//!
//! Vehicle movements at the warehouse gate. Gate-in entries are linked to
//! intakes, gate-out entries to releases.

use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a gate movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateEntryType {
    #[default]
    GateIn,
    GateOut,
}

impl fmt::Display for GateEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateEntryType::GateIn => write!(f, "gate_in"),
            GateEntryType::GateOut => write!(f, "gate_out"),
        }
    }
}

impl GateEntryType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gate_in" => Some(GateEntryType::GateIn),
            "gate_out" => Some(GateEntryType::GateOut),
            _ => None,
        }
    }

    /// Document series used when numbering entries of this type
    pub fn sequence_series(&self) -> &'static str {
        match self {
            GateEntryType::GateIn => "gate_entry",
            GateEntryType::GateOut => "gate_exit",
        }
    }
}

/// Gate entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateEntryState {
    #[default]
    Draft,
    Confirmed,
    Cancelled,
}

impl fmt::Display for GateEntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateEntryState::Draft => write!(f, "draft"),
            GateEntryState::Confirmed => write!(f, "confirmed"),
            GateEntryState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl GateEntryState {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(GateEntryState::Draft),
            "confirmed" => Some(GateEntryState::Confirmed),
            "cancelled" => Some(GateEntryState::Cancelled),
            _ => None,
        }
    }
}

/// Gate entry entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateEntry {
    /// Unique identifier
    pub id: i64,

    /// Document number from the sequencer
    pub number: String,

    /// Direction of the movement
    pub entry_type: GateEntryType,

    /// Vehicle registration number
    pub vehicle_number: String,

    /// Name of the driver
    pub driver_name: String,

    /// Driver contact number
    pub driver_contact: Option<String>,

    /// Time the vehicle passed the gate
    pub entry_time: DateTime<Utc>,

    /// Related intake, for gate-in entries
    pub intake_id: Option<i64>,

    /// Related release, for gate-out entries
    pub release_id: Option<i64>,

    /// Guard who recorded the entry
    pub guard_id: i64,

    /// Lifecycle state
    pub state: GateEntryState,

    /// Additional remarks
    pub notes: Option<String>,

    /// Owning company
    pub company_id: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl GateEntry {
    /// Validate entry-level constraints
    pub fn validate(&self) -> AppResult<()> {
        if self.vehicle_number.trim().is_empty() {
            return Err(AppError::MissingField("vehicle_number".into()));
        }
        if self.driver_name.trim().is_empty() {
            return Err(AppError::MissingField("driver_name".into()));
        }
        Ok(())
    }

    /// Transition draft -> confirmed
    pub fn confirm(&mut self) -> AppResult<()> {
        if self.state != GateEntryState::Draft {
            return Err(AppError::invalid_state("gate entry", "draft", self.state));
        }
        self.state = GateEntryState::Confirmed;
        Ok(())
    }

    /// Cancel a draft or confirmed entry
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.state == GateEntryState::Cancelled {
            return Err(AppError::invalid_state(
                "gate entry",
                "draft or confirmed",
                self.state,
            ));
        }
        self.state = GateEntryState::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entry() -> GateEntry {
        let now = Utc::now();
        GateEntry {
            id: 1,
            number: "GIN-0001".into(),
            entry_type: GateEntryType::GateIn,
            vehicle_number: "KA-01-AB-1234".into(),
            driver_name: "R. Kumar".into(),
            driver_contact: None,
            entry_time: now,
            intake_id: Some(1),
            release_id: None,
            guard_id: 1,
            state: GateEntryState::Draft,
            notes: None,
            company_id: 1,
            created_at: now,
        }
    }

    #[test]
    fn test_required_fields() {
        let mut entry = test_entry();
        assert!(entry.validate().is_ok());

        entry.vehicle_number = "  ".into();
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_confirm_and_cancel() {
        let mut entry = test_entry();
        assert!(entry.confirm().is_ok());
        assert!(entry.confirm().is_err());
        assert!(entry.cancel().is_ok());
        assert!(entry.cancel().is_err());
    }

    #[test]
    fn test_sequence_series_by_direction() {
        assert_eq!(GateEntryType::GateIn.sequence_series(), "gate_entry");
        assert_eq!(GateEntryType::GateOut.sequence_series(), "gate_exit");
    }
}
