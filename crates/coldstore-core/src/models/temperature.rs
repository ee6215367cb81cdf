//! Temperature log model
//!
//! Sensor readings against freezer locations, classified by deviation from
//! the monitored intake's target temperature.

use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a reading relative to the target temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureStatus {
    #[default]
    Normal,
    High,
    Low,
    Critical,
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureStatus::Normal => write!(f, "normal"),
            TemperatureStatus::High => write!(f, "high"),
            TemperatureStatus::Low => write!(f, "low"),
            TemperatureStatus::Critical => write!(f, "critical"),
        }
    }
}

impl TemperatureStatus {
    /// Classify a reading against a target: within 2°C is normal, within
    /// 5°C is high or low depending on direction, beyond that is critical.
    pub fn classify(reading: f64, target: f64) -> Self {
        let deviation = (reading - target).abs();
        if deviation <= 2.0 {
            TemperatureStatus::Normal
        } else if deviation <= 5.0 {
            if reading > target {
                TemperatureStatus::High
            } else {
                TemperatureStatus::Low
            }
        } else {
            TemperatureStatus::Critical
        }
    }
}

/// One sensor reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureLog {
    /// Unique identifier
    pub id: i64,

    /// Monitored intake, if the reading is tied to one
    pub intake_id: Option<i64>,

    /// Freezer location being monitored
    pub location_id: i64,

    /// Time of the reading
    pub recorded_at: DateTime<Utc>,

    /// Reading in Celsius
    pub temperature: f64,

    /// Sensor identifier
    pub sensor_ref: Option<String>,

    /// Classification against the intake's target
    pub status: TemperatureStatus,

    /// Owning company
    pub company_id: i64,
}

impl TemperatureLog {
    /// Validate the reading: plausible range, not recorded in the future.
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<()> {
        if !(-50.0..=50.0).contains(&self.temperature) {
            return Err(AppError::Validation(
                "temperature must be between -50°C and 50°C".into(),
            ));
        }
        if self.recorded_at > now {
            return Err(AppError::Validation(
                "temperature reading cannot be in the future".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            TemperatureStatus::classify(-17.0, -18.0),
            TemperatureStatus::Normal
        );
        assert_eq!(
            TemperatureStatus::classify(-14.0, -18.0),
            TemperatureStatus::High
        );
        assert_eq!(
            TemperatureStatus::classify(-22.0, -18.0),
            TemperatureStatus::Low
        );
        assert_eq!(
            TemperatureStatus::classify(-10.0, -18.0),
            TemperatureStatus::Critical
        );
    }

    #[test]
    fn test_validation() {
        let now = Utc::now();
        let mut log = TemperatureLog {
            id: 1,
            intake_id: None,
            location_id: 1,
            recorded_at: now,
            temperature: -18.0,
            sensor_ref: None,
            status: TemperatureStatus::Normal,
            company_id: 1,
        };
        assert!(log.validate(now).is_ok());

        log.temperature = -60.0;
        assert!(log.validate(now).is_err());

        log.temperature = -18.0;
        log.recorded_at = now + chrono::Duration::hours(1);
        assert!(log.validate(now).is_err());
    }
}
