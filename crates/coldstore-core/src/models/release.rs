//! Release model
//!
//! A release takes some or all of an intake's goods out of storage. The
//! charge for a partial release is the stored line's lifetime subtotal
//! pro-rated by the released share of the quantity.

use crate::billing::to_decimal;
use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Release lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    #[default]
    Draft,
    Done,
    Cancelled,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseState::Draft => write!(f, "draft"),
            ReleaseState::Done => write!(f, "done"),
            ReleaseState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl ReleaseState {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ReleaseState::Draft),
            "done" => Some(ReleaseState::Done),
            "cancelled" => Some(ReleaseState::Cancelled),
            _ => None,
        }
    }
}

/// One intake line's share of a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseLine {
    /// Unique identifier
    pub id: i64,

    /// Owning release
    pub release_id: i64,

    /// Storage line the quantity comes off of
    pub storage_line_id: i64,

    /// Product, captured from the storage line
    pub product_id: i64,

    /// Lot, captured from the storage line
    pub lot: Option<String>,

    /// Quantity taken out by this release
    pub qty_out: f64,

    /// Pro-rated storage charge for this release's share
    pub amount: Decimal,
}

impl ReleaseLine {
    /// Validate against the availability on the storage line it draws from.
    pub fn validate(&self, line_qty_in: f64, line_qty_out: f64) -> AppResult<()> {
        if self.qty_out <= 0.0 {
            return Err(AppError::Validation(
                "release quantity must be positive".into(),
            ));
        }
        let available = line_qty_in - line_qty_out;
        if self.qty_out > available {
            return Err(AppError::Validation(format!(
                "cannot release more than available quantity ({available})"
            )));
        }
        Ok(())
    }
}

/// Release document: one take-out event against one intake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Unique identifier
    pub id: i64,

    /// Document number from the sequencer
    pub number: String,

    /// Intake the goods come from
    pub intake_id: i64,

    /// Customer, captured from the intake
    pub customer_id: i64,

    /// Owning company
    pub company_id: i64,

    /// Release time
    pub released_at: DateTime<Utc>,

    /// Lifecycle state
    pub state: ReleaseState,

    /// Currency code, captured from the intake
    pub currency: String,

    /// Gate-out entry created when the release was validated
    pub gate_entry_id: Option<i64>,

    /// Vehicle registration, from the gate entry
    pub vehicle_number: Option<String>,

    /// Driver name, from the gate entry
    pub driver_name: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Release {
    /// Transition draft -> done. Callers move stock and update the intake
    /// before flipping the state.
    pub fn mark_done(&mut self) -> AppResult<()> {
        if self.state != ReleaseState::Draft {
            return Err(AppError::invalid_state("release", "draft", self.state));
        }
        self.state = ReleaseState::Done;
        Ok(())
    }

    /// Cancel a draft release. Validated releases cannot be cancelled.
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.state == ReleaseState::Done {
            return Err(AppError::invalid_state("release", "draft", self.state));
        }
        self.state = ReleaseState::Cancelled;
        Ok(())
    }
}

/// Pro-rated storage charge for releasing `qty_released` out of a line that
/// checked in `qty_in` units and accumulated `subtotal` in lifetime charges.
/// A zero or negative quantity-in yields zero rather than dividing by it.
pub fn prorated_release_amount(subtotal: Decimal, qty_in: f64, qty_released: f64) -> Decimal {
    if qty_in <= 0.0 {
        return Decimal::ZERO;
    }
    subtotal * to_decimal(qty_released) / to_decimal(qty_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prorated_amount() {
        // Releasing 40 of 100 units takes 40% of the lifetime charge.
        assert_eq!(
            prorated_release_amount(dec!(500.00), 100.0, 40.0),
            dec!(200.00)
        );
        // Full release takes the whole charge.
        assert_eq!(
            prorated_release_amount(dec!(500.00), 100.0, 100.0),
            dec!(500.00)
        );
    }

    #[test]
    fn test_prorated_amount_zero_qty_in() {
        assert_eq!(prorated_release_amount(dec!(500.00), 0.0, 10.0), Decimal::ZERO);
        assert_eq!(
            prorated_release_amount(dec!(500.00), -1.0, 10.0),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_release_line_availability() {
        let line = ReleaseLine {
            id: 1,
            release_id: 1,
            storage_line_id: 1,
            product_id: 1,
            lot: None,
            qty_out: 30.0,
            amount: Decimal::ZERO,
        };
        // 100 in, 80 already out, only 20 available.
        assert!(line.validate(100.0, 80.0).is_err());
        assert!(line.validate(100.0, 50.0).is_ok());

        let zero = ReleaseLine { qty_out: 0.0, ..line };
        assert!(zero.validate(100.0, 0.0).is_err());
    }

    #[test]
    fn test_release_state_transitions() {
        let now = Utc::now();
        let mut release = Release {
            id: 1,
            number: "REL-0001".into(),
            intake_id: 1,
            customer_id: 1,
            company_id: 1,
            released_at: now,
            state: ReleaseState::Draft,
            currency: "USD".into(),
            gate_entry_id: None,
            vehicle_number: None,
            driver_name: None,
            created_at: now,
            updated_at: now,
        };

        assert!(release.mark_done().is_ok());
        assert!(release.mark_done().is_err());
        // Done releases cannot be cancelled.
        assert!(release.cancel().is_err());

        release.state = ReleaseState::Draft;
        assert!(release.cancel().is_ok());
        assert_eq!(release.state, ReleaseState::Cancelled);
    }
}
