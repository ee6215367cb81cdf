//! Intake and storage line models
//!
//! An intake is a check-in event for one customer at one freezer location,
//! owning one or more storage lines. Line subtotals are pure derivations
//! from rule + quantities + duration; they are recomputed on demand, never
//! hand-edited.

use crate::billing::to_decimal;
use crate::models::tariff::{BillingBasis, TariffRule};
use crate::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intake lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    /// Being captured, not yet in storage
    #[default]
    Draft,
    /// Goods received and in storage
    CheckedIn,
    /// Some quantity released, some still stored
    PartiallyOut,
    /// Everything released
    Closed,
    /// Aborted before closing
    Cancelled,
}

impl fmt::Display for IntakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeState::Draft => write!(f, "draft"),
            IntakeState::CheckedIn => write!(f, "checked_in"),
            IntakeState::PartiallyOut => write!(f, "partially_out"),
            IntakeState::Closed => write!(f, "closed"),
            IntakeState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl IntakeState {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(IntakeState::Draft),
            "checked_in" => Some(IntakeState::CheckedIn),
            "partially_out" => Some(IntakeState::PartiallyOut),
            "closed" => Some(IntakeState::Closed),
            "cancelled" => Some(IntakeState::Cancelled),
            _ => None,
        }
    }

    /// States in which the goods are (at least partly) in storage and billable
    pub fn is_active(&self) -> bool {
        matches!(self, IntakeState::CheckedIn | IntakeState::PartiallyOut)
    }
}

/// One stored batch of a product within an intake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLine {
    /// Unique identifier
    pub id: i64,

    /// Owning intake
    pub intake_id: i64,

    /// Product being stored
    pub product_id: i64,

    /// Product category, captured for tariff matching
    pub product_category_id: Option<i64>,

    /// Lot/batch number for perishables
    pub lot: Option<String>,

    /// Quantity received
    pub qty_in: f64,

    /// Quantity released so far (cumulative, <= qty_in)
    pub qty_out: f64,

    /// Unit of measure for the quantities
    pub uom: String,

    /// Weight in kilograms
    pub weight: f64,

    /// Volume in cubic meters
    pub volume: f64,

    /// Number of pallets
    pub pallet_count: f64,

    /// Check-in time for this line
    pub checked_in_at: DateTime<Utc>,

    /// Release time, set when the line is fully released
    pub released_at: Option<DateTime<Utc>>,

    /// Matched tariff rule (advisory; the caller may override)
    pub tariff_rule_id: Option<i64>,

    /// Price per basis unit per day, snapshotted from the rule on assignment
    pub price_unit: Decimal,

    /// Billing basis override for this line
    pub bill_basis: Option<BillingBasis>,

    /// Computed lifetime storage amount (derived, never hand-edited)
    pub subtotal: Decimal,

    /// Damage/wastage/notes
    pub remark: Option<String>,
}

impl StorageLine {
    /// Validate line-level invariants
    pub fn validate(&self) -> AppResult<()> {
        if self.qty_in <= 0.0 {
            return Err(AppError::Validation("quantity in must be positive".into()));
        }
        if self.qty_out > self.qty_in {
            return Err(AppError::Validation(
                "quantity out cannot exceed quantity in".into(),
            ));
        }
        if self.weight < 0.0 {
            return Err(AppError::Validation("weight cannot be negative".into()));
        }
        if self.volume < 0.0 {
            return Err(AppError::Validation("volume cannot be negative".into()));
        }
        Ok(())
    }

    /// Quantity still in storage
    #[inline]
    pub fn qty_available(&self) -> f64 {
        self.qty_in - self.qty_out
    }

    /// Whether everything on this line has been released
    #[inline]
    pub fn is_fully_released(&self) -> bool {
        self.qty_out >= self.qty_in
    }

    /// Elapsed storage span in hours, from check-in to release-or-now.
    ///
    /// Once the line is fully released the span is frozen at the release
    /// timestamp.
    pub fn duration_hours(&self, now: DateTime<Utc>) -> f64 {
        let end = self.released_at.unwrap_or(now);
        let seconds = (end - self.checked_in_at).num_seconds();
        seconds.max(0) as f64 / 3600.0
    }

    /// Rate used for charging: the line's snapshot when set, otherwise the
    /// supplied rule default.
    pub fn effective_rate(&self, rule_rate: Decimal) -> Decimal {
        if self.price_unit.is_zero() {
            rule_rate
        } else {
            self.price_unit
        }
    }

    /// Assign a tariff rule, snapshotting its rate and basis onto the line.
    pub fn assign_rule(&mut self, rule: &TariffRule) {
        self.tariff_rule_id = Some(rule.id);
        self.price_unit = rule.price_unit;
        self.bill_basis = Some(rule.basis);
    }

    /// Recompute the lifetime subtotal from the matched rule, quantities and
    /// duration. Pure and idempotent: calling it twice with the same inputs
    /// yields the same value. Lines without a rule stay at zero.
    pub fn recompute_subtotal(&mut self, rule: Option<&TariffRule>, now: DateTime<Utc>) {
        self.subtotal = compute_line_subtotal(self, rule, now);
    }
}

/// Lifetime storage amount of a line: rate x billable quantity x billable
/// days under the matched rule. Zero when no rule is assigned.
pub fn compute_line_subtotal(
    line: &StorageLine,
    rule: Option<&TariffRule>,
    now: DateTime<Utc>,
) -> Decimal {
    match rule {
        Some(rule) => rule.compute_amount(line, now).0,
        None => Decimal::ZERO,
    }
}

/// Aggregated figures over an intake's lines
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IntakeTotals {
    pub qty_in: f64,
    pub qty_out: f64,
    pub weight: f64,
    pub volume: f64,
    pub amount: Decimal,
}

/// Intake entity: one check-in event for one customer at one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intake {
    /// Unique identifier
    pub id: i64,

    /// Document number from the sequencer
    pub number: String,

    /// Customer who owns the goods
    pub customer_id: i64,

    /// Freezer location where goods are stored
    pub location_id: i64,

    /// Related storage contract, if any
    pub contract_id: Option<i64>,

    /// Owning company
    pub company_id: i64,

    /// Check-in time
    pub checked_in_at: DateTime<Utc>,

    /// Expected release date (optional)
    pub planned_out: Option<DateTime<Utc>>,

    /// Target storage temperature (°C)
    pub temperature_target: f64,

    /// Lifecycle state
    pub state: IntakeState,

    /// Last date through which this intake has been billed by a period run
    pub last_billed_date: Option<NaiveDate>,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Free-form notes
    pub note: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Intake {
    /// Whether the intake can be selected by a billing run
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Transition draft -> checked in
    pub fn check_in(&mut self) -> AppResult<()> {
        if self.state != IntakeState::Draft {
            return Err(AppError::invalid_state("intake", "draft", self.state));
        }
        self.state = IntakeState::CheckedIn;
        Ok(())
    }

    /// Mark that some quantity has left storage
    pub fn mark_partially_out(&mut self) -> AppResult<()> {
        match self.state {
            IntakeState::CheckedIn | IntakeState::PartiallyOut => {
                self.state = IntakeState::PartiallyOut;
                Ok(())
            }
            other => Err(AppError::invalid_state(
                "intake",
                "checked_in or partially_out",
                other,
            )),
        }
    }

    /// Close the intake once every line is fully released
    pub fn close(&mut self, lines: &[StorageLine]) -> AppResult<()> {
        if !self.state.is_active() {
            return Err(AppError::invalid_state(
                "intake",
                "checked_in or partially_out",
                self.state,
            ));
        }
        if lines.iter().any(|l| !l.is_fully_released()) {
            return Err(AppError::Validation(
                "cannot close intake with unreleased items".into(),
            ));
        }
        self.state = IntakeState::Closed;
        Ok(())
    }

    /// Cancel the intake. Permitted from any state except closed.
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.state == IntakeState::Closed {
            return Err(AppError::invalid_state(
                "intake",
                "draft, checked_in or partially_out",
                self.state,
            ));
        }
        self.state = IntakeState::Cancelled;
        Ok(())
    }

    /// Aggregate totals over the intake's lines.
    ///
    /// Explicit on-demand aggregation; nothing is cached on the intake.
    pub fn totals(lines: &[StorageLine]) -> IntakeTotals {
        let mut totals = IntakeTotals::default();
        for line in lines {
            totals.qty_in += line.qty_in;
            totals.qty_out += line.qty_out;
            totals.weight += line.weight;
            totals.volume += line.volume;
            totals.amount += line.subtotal;
        }
        totals
    }
}

// Test fixtures shared by unit tests across the crate.
#[cfg(test)]
impl StorageLine {
    pub(crate) fn new_for_test() -> Self {
        Self {
            id: 1,
            intake_id: 1,
            product_id: 0,
            product_category_id: None,
            lot: None,
            qty_in: 1.0,
            qty_out: 0.0,
            uom: "kg".to_string(),
            weight: 0.0,
            volume: 0.0,
            pallet_count: 0.0,
            checked_in_at: Utc::now(),
            released_at: None,
            tariff_rule_id: None,
            price_unit: Decimal::ZERO,
            bill_basis: None,
            subtotal: Decimal::ZERO,
            remark: None,
        }
    }
}

#[cfg(test)]
impl Intake {
    pub(crate) fn new_for_test() -> Self {
        let now = Utc::now();
        Self {
            id: 1,
            number: "INT-0001".to_string(),
            customer_id: 1,
            location_id: 1,
            contract_id: None,
            company_id: 1,
            checked_in_at: now,
            planned_out: None,
            temperature_target: -18.0,
            state: IntakeState::Draft,
            last_billed_date: None,
            currency: "USD".to_string(),
            note: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tariff::RoundingPolicy;
    use rust_decimal_macros::dec;

    fn rule_2_per_kg_day() -> TariffRule {
        let now = Utc::now();
        TariffRule {
            id: 9,
            name: "test".into(),
            company_id: 1,
            active: true,
            sequence: 10,
            basis: BillingBasis::Weight,
            product_id: None,
            category_id: None,
            min_temp: None,
            max_temp: None,
            min_qty: None,
            price_unit: dec!(2.00),
            currency: "USD".into(),
            rounding_policy: RoundingPolicy::CeilDay,
            min_bill_days: 1.0,
            service_product_id: 100,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_line_validation() {
        let mut line = StorageLine::new_for_test();
        assert!(line.validate().is_ok());

        line.qty_out = 2.0;
        assert!(line.validate().is_err());

        line.qty_out = 0.0;
        line.qty_in = 0.0;
        assert!(line.validate().is_err());

        line.qty_in = 1.0;
        line.weight = -1.0;
        assert!(line.validate().is_err());
    }

    #[test]
    fn test_subtotal_is_pure_and_idempotent() {
        let rule = rule_2_per_kg_day();
        let now = Utc::now();
        let mut line = StorageLine::new_for_test();
        line.weight = 100.0;
        line.checked_in_at = now - chrono::Duration::hours(30);

        line.recompute_subtotal(Some(&rule), now);
        let first = line.subtotal;
        line.recompute_subtotal(Some(&rule), now);
        assert_eq!(line.subtotal, first);
        // 30h ceil -> 2 days x 100kg x 2.00
        assert_eq!(first, dec!(400.00));
    }

    #[test]
    fn test_subtotal_frozen_after_full_release() {
        let rule = rule_2_per_kg_day();
        let now = Utc::now();
        let mut line = StorageLine::new_for_test();
        line.weight = 50.0;
        line.checked_in_at = now - chrono::Duration::hours(48);
        line.released_at = Some(now - chrono::Duration::hours(24));

        line.recompute_subtotal(Some(&rule), now);
        let frozen = line.subtotal;
        // A day later the amount must not have grown.
        line.recompute_subtotal(Some(&rule), now + chrono::Duration::hours(24));
        assert_eq!(line.subtotal, frozen);
    }

    #[test]
    fn test_unpriced_line_stays_zero() {
        let now = Utc::now();
        let mut line = StorageLine::new_for_test();
        line.weight = 100.0;
        line.recompute_subtotal(None, now);
        assert_eq!(line.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_state_transitions() {
        let mut intake = Intake::new_for_test();
        assert!(intake.check_in().is_ok());
        assert_eq!(intake.state, IntakeState::CheckedIn);
        // Checking in twice is a state error.
        assert!(intake.check_in().is_err());

        assert!(intake.mark_partially_out().is_ok());
        assert_eq!(intake.state, IntakeState::PartiallyOut);
    }

    #[test]
    fn test_close_requires_everything_released() {
        let mut intake = Intake::new_for_test();
        intake.state = IntakeState::PartiallyOut;

        let mut line = StorageLine::new_for_test();
        line.qty_in = 10.0;
        line.qty_out = 4.0;
        assert!(intake.close(std::slice::from_ref(&line)).is_err());

        line.qty_out = 10.0;
        assert!(intake.close(std::slice::from_ref(&line)).is_ok());
        assert_eq!(intake.state, IntakeState::Closed);
    }

    #[test]
    fn test_cancel_forbidden_after_close() {
        let mut intake = Intake::new_for_test();
        intake.state = IntakeState::Closed;
        assert!(intake.cancel().is_err());

        intake.state = IntakeState::CheckedIn;
        assert!(intake.cancel().is_ok());
        assert_eq!(intake.state, IntakeState::Cancelled);
    }

    #[test]
    fn test_totals_aggregation() {
        let mut a = StorageLine::new_for_test();
        a.qty_in = 10.0;
        a.qty_out = 2.0;
        a.weight = 100.0;
        a.subtotal = dec!(50.00);
        let mut b = StorageLine::new_for_test();
        b.qty_in = 5.0;
        b.volume = 3.0;
        b.subtotal = dec!(25.50);

        let totals = Intake::totals(&[a, b]);
        assert_eq!(totals.qty_in, 15.0);
        assert_eq!(totals.qty_out, 2.0);
        assert_eq!(totals.weight, 100.0);
        assert_eq!(totals.volume, 3.0);
        assert_eq!(totals.amount, dec!(75.50));
    }
}
