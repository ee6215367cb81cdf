//! Tariff rule model
//!
//! A tariff rule is a pricing policy: a billing basis, a per-unit-per-day
//! rate, a duration rounding policy, and optional match filters. Rules are
//! evaluated in ascending sequence order; the first rule whose filters all
//! pass wins.

use crate::billing::to_decimal;
use crate::models::intake::StorageLine;
use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantity a storage charge is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingBasis {
    /// Per kg per day. Falls back to quantity-in when no weight is recorded.
    #[default]
    Weight,
    /// Per cubic meter per day. No fallback.
    Volume,
    /// Per pallet per day. No fallback.
    Pallet,
    /// Flat rate per day, independent of quantity.
    Flat,
}

impl fmt::Display for BillingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingBasis::Weight => write!(f, "kg/day"),
            BillingBasis::Volume => write!(f, "m3/day"),
            BillingBasis::Pallet => write!(f, "pallet/day"),
            BillingBasis::Flat => write!(f, "day"),
        }
    }
}

impl BillingBasis {
    /// Storage key, the inverse of [`BillingBasis::from_str`]. `Display`
    /// prints the unit label used in charge descriptions instead.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingBasis::Weight => "weight",
            BillingBasis::Volume => "volume",
            BillingBasis::Pallet => "pallet",
            BillingBasis::Flat => "flat",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "weight" => Some(BillingBasis::Weight),
            "volume" => Some(BillingBasis::Volume),
            "pallet" => Some(BillingBasis::Pallet),
            "flat" => Some(BillingBasis::Flat),
            _ => None,
        }
    }

    /// Resolve the billable quantity of a line under this basis.
    ///
    /// Weight-based billing falls back to quantity-in for goods checked in
    /// without a recorded weight; the other bases bill exactly what was
    /// captured.
    pub fn billable_qty(&self, line: &StorageLine) -> f64 {
        match self {
            BillingBasis::Weight => {
                if line.weight > 0.0 {
                    line.weight
                } else {
                    line.qty_in
                }
            }
            BillingBasis::Volume => line.volume,
            BillingBasis::Pallet => line.pallet_count,
            BillingBasis::Flat => 1.0,
        }
    }
}

/// Policy for turning an elapsed span into billable days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Ceiling to whole days, minimum one day
    #[default]
    CeilDay,
    /// Half day below one full day, one day from then on
    HalfUp,
    /// Exact elapsed days, rounded to 2 decimals, no floor
    ExactHours,
    /// Elapsed hours rounded up to the next even integer, converted to days
    TwoHourStep,
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingPolicy::CeilDay => write!(f, "ceil_day"),
            RoundingPolicy::HalfUp => write!(f, "half_up"),
            RoundingPolicy::ExactHours => write!(f, "exact_hours"),
            RoundingPolicy::TwoHourStep => write!(f, "2h_step"),
        }
    }
}

impl RoundingPolicy {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ceil_day" => Some(RoundingPolicy::CeilDay),
            "half_up" => Some(RoundingPolicy::HalfUp),
            "exact_hours" => Some(RoundingPolicy::ExactHours),
            "2h_step" => Some(RoundingPolicy::TwoHourStep),
            _ => None,
        }
    }

    /// Convert an elapsed span in hours into billable days under this policy.
    ///
    /// The result is non-negative and monotonically non-decreasing in
    /// `hours`. The caller applies the rule's minimum-billable-days floor on
    /// top of this.
    pub fn compute_duration_days(&self, hours: f64) -> f64 {
        let hours = hours.max(0.0);
        match self {
            RoundingPolicy::CeilDay => ((hours + 23.0) / 24.0).floor().max(1.0),
            RoundingPolicy::HalfUp => {
                // Only distinguishes half day vs full day; spans past one day
                // are not expanded further, min_bill_days is the only floor
                // beyond this.
                let days = hours / 24.0;
                if days >= 1.0 {
                    1.0
                } else {
                    0.5
                }
            }
            RoundingPolicy::ExactHours => (hours / 24.0 * 100.0).round() / 100.0,
            RoundingPolicy::TwoHourStep => (hours / 2.0).ceil() * 2.0 / 24.0,
        }
    }
}

/// Tariff rule entity
///
/// Pricing policy matched against stored goods. Filters are all optional;
/// an unset filter matches everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffRule {
    /// Unique identifier
    pub id: i64,

    /// Rule name, e.g. "Frozen per kg/day"
    pub name: String,

    /// Owning company
    pub company_id: i64,

    /// Inactive rules are never matched
    pub active: bool,

    /// Evaluation order; lower numbers are tried first
    pub sequence: i32,

    /// Billing basis the rate applies to
    pub basis: BillingBasis,

    /// Optional filter: specific product
    pub product_id: Option<i64>,

    /// Optional filter: product category
    pub category_id: Option<i64>,

    /// Optional filter: minimum target temperature (°C)
    pub min_temp: Option<f64>,

    /// Optional filter: maximum target temperature (°C)
    pub max_temp: Option<f64>,

    /// Optional filter: minimum quantity-in
    pub min_qty: Option<f64>,

    /// Rate per basis unit per day
    pub price_unit: Decimal,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Duration rounding policy
    pub rounding_policy: RoundingPolicy,

    /// Minimum number of days billed, applied after policy rounding
    pub min_bill_days: f64,

    /// Service product placed on invoices for this rule's charges
    pub service_product_id: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TariffRule {
    /// Validate rule-level constraints
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(min), Some(max)) = (self.min_temp, self.max_temp) {
            if min > max {
                return Err(AppError::Validation(
                    "minimum temperature cannot be greater than maximum temperature".into(),
                ));
            }
        }
        if let Some(min_qty) = self.min_qty {
            if min_qty < 0.0 {
                return Err(AppError::Validation(
                    "minimum quantity cannot be negative".into(),
                ));
            }
        }
        if self.min_bill_days < 0.0 {
            return Err(AppError::Validation(
                "minimum billable days cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Check whether this rule matches the given line.
    ///
    /// `temperature_target` is the owning intake's target temperature.
    pub fn matches(&self, line: &StorageLine, temperature_target: f64) -> bool {
        if let Some(product_id) = self.product_id {
            if line.product_id != product_id {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if line.product_category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(min_temp) = self.min_temp {
            if temperature_target < min_temp {
                return false;
            }
        }
        if let Some(max_temp) = self.max_temp {
            if temperature_target > max_temp {
                return false;
            }
        }
        if let Some(min_qty) = self.min_qty {
            if line.qty_in < min_qty {
                return false;
            }
        }
        true
    }

    /// Billable days for an elapsed span under this rule:
    /// policy rounding floored at `min_bill_days`.
    pub fn billable_days(&self, duration_hours: f64) -> f64 {
        self.rounding_policy
            .compute_duration_days(duration_hours)
            .max(self.min_bill_days)
    }

    /// Lifetime storage amount for a line under this rule.
    ///
    /// Returns the amount and the billable day count it was computed from.
    pub fn compute_amount(&self, line: &StorageLine, now: DateTime<Utc>) -> (Decimal, f64) {
        let basis = line.bill_basis.unwrap_or(self.basis);
        let rate = line.effective_rate(self.price_unit);
        let billable_qty = basis.billable_qty(line);
        let days = self.billable_days(line.duration_hours(now));
        let amount = rate * to_decimal(billable_qty) * to_decimal(days);
        (amount, days)
    }
}

/// Select the applicable rule for a line: first match wins over rules in
/// ascending sequence order. Inactive rules are skipped. Returns `None`
/// when nothing matches; the line then stays unpriced until a rule is
/// assigned manually.
pub fn match_rule<'a>(
    rules: &'a [TariffRule],
    line: &StorageLine,
    temperature_target: f64,
) -> Option<&'a TariffRule> {
    let mut ordered: Vec<&TariffRule> = rules.iter().filter(|r| r.active).collect();
    ordered.sort_by_key(|r| r.sequence);
    ordered
        .into_iter()
        .find(|rule| rule.matches(line, temperature_target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_rule() -> TariffRule {
        let now = Utc::now();
        TariffRule {
            id: 1,
            name: "Frozen per kg/day".to_string(),
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
            currency: "USD".to_string(),
            rounding_policy: RoundingPolicy::CeilDay,
            min_bill_days: 1.0,
            service_product_id: 100,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_line(qty_in: f64, weight: f64) -> StorageLine {
        StorageLine {
            qty_in,
            weight,
            ..StorageLine::new_for_test()
        }
    }

    #[test]
    fn test_ceil_day_rounding() {
        let policy = RoundingPolicy::CeilDay;
        assert_eq!(policy.compute_duration_days(25.0), 2.0);
        assert_eq!(policy.compute_duration_days(24.0), 1.0);
        assert_eq!(policy.compute_duration_days(0.5), 1.0);
        assert_eq!(policy.compute_duration_days(49.0), 3.0);
    }

    #[test]
    fn test_half_up_rounding() {
        let policy = RoundingPolicy::HalfUp;
        assert_eq!(policy.compute_duration_days(3.0), 0.5);
        assert_eq!(policy.compute_duration_days(20.0), 0.5);
        assert_eq!(policy.compute_duration_days(24.0), 1.0);
        // Multi-day spans are clamped at one day by this policy.
        assert_eq!(policy.compute_duration_days(72.0), 1.0);
    }

    #[test]
    fn test_exact_hours_rounding() {
        let policy = RoundingPolicy::ExactHours;
        assert_eq!(policy.compute_duration_days(36.0), 1.5);
        assert_eq!(policy.compute_duration_days(6.0), 0.25);
        // No floor: very short stays bill fractions of a day.
        assert!(policy.compute_duration_days(0.1) < 0.01);
    }

    #[test]
    fn test_two_hour_step_rounding() {
        let policy = RoundingPolicy::TwoHourStep;
        // 3 hours rounds up to 4 hours
        assert!((policy.compute_duration_days(3.0) - 4.0 / 24.0).abs() < 1e-9);
        // 30 minutes rounds up to 2 hours
        assert!((policy.compute_duration_days(0.5) - 2.0 / 24.0).abs() < 1e-9);
        assert!((policy.compute_duration_days(4.0) - 4.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_monotonicity_and_floor() {
        let policies = [
            RoundingPolicy::CeilDay,
            RoundingPolicy::HalfUp,
            RoundingPolicy::ExactHours,
            RoundingPolicy::TwoHourStep,
        ];
        for policy in policies {
            let rule = TariffRule {
                rounding_policy: policy,
                min_bill_days: 1.0,
                ..test_rule()
            };
            let mut prev = 0.0;
            for step in 0..200 {
                let hours = step as f64 * 1.7;
                let days = rule.billable_days(hours);
                assert!(days >= prev, "{policy} not monotone at {hours}h");
                assert!(days >= rule.min_bill_days);
                prev = days;
            }
        }
    }

    #[test]
    fn test_min_bill_days_floor() {
        let rule = TariffRule {
            rounding_policy: RoundingPolicy::ExactHours,
            min_bill_days: 2.0,
            ..test_rule()
        };
        assert_eq!(rule.billable_days(6.0), 2.0);
        assert_eq!(rule.billable_days(96.0), 4.0);
    }

    #[test]
    fn test_weight_basis_falls_back_to_qty() {
        let with_weight = test_line(10.0, 250.0);
        assert_eq!(BillingBasis::Weight.billable_qty(&with_weight), 250.0);

        let without_weight = test_line(10.0, 0.0);
        assert_eq!(BillingBasis::Weight.billable_qty(&without_weight), 10.0);
    }

    #[test]
    fn test_volume_and_pallet_have_no_fallback() {
        let line = test_line(10.0, 0.0);
        assert_eq!(BillingBasis::Volume.billable_qty(&line), 0.0);
        assert_eq!(BillingBasis::Pallet.billable_qty(&line), 0.0);
        assert_eq!(BillingBasis::Flat.billable_qty(&line), 1.0);
    }

    #[test]
    fn test_matcher_first_match_wins_on_sequence() {
        let general = TariffRule {
            id: 2,
            sequence: 10,
            ..test_rule()
        };
        let preferred = TariffRule {
            id: 3,
            sequence: 5,
            ..test_rule()
        };
        // Order in the slice must not matter, only the sequence.
        let rules = vec![general, preferred];
        let line = test_line(100.0, 500.0);
        let matched = match_rule(&rules, &line, -18.0).unwrap();
        assert_eq!(matched.id, 3);
    }

    #[test]
    fn test_matcher_filters() {
        let rules = vec![
            TariffRule {
                id: 1,
                sequence: 1,
                product_id: Some(77),
                ..test_rule()
            },
            TariffRule {
                id: 2,
                sequence: 2,
                min_temp: Some(-25.0),
                max_temp: Some(-10.0),
                ..test_rule()
            },
            TariffRule {
                id: 3,
                sequence: 3,
                min_qty: Some(1000.0),
                ..test_rule()
            },
        ];

        let line = test_line(100.0, 500.0);
        // Product filter misses (line product is 0), temperature matches rule 2.
        assert_eq!(match_rule(&rules, &line, -18.0).unwrap().id, 2);
        // Too warm for rule 2, too little quantity for rule 3.
        assert!(match_rule(&rules, &line, 5.0).is_none());

        let bulk = test_line(2000.0, 0.0);
        assert_eq!(match_rule(&rules, &bulk, 5.0).unwrap().id, 3);
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let rules = vec![TariffRule {
            active: false,
            ..test_rule()
        }];
        let line = test_line(10.0, 10.0);
        assert!(match_rule(&rules, &line, -18.0).is_none());
    }

    #[test]
    fn test_compute_amount_weight_basis() {
        let rule = test_rule();
        let now = Utc::now();
        let mut line = test_line(100.0, 100.0);
        line.checked_in_at = now - chrono::Duration::hours(25);

        // 25h ceil -> 2 days, 100kg at 2.00/kg/day
        let (amount, days) = rule.compute_amount(&line, now);
        assert_eq!(days, 2.0);
        assert_eq!(amount, dec!(400.00));
    }

    #[test]
    fn test_validate_temperature_range() {
        let rule = TariffRule {
            min_temp: Some(0.0),
            max_temp: Some(-10.0),
            ..test_rule()
        };
        assert!(rule.validate().is_err());
    }
}
