//! Period-scoped billing
//!
//! Computes the portion of a long-running storage charge attributable to a
//! single billing window. An intake carries a `last_billed_date` watermark;
//! each run bills from the day after the watermark (or from check-in for a
//! never-billed intake) up to the end of the window, then advances the
//! watermark to the window end. The watermark day itself is billed through
//! end-of-day, so the next run starts on the following calendar day and no
//! day is ever counted twice.

use crate::billing::to_decimal;
use crate::models::intake::{Intake, StorageLine};
use crate::models::tariff::TariffRule;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// A storage line paired with its matched tariff rule, if any
#[derive(Debug, Clone, Copy)]
pub struct PricedLine<'a> {
    pub line: &'a StorageLine,
    pub rule: Option<&'a TariffRule>,
}

/// Per-service-product share of a period charge
#[derive(Debug, Clone, Serialize)]
pub struct PeriodItem {
    /// Service product invoiced for this share
    pub service_product_id: i64,
    pub amount: Decimal,
}

/// Result of pricing one intake over one billing window
#[derive(Debug, Clone, Serialize)]
pub struct PeriodCharge {
    /// Total amount attributable to the window
    pub amount: Decimal,
    /// Priced span in fractional days
    pub period_days: f64,
    /// Precise start of the priced span
    pub period_start: DateTime<Utc>,
    /// Precise end of the priced span (end-of-day on the window end)
    pub period_end: DateTime<Utc>,
    /// Amounts grouped by service product, in product id order
    pub items: Vec<PeriodItem>,
}

impl PeriodCharge {
    fn zero(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            amount: Decimal::ZERO,
            period_days: 0.0,
            period_start,
            period_end,
            items: Vec::new(),
        }
    }
}

/// Day counters shown on a billing preview line
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DaysBreakdown {
    /// Days elapsed since check-in
    pub total_days: f64,
    /// Days already covered by the watermark
    pub billed_days: f64,
    /// Days a run over the given window would bill
    pub pending_days: f64,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(last))
}

/// First day not yet covered by the watermark: the day after
/// `last_billed_date`, or the check-in date for a never-billed intake.
fn billing_start(intake: &Intake) -> NaiveDate {
    match intake.last_billed_date {
        Some(watermark) => watermark.succ_opt().unwrap_or(NaiveDate::MAX),
        None => intake.checked_in_at.date_naive(),
    }
}

fn seconds_to_days(seconds: i64) -> f64 {
    seconds.max(0) as f64 / 86_400.0
}

/// Price one intake over the window `[date_from, date_to]`.
///
/// The effective span starts at the later of the window start and the first
/// unbilled day. When that span starts on the check-in date itself, the
/// exact check-in timestamp is used so the very first billing keeps sub-day
/// precision; later periods start at midnight. The window end is always
/// billed through end-of-day.
///
/// Lines without a matched rule contribute nothing. Each line's duration is
/// floored at its rule's `min_bill_days`; the floor applies per run, so a
/// daily run under a one-day minimum charges at least one day every time.
/// Rounding policies do not apply here, the span is already day-exact.
pub fn compute_period_charge(
    intake: &Intake,
    lines: &[PricedLine<'_>],
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> PeriodCharge {
    let effective_start = date_from.max(billing_start(intake));
    let period_end = end_of_day(date_to);

    if effective_start > date_to {
        return PeriodCharge::zero(start_of_day(effective_start), period_end);
    }

    let period_start = if effective_start == intake.checked_in_at.date_naive() {
        intake.checked_in_at
    } else {
        start_of_day(effective_start)
    };

    let period_days = seconds_to_days((period_end - period_start).num_seconds());
    if period_days <= 0.0 {
        return PeriodCharge::zero(period_start, period_end);
    }

    let mut total = Decimal::ZERO;
    let mut by_product: BTreeMap<i64, Decimal> = BTreeMap::new();

    for priced in lines {
        let rule = match priced.rule {
            Some(rule) => rule,
            None => continue,
        };
        let line = priced.line;
        let basis = line.bill_basis.unwrap_or(rule.basis);
        let rate = line.effective_rate(rule.price_unit);
        let qty = basis.billable_qty(line);
        let effective_days = period_days.max(rule.min_bill_days);
        let amount = rate * to_decimal(qty) * to_decimal(effective_days);
        total += amount;
        *by_product.entry(rule.service_product_id).or_default() += amount;
    }

    PeriodCharge {
        amount: total,
        period_days,
        period_start,
        period_end,
        items: by_product
            .into_iter()
            .map(|(service_product_id, amount)| PeriodItem {
                service_product_id,
                amount,
            })
            .collect(),
    }
}

/// Day counters for a preview line: elapsed, already billed, and pending
/// under the window `[date_from, date_to]`.
pub fn compute_days_breakdown(
    intake: &Intake,
    date_from: NaiveDate,
    date_to: NaiveDate,
    now: DateTime<Utc>,
) -> DaysBreakdown {
    let total_days = seconds_to_days((now - intake.checked_in_at).num_seconds());

    let billed_days = match intake.last_billed_date {
        Some(watermark) => {
            seconds_to_days((end_of_day(watermark) - intake.checked_in_at).num_seconds())
        }
        None => 0.0,
    };

    let effective_start = date_from.max(billing_start(intake));
    let pending_days = if effective_start > date_to {
        0.0
    } else {
        let pending_start = if effective_start == intake.checked_in_at.date_naive() {
            intake.checked_in_at
        } else {
            start_of_day(effective_start)
        };
        seconds_to_days((end_of_day(date_to) - pending_start).num_seconds())
    };

    DaysBreakdown {
        total_days,
        billed_days,
        pending_days,
    }
}
