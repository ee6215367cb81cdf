//! Billing run types
//!
//! The working set of a period billing run: the selection criteria, the
//! per-intake preview lines, and the outcome reported back to the operator.

use crate::{AppError, AppResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How period amounts are rolled into invoice documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceGrouping {
    /// One invoice per customer covering all their intakes
    #[default]
    PerCustomer,
    /// One invoice per intake
    PerIntake,
}

/// Selection criteria for a billing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCriteria {
    /// Company to bill for
    pub company_id: i64,

    /// Window start
    pub date_from: NaiveDate,

    /// Window end, billed through end-of-day
    pub date_to: NaiveDate,

    /// When set, select only intakes not yet billed into the window;
    /// otherwise select everything checked in within the window
    pub unbilled_only: bool,

    /// Restrict to these customers; empty means all
    pub customer_ids: Vec<i64>,

    /// Restrict to these contracts; empty means all
    pub contract_ids: Vec<i64>,

    /// Invoice document shape
    pub grouping: InvoiceGrouping,

    /// Compute and report without creating invoices or moving watermarks
    pub dry_run: bool,
}

impl RunCriteria {
    /// Validate the window
    pub fn validate(&self) -> AppResult<()> {
        if self.date_from > self.date_to {
            return Err(AppError::Validation(
                "from date cannot be after to date".into(),
            ));
        }
        Ok(())
    }
}

/// Repository query derived from run criteria
#[derive(Debug, Clone)]
pub struct EligibilityQuery {
    pub company_id: i64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub unbilled_only: bool,
    pub customer_ids: Vec<i64>,
    pub contract_ids: Vec<i64>,
}

impl From<&RunCriteria> for EligibilityQuery {
    fn from(criteria: &RunCriteria) -> Self {
        Self {
            company_id: criteria.company_id,
            date_from: criteria.date_from,
            date_to: criteria.date_to,
            unbilled_only: criteria.unbilled_only,
            customer_ids: criteria.customer_ids.clone(),
            contract_ids: criteria.contract_ids.clone(),
        }
    }
}

/// One intake's row in a run preview
#[derive(Debug, Clone, Serialize)]
pub struct BillingPreviewLine {
    pub intake_id: i64,
    pub intake_number: String,
    pub customer_id: i64,

    /// Days elapsed since check-in
    pub total_days: f64,

    /// Days already covered by the watermark
    pub billed_days: f64,

    /// Days this run would bill
    pub pending_days: f64,

    /// Amount this run would invoice for the intake
    pub period_amount: Decimal,

    /// Whether the operator kept the intake in the run
    pub selected: bool,
}

/// Reference to an invoice created by a collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceHandle {
    pub id: i64,
    pub number: String,
}

/// A customer group that failed during a run. Failures do not stop the
/// remaining groups from being billed.
#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    pub customer_id: i64,
    pub reason: String,
}

/// Result of a billing run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Identifier assigned to this run, for log correlation
    pub run_id: Uuid,

    /// Invoices created (empty for a dry run)
    pub invoices: Vec<InvoiceHandle>,

    /// Total amount across all groups, including failed ones
    pub total_amount: Decimal,

    /// Per-intake breakdown
    pub lines: Vec<BillingPreviewLine>,

    /// Customer groups that failed
    pub failures: Vec<RunFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_validation() {
        let criteria = RunCriteria {
            company_id: 1,
            date_from: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            unbilled_only: true,
            customer_ids: vec![],
            contract_ids: vec![],
            grouping: InvoiceGrouping::PerCustomer,
            dry_run: false,
        };
        assert!(criteria.validate().is_err());
    }
}
