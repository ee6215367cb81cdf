//! Billing run DTOs

use chrono::NaiveDate;
use coldstore_core::models::{InvoiceGrouping, RunCriteria};
use serde::Deserialize;
use validator::Validate;

/// Request to preview or execute a billing run
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BillingRunRequest {
    pub company_id: i64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,

    /// Select only intakes not yet billed into the window
    #[serde(default = "default_unbilled_only")]
    pub unbilled_only: bool,

    /// Restrict to these customers; empty means all
    #[serde(default)]
    pub customer_ids: Vec<i64>,

    /// Restrict to these contracts; empty means all
    #[serde(default)]
    pub contract_ids: Vec<i64>,

    #[serde(default)]
    pub grouping: InvoiceGrouping,

    /// Compute and report without creating invoices
    #[serde(default)]
    pub dry_run: bool,

    /// Eligible intakes the operator chose to leave out
    #[serde(default)]
    pub deselected_intake_ids: Vec<i64>,
}

fn default_unbilled_only() -> bool {
    true
}

impl BillingRunRequest {
    pub fn criteria(&self) -> RunCriteria {
        RunCriteria {
            company_id: self.company_id,
            date_from: self.date_from,
            date_to: self.date_to,
            unbilled_only: self.unbilled_only,
            customer_ids: self.customer_ids.clone(),
            contract_ids: self.contract_ids.clone(),
            grouping: self.grouping,
            dry_run: self.dry_run,
        }
    }
}

/// Request to reset billing watermarks
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkResetRequest {
    pub company_id: i64,
}
