//! Storage contract model
//!
//! A contract binds a customer to a pricing model and a billing cycle. The
//! scheduled sweep picks up active contracts whose next invoice date has
//! passed and bills their intakes.

use crate::{AppError, AppResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a contract is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Customer buys storage credit up front
    PrePaid,
    /// Charges are invoiced after the fact
    #[default]
    PostPaid,
    /// Fixed fee for a reserved capacity
    Capacity,
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingModel::PrePaid => write!(f, "pre_paid"),
            PricingModel::PostPaid => write!(f, "post_paid"),
            PricingModel::Capacity => write!(f, "capacity"),
        }
    }
}

impl PricingModel {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pre_paid" => Some(PricingModel::PrePaid),
            "post_paid" => Some(PricingModel::PostPaid),
            "capacity" => Some(PricingModel::Capacity),
            _ => None,
        }
    }
}

/// How often the contract is invoiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceCycle {
    #[default]
    Monthly,
    Weekly,
    /// Only invoiced when an operator triggers it
    Manual,
}

impl fmt::Display for InvoiceCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceCycle::Monthly => write!(f, "monthly"),
            InvoiceCycle::Weekly => write!(f, "weekly"),
            InvoiceCycle::Manual => write!(f, "manual"),
        }
    }
}

impl InvoiceCycle {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(InvoiceCycle::Monthly),
            "weekly" => Some(InvoiceCycle::Weekly),
            "manual" => Some(InvoiceCycle::Manual),
            _ => None,
        }
    }

    /// Next scheduled invoice date after `from`. Manual contracts are never
    /// scheduled, so the date does not move.
    pub fn next_invoice_date_after(&self, from: NaiveDate) -> NaiveDate {
        match self {
            InvoiceCycle::Monthly => from + Duration::days(30),
            InvoiceCycle::Weekly => from + Duration::days(7),
            InvoiceCycle::Manual => from,
        }
    }

    /// Start of the billing window that ends on `date_to`.
    pub fn cycle_window_start(&self, date_to: NaiveDate) -> NaiveDate {
        match self {
            InvoiceCycle::Monthly | InvoiceCycle::Manual => date_to - Duration::days(30),
            InvoiceCycle::Weekly => date_to - Duration::days(7),
        }
    }
}

/// Contract lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    #[default]
    Draft,
    Active,
    Suspended,
    Closed,
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractState::Draft => write!(f, "draft"),
            ContractState::Active => write!(f, "active"),
            ContractState::Suspended => write!(f, "suspended"),
            ContractState::Closed => write!(f, "closed"),
        }
    }
}

impl ContractState {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ContractState::Draft),
            "active" => Some(ContractState::Active),
            "suspended" => Some(ContractState::Suspended),
            "closed" => Some(ContractState::Closed),
            _ => None,
        }
    }
}

/// Storage contract entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageContract {
    /// Unique identifier
    pub id: i64,

    /// Document number from the sequencer
    pub number: String,

    /// Contract customer
    pub customer_id: i64,

    /// Owning company
    pub company_id: i64,

    /// Pricing model
    pub pricing_model: PricingModel,

    /// Default tariff rule suggested for this contract's intakes
    pub tariff_rule_id: Option<i64>,

    /// Storage credit for pre-paid contracts
    pub credit_limit: Decimal,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Billing cycle
    pub invoice_cycle: InvoiceCycle,

    /// Next scheduled invoice date; the sweep bills contracts whose date
    /// has passed
    pub next_invoice_date: Option<NaiveDate>,

    /// Lifecycle state
    pub state: ContractState,

    /// Contract start date
    pub date_start: NaiveDate,

    /// Contract end date; open-ended when unset
    pub date_end: Option<NaiveDate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl StorageContract {
    /// Validate contract-level constraints
    pub fn validate(&self) -> AppResult<()> {
        if let Some(date_end) = self.date_end {
            if date_end < self.date_start {
                return Err(AppError::Validation(
                    "end date cannot be before start date".into(),
                ));
            }
        }
        if self.pricing_model == PricingModel::PrePaid && self.credit_limit <= Decimal::ZERO {
            return Err(AppError::Validation(
                "pre-paid contracts must have a positive credit limit".into(),
            ));
        }
        Ok(())
    }

    /// Transition draft -> active
    pub fn activate(&mut self) -> AppResult<()> {
        if self.state != ContractState::Draft {
            return Err(AppError::invalid_state("contract", "draft", self.state));
        }
        self.state = ContractState::Active;
        Ok(())
    }

    /// Transition active -> suspended
    pub fn suspend(&mut self) -> AppResult<()> {
        if self.state != ContractState::Active {
            return Err(AppError::invalid_state("contract", "active", self.state));
        }
        self.state = ContractState::Suspended;
        Ok(())
    }

    /// Close from active or suspended
    pub fn close(&mut self) -> AppResult<()> {
        if !matches!(self.state, ContractState::Active | ContractState::Suspended) {
            return Err(AppError::invalid_state(
                "contract",
                "active or suspended",
                self.state,
            ));
        }
        self.state = ContractState::Closed;
        Ok(())
    }

    /// Whether the scheduled sweep should bill this contract today
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.state == ContractState::Active
            && self.invoice_cycle != InvoiceCycle::Manual
            && self.next_invoice_date.is_some_and(|d| d <= today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_contract() -> StorageContract {
        let now = Utc::now();
        StorageContract {
            id: 1,
            number: "CON-0001".into(),
            customer_id: 1,
            company_id: 1,
            pricing_model: PricingModel::PostPaid,
            tariff_rule_id: None,
            credit_limit: Decimal::ZERO,
            currency: "USD".into(),
            invoice_cycle: InvoiceCycle::Monthly,
            next_invoice_date: None,
            state: ContractState::Draft,
            date_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_prepaid_requires_credit() {
        let mut contract = test_contract();
        contract.pricing_model = PricingModel::PrePaid;
        assert!(contract.validate().is_err());

        contract.credit_limit = dec!(1000.00);
        assert!(contract.validate().is_ok());
    }

    #[test]
    fn test_date_order_validation() {
        let mut contract = test_contract();
        contract.date_end = NaiveDate::from_ymd_opt(2023, 12, 1);
        assert!(contract.validate().is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut contract = test_contract();
        assert!(contract.suspend().is_err());
        assert!(contract.activate().is_ok());
        assert!(contract.activate().is_err());
        assert!(contract.suspend().is_ok());
        assert!(contract.close().is_ok());
        assert!(contract.close().is_err());
    }

    #[test]
    fn test_due_check() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let mut contract = test_contract();
        contract.state = ContractState::Active;
        contract.next_invoice_date = NaiveDate::from_ymd_opt(2024, 6, 15);
        assert!(contract.is_due(today));

        contract.next_invoice_date = NaiveDate::from_ymd_opt(2024, 6, 16);
        assert!(!contract.is_due(today));

        // Manual contracts are never swept.
        contract.next_invoice_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        contract.invoice_cycle = InvoiceCycle::Manual;
        assert!(!contract.is_due(today));
    }

    #[test]
    fn test_cycle_scheduling() {
        let from = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            InvoiceCycle::Weekly.next_invoice_date_after(from),
            NaiveDate::from_ymd_opt(2024, 6, 8).unwrap()
        );
        assert_eq!(
            InvoiceCycle::Monthly.next_invoice_date_after(from),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        assert_eq!(InvoiceCycle::Manual.next_invoice_date_after(from), from);
    }
}
