//! Storage contract DTOs

use chrono::{DateTime, NaiveDate, Utc};
use coldstore_core::models::{ContractState, InvoiceCycle, PricingModel, StorageContract};
use coldstore_services::contract_service::NewContract;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a contract
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContractCreateRequest {
    pub customer_id: i64,
    pub company_id: i64,

    #[serde(default)]
    pub pricing_model: PricingModel,

    pub tariff_rule_id: Option<i64>,

    #[serde(default)]
    pub credit_limit: Decimal,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    #[serde(default)]
    pub invoice_cycle: InvoiceCycle,

    pub date_start: NaiveDate,
    pub date_end: Option<NaiveDate>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl From<ContractCreateRequest> for NewContract {
    fn from(req: ContractCreateRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            company_id: req.company_id,
            pricing_model: req.pricing_model,
            tariff_rule_id: req.tariff_rule_id,
            credit_limit: req.credit_limit,
            currency: req.currency,
            invoice_cycle: req.invoice_cycle,
            date_start: req.date_start,
            date_end: req.date_end,
        }
    }
}

/// Contract response
#[derive(Debug, Clone, Serialize)]
pub struct ContractResponse {
    pub id: i64,
    pub number: String,
    pub customer_id: i64,
    pub company_id: i64,
    pub pricing_model: PricingModel,
    pub tariff_rule_id: Option<i64>,
    pub credit_limit: Decimal,
    pub currency: String,
    pub invoice_cycle: InvoiceCycle,
    pub next_invoice_date: Option<NaiveDate>,
    pub state: ContractState,
    pub date_start: NaiveDate,
    pub date_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StorageContract> for ContractResponse {
    fn from(contract: StorageContract) -> Self {
        Self {
            id: contract.id,
            number: contract.number,
            customer_id: contract.customer_id,
            company_id: contract.company_id,
            pricing_model: contract.pricing_model,
            tariff_rule_id: contract.tariff_rule_id,
            credit_limit: contract.credit_limit,
            currency: contract.currency,
            invoice_cycle: contract.invoice_cycle,
            next_invoice_date: contract.next_invoice_date,
            state: contract.state,
            date_start: contract.date_start,
            date_end: contract.date_end,
            created_at: contract.created_at,
            updated_at: contract.updated_at,
        }
    }
}
