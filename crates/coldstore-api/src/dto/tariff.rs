//! Tariff rule DTOs

use chrono::{DateTime, Utc};
use coldstore_core::models::{BillingBasis, RoundingPolicy, TariffRule};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a tariff rule
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TariffRuleCreateRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    pub company_id: i64,

    #[serde(default = "default_sequence")]
    pub sequence: i32,

    #[serde(default)]
    pub basis: BillingBasis,

    pub product_id: Option<i64>,
    pub category_id: Option<i64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_qty: Option<f64>,

    pub price_unit: Decimal,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    #[serde(default)]
    pub rounding_policy: RoundingPolicy,

    #[serde(default = "default_min_bill_days")]
    pub min_bill_days: f64,

    pub service_product_id: i64,
}

fn default_sequence() -> i32 {
    10
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_min_bill_days() -> f64 {
    1.0
}

impl TariffRuleCreateRequest {
    /// Build the entity; the id and timestamps are assigned on insert.
    pub fn to_rule(&self) -> TariffRule {
        let now = Utc::now();
        TariffRule {
            id: 0,
            name: self.name.clone(),
            company_id: self.company_id,
            active: true,
            sequence: self.sequence,
            basis: self.basis,
            product_id: self.product_id,
            category_id: self.category_id,
            min_temp: self.min_temp,
            max_temp: self.max_temp,
            min_qty: self.min_qty,
            price_unit: self.price_unit,
            currency: self.currency.clone(),
            rounding_policy: self.rounding_policy,
            min_bill_days: self.min_bill_days,
            service_product_id: self.service_product_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to update a tariff rule
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TariffRuleUpdateRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub active: Option<bool>,
    pub sequence: Option<i32>,
    pub basis: Option<BillingBasis>,
    pub product_id: Option<Option<i64>>,
    pub category_id: Option<Option<i64>>,
    pub min_temp: Option<Option<f64>>,
    pub max_temp: Option<Option<f64>>,
    pub min_qty: Option<Option<f64>>,
    pub price_unit: Option<Decimal>,
    pub rounding_policy: Option<RoundingPolicy>,
    pub min_bill_days: Option<f64>,
    pub service_product_id: Option<i64>,
}

impl TariffRuleUpdateRequest {
    /// Apply the set fields onto an existing rule.
    pub fn apply(&self, rule: &mut TariffRule) {
        if let Some(name) = &self.name {
            rule.name = name.clone();
        }
        if let Some(active) = self.active {
            rule.active = active;
        }
        if let Some(sequence) = self.sequence {
            rule.sequence = sequence;
        }
        if let Some(basis) = self.basis {
            rule.basis = basis;
        }
        if let Some(product_id) = self.product_id {
            rule.product_id = product_id;
        }
        if let Some(category_id) = self.category_id {
            rule.category_id = category_id;
        }
        if let Some(min_temp) = self.min_temp {
            rule.min_temp = min_temp;
        }
        if let Some(max_temp) = self.max_temp {
            rule.max_temp = max_temp;
        }
        if let Some(min_qty) = self.min_qty {
            rule.min_qty = min_qty;
        }
        if let Some(price_unit) = self.price_unit {
            rule.price_unit = price_unit;
        }
        if let Some(rounding_policy) = self.rounding_policy {
            rule.rounding_policy = rounding_policy;
        }
        if let Some(min_bill_days) = self.min_bill_days {
            rule.min_bill_days = min_bill_days;
        }
        if let Some(service_product_id) = self.service_product_id {
            rule.service_product_id = service_product_id;
        }
    }
}

/// Tariff rule response
#[derive(Debug, Clone, Serialize)]
pub struct TariffRuleResponse {
    pub id: i64,
    pub name: String,
    pub company_id: i64,
    pub active: bool,
    pub sequence: i32,
    pub basis: BillingBasis,
    pub product_id: Option<i64>,
    pub category_id: Option<i64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_qty: Option<f64>,
    pub price_unit: Decimal,
    pub currency: String,
    pub rounding_policy: RoundingPolicy,
    pub min_bill_days: f64,
    pub service_product_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TariffRule> for TariffRuleResponse {
    fn from(rule: TariffRule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            company_id: rule.company_id,
            active: rule.active,
            sequence: rule.sequence,
            basis: rule.basis,
            product_id: rule.product_id,
            category_id: rule.category_id,
            min_temp: rule.min_temp,
            max_temp: rule.max_temp,
            min_qty: rule.min_qty,
            price_unit: rule.price_unit,
            currency: rule.currency,
            rounding_policy: rule.rounding_policy,
            min_bill_days: rule.min_bill_days,
            service_product_id: rule.service_product_id,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// Query parameters for searching tariff rules
#[derive(Debug, Clone, Deserialize)]
pub struct TariffSearchParams {
    pub company_id: i64,
    pub name: Option<String>,
}

/// Request to preview which rule would match a hypothetical line
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TariffMatchRequest {
    pub company_id: i64,
    pub product_id: i64,
    pub product_category_id: Option<i64>,

    #[validate(range(min = 0.000001))]
    pub qty_in: f64,

    #[serde(default)]
    pub weight: f64,

    #[serde(default)]
    pub volume: f64,

    #[serde(default)]
    pub pallet_count: f64,

    #[serde(default = "default_match_temperature")]
    pub temperature_target: f64,
}

fn default_match_temperature() -> f64 {
    -18.0
}
