//! Contract service
//!
//! Manages storage contract lifecycles. The scheduled billing of active
//! contracts lives in [`crate::contract_billing`].

use coldstore_core::{
    models::{ContractState, InvoiceCycle, PricingModel, StorageContract},
    traits::{Clock, ContractRepository, Sequencer},
    AppError, AppResult,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::constants::CONTRACT_SERIES;

/// Input for creating a contract
#[derive(Debug, Clone)]
pub struct NewContract {
    pub customer_id: i64,
    pub company_id: i64,
    pub pricing_model: PricingModel,
    pub tariff_rule_id: Option<i64>,
    pub credit_limit: Decimal,
    pub currency: String,
    pub invoice_cycle: InvoiceCycle,
    pub date_start: NaiveDate,
    pub date_end: Option<NaiveDate>,
}

/// Contract business logic
pub struct ContractService {
    contract_repo: Arc<dyn ContractRepository>,
    sequencer: Arc<dyn Sequencer>,
    clock: Arc<dyn Clock>,
}

impl ContractService {
    pub fn new(
        contract_repo: Arc<dyn ContractRepository>,
        sequencer: Arc<dyn Sequencer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            contract_repo,
            sequencer,
            clock,
        }
    }

    /// Create a draft contract.
    #[instrument(skip(self, input), fields(customer_id = input.customer_id))]
    pub async fn create(&self, input: NewContract) -> AppResult<StorageContract> {
        let now = self.clock.now();
        let number = self.sequencer.next_document_number(CONTRACT_SERIES).await?;

        let contract = StorageContract {
            id: 0,
            number,
            customer_id: input.customer_id,
            company_id: input.company_id,
            pricing_model: input.pricing_model,
            tariff_rule_id: input.tariff_rule_id,
            credit_limit: input.credit_limit,
            currency: input.currency,
            invoice_cycle: input.invoice_cycle,
            next_invoice_date: None,
            state: ContractState::Draft,
            date_start: input.date_start,
            date_end: input.date_end,
            created_at: now,
            updated_at: now,
        };
        contract.validate()?;

        let contract = self.contract_repo.create(&contract).await?;
        info!(
            "Created contract {} for customer {}",
            contract.number, contract.customer_id
        );
        Ok(contract)
    }

    /// Activate a draft contract and schedule its first invoice a full
    /// cycle out. Manual contracts get no schedule.
    #[instrument(skip(self))]
    pub async fn activate(&self, contract_id: i64) -> AppResult<StorageContract> {
        let mut contract = self.get(contract_id).await?;
        contract.activate()?;
        if contract.invoice_cycle != InvoiceCycle::Manual {
            contract.next_invoice_date = Some(
                contract
                    .invoice_cycle
                    .next_invoice_date_after(self.clock.now().date_naive()),
            );
        }
        let contract = self.contract_repo.update(&contract).await?;
        info!("Activated contract {}", contract.number);
        Ok(contract)
    }

    /// Suspend an active contract; the sweep skips it until reactivated.
    #[instrument(skip(self))]
    pub async fn suspend(&self, contract_id: i64) -> AppResult<StorageContract> {
        let mut contract = self.get(contract_id).await?;
        contract.suspend()?;
        let contract = self.contract_repo.update(&contract).await?;
        info!("Suspended contract {}", contract.number);
        Ok(contract)
    }

    /// Close a contract.
    #[instrument(skip(self))]
    pub async fn close(&self, contract_id: i64) -> AppResult<StorageContract> {
        let mut contract = self.get(contract_id).await?;
        contract.close()?;
        let contract = self.contract_repo.update(&contract).await?;
        info!("Closed contract {}", contract.number);
        Ok(contract)
    }

    /// Fetch a contract by id.
    pub async fn get(&self, contract_id: i64) -> AppResult<StorageContract> {
        self.contract_repo
            .find_by_id(contract_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contract {contract_id}")))
    }

    /// List contracts with pagination.
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<StorageContract>> {
        self.contract_repo.find_all(limit, offset).await
    }

    /// Total number of contracts.
    pub async fn count(&self) -> AppResult<i64> {
        self.contract_repo.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_now, MockClock, MockContractRepository, MockSequencer};
    use rust_decimal_macros::dec;

    fn service() -> (Arc<MockContractRepository>, ContractService) {
        let repo = Arc::new(MockContractRepository::default());
        let svc = ContractService::new(
            repo.clone(),
            Arc::new(MockSequencer::new("CON")),
            Arc::new(MockClock::default()),
        );
        (repo, svc)
    }

    fn new_contract() -> NewContract {
        NewContract {
            customer_id: 7,
            company_id: 1,
            pricing_model: PricingModel::PostPaid,
            tariff_rule_id: None,
            credit_limit: Decimal::ZERO,
            currency: "USD".into(),
            invoice_cycle: InvoiceCycle::Monthly,
            date_start: fixed_now().date_naive(),
            date_end: None,
        }
    }

    #[tokio::test]
    async fn test_activation_schedules_first_invoice() {
        let (_, svc) = service();
        let contract = svc.create(new_contract()).await.unwrap();
        assert_eq!(contract.number, "CON-0001");
        assert_eq!(contract.next_invoice_date, None);

        let contract = svc.activate(contract.id).await.unwrap();
        assert_eq!(contract.state, ContractState::Active);
        // Monthly: first invoice 30 days after activation.
        assert_eq!(
            contract.next_invoice_date,
            Some(fixed_now().date_naive() + chrono::Duration::days(30))
        );
    }

    #[tokio::test]
    async fn test_manual_contract_gets_no_schedule() {
        let (_, svc) = service();
        let mut input = new_contract();
        input.invoice_cycle = InvoiceCycle::Manual;
        let contract = svc.create(input).await.unwrap();
        let contract = svc.activate(contract.id).await.unwrap();
        assert_eq!(contract.next_invoice_date, None);
    }

    #[tokio::test]
    async fn test_prepaid_without_credit_rejected() {
        let (_, svc) = service();
        let mut input = new_contract();
        input.pricing_model = PricingModel::PrePaid;
        assert!(svc.create(input.clone()).await.is_err());

        input.credit_limit = dec!(5000.00);
        assert!(svc.create(input).await.is_ok());
    }

    #[tokio::test]
    async fn test_suspended_contract_not_due() {
        let (repo, svc) = service();
        let contract = svc.create(new_contract()).await.unwrap();
        let contract = svc.activate(contract.id).await.unwrap();
        svc.suspend(contract.id).await.unwrap();

        let far = fixed_now().date_naive() + chrono::Duration::days(365);
        assert!(repo.find_due(far).await.unwrap().is_empty());
    }
}
