//! Scheduled contract billing
//!
//! A background sweep that bills active contracts whose next invoice date
//! has passed. Each contract gets its own billing run scoped to its
//! customer and cycle window; one contract failing does not stop the
//! sweep, its date simply stays due for the next pass.

use coldstore_core::{
    models::{InvoiceGrouping, RunCriteria, StorageContract},
    traits::{Clock, ContractRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::billing_run::BillingRunService;

/// Tally of one sweep pass
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SweepOutcome {
    /// Contracts billed and rescheduled
    pub billed: u64,
    /// Contracts with nothing to bill, rescheduled without an invoice
    pub skipped: u64,
    /// Contracts left due after an error
    pub failed: u64,
}

/// Scheduled billing of due contracts
pub struct ContractBillingSweep {
    contract_repo: Arc<dyn ContractRepository>,
    billing: Arc<BillingRunService>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ContractBillingSweep {
    pub fn new(
        contract_repo: Arc<dyn ContractRepository>,
        billing: Arc<BillingRunService>,
        clock: Arc<dyn Clock>,
        interval_secs: u64,
    ) -> Self {
        Self {
            contract_repo,
            billing,
            clock,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run the sweep on a timer until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        info!(
            "Contract billing sweep scheduled every {}s",
            self.interval.as_secs()
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so startup is quiet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!("Contract billing sweep failed: {}", e);
                }
            }
        })
    }

    /// One sweep pass: bill every due contract.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> AppResult<SweepOutcome> {
        let today = self.clock.now().date_naive();
        let due = self.contract_repo.find_due(today).await?;
        if due.is_empty() {
            return Ok(SweepOutcome::default());
        }
        info!("Sweeping {} due contract(s) on {}", due.len(), today);

        let mut outcome = SweepOutcome::default();
        for contract in due {
            match self.bill_contract(&contract, today).await {
                Ok(invoiced) => {
                    self.reschedule(&contract, today).await?;
                    if invoiced {
                        outcome.billed += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                }
                Err(e) => {
                    // Left due; the next pass retries it.
                    error!(
                        "Failed to bill contract {} for customer {}: {}",
                        contract.number, contract.customer_id, e
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Sweep done: {} billed, {} skipped, {} failed",
            outcome.billed, outcome.skipped, outcome.failed
        );
        Ok(outcome)
    }

    /// Bill one contract's cycle window. Returns false when the contract
    /// had nothing billable, which reschedules it without an invoice.
    async fn bill_contract(&self, contract: &StorageContract, today: chrono::NaiveDate) -> AppResult<bool> {
        let criteria = RunCriteria {
            company_id: contract.company_id,
            date_from: contract.invoice_cycle.cycle_window_start(today),
            date_to: today,
            unbilled_only: true,
            customer_ids: vec![contract.customer_id],
            contract_ids: vec![contract.id],
            grouping: InvoiceGrouping::PerCustomer,
            dry_run: false,
        };

        match self.billing.execute(&criteria, &[]).await {
            Ok(outcome) => {
                if !outcome.failures.is_empty() {
                    return Err(AppError::InvoiceCreation(
                        outcome.failures[0].reason.clone(),
                    ));
                }
                info!(
                    "Contract {} billed: {} invoice(s), total {}",
                    contract.number,
                    outcome.invoices.len(),
                    outcome.total_amount
                );
                Ok(true)
            }
            // An empty window is normal for a contract with no goods in
            // storage right now; reschedule rather than retry every pass.
            Err(
                AppError::NoActiveIntakes
                | AppError::NoIntakesInRange { .. }
                | AppError::AllIntakesBilled { .. },
            ) => {
                warn!("Contract {} has nothing to bill", contract.number);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn reschedule(&self, contract: &StorageContract, today: chrono::NaiveDate) -> AppResult<()> {
        let next = contract.invoice_cycle.next_invoice_date_after(today);
        self.contract_repo
            .update_next_invoice_date(contract.id, next)
            .await
    }
}
