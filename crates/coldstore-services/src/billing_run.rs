//! Period billing runs
//!
//! Selects intakes eligible for a billing window, prices the unbilled span
//! of each one and rolls the amounts into customer invoices. Every intake
//! carries a `last_billed_date` watermark that the run advances with a
//! compare-and-swap, so concurrent runs over the same window cannot bill a
//! day twice. Customer groups fail independently: one bad account setup
//! does not stop the rest of the run.

use coldstore_core::{
    billing::period::{compute_days_breakdown, compute_period_charge, PeriodCharge, PricedLine},
    models::{
        BillingPreviewLine, EligibilityQuery, Intake, InvoiceGrouping, InvoiceHandle, RunCriteria,
        RunFailure, RunOutcome, StorageLine, TariffRule,
    },
    traits::{
        AccountResolver, Clock, IntakeRepository, InvoiceDraft, InvoiceIssuer, InvoiceLineDraft,
        TariffRepository,
    },
    AppError, AppResult,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Period billing orchestration
pub struct BillingRunService {
    intake_repo: Arc<dyn IntakeRepository>,
    tariff_repo: Arc<dyn TariffRepository>,
    invoice_issuer: Arc<dyn InvoiceIssuer>,
    account_resolver: Arc<dyn AccountResolver>,
    clock: Arc<dyn Clock>,

    /// Companies with a run in flight; a second run for the same company
    /// is rejected rather than queued.
    running: Arc<Mutex<HashSet<i64>>>,
}

/// Releases the company's run slot when the run ends, however it ends.
struct RunSlot {
    company_id: i64,
    running: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        self.running.lock().remove(&self.company_id);
    }
}

/// One intake priced for the run window
struct PricedIntake {
    intake: Intake,
    charge: PeriodCharge,
    preview: BillingPreviewLine,
}

impl BillingRunService {
    pub fn new(
        intake_repo: Arc<dyn IntakeRepository>,
        tariff_repo: Arc<dyn TariffRepository>,
        invoice_issuer: Arc<dyn InvoiceIssuer>,
        account_resolver: Arc<dyn AccountResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intake_repo,
            tariff_repo,
            invoice_issuer,
            account_resolver,
            clock,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Preview a run: the per-intake day counters and amounts a run over
    /// this window would bill, without side effects.
    #[instrument(skip(self, criteria), fields(company_id = criteria.company_id))]
    pub async fn preview(&self, criteria: &RunCriteria) -> AppResult<Vec<BillingPreviewLine>> {
        criteria.validate()?;
        let eligible = self.select_eligible(criteria).await?;
        let priced = self.price_intakes(eligible, criteria).await?;
        Ok(priced.into_iter().map(|p| p.preview).collect())
    }

    /// Execute a billing run. Intakes in `deselected` are left out even when
    /// eligible. A dry run prices everything but creates no invoices and
    /// moves no watermarks.
    #[instrument(skip(self, criteria), fields(company_id = criteria.company_id, dry_run = criteria.dry_run))]
    pub async fn execute(
        &self,
        criteria: &RunCriteria,
        deselected: &[i64],
    ) -> AppResult<RunOutcome> {
        criteria.validate()?;
        let _slot = self.acquire_slot(criteria.company_id)?;

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            "Billing run for company {} over {}..{}",
            criteria.company_id, criteria.date_from, criteria.date_to
        );

        let eligible = self.select_eligible(criteria).await?;
        let mut priced = self.price_intakes(eligible, criteria).await?;
        for p in &mut priced {
            if deselected.contains(&p.intake.id) {
                p.preview.selected = false;
            }
        }

        let total_amount: Decimal = priced
            .iter()
            .filter(|p| p.preview.selected)
            .map(|p| p.charge.amount)
            .sum();

        if criteria.dry_run {
            return Ok(RunOutcome {
                run_id,
                invoices: Vec::new(),
                total_amount,
                lines: priced.into_iter().map(|p| p.preview).collect(),
                failures: Vec::new(),
            });
        }

        // Group per customer; each group is billed independently so one
        // failure does not abort the rest.
        let mut groups: BTreeMap<i64, Vec<&PricedIntake>> = BTreeMap::new();
        for p in &priced {
            if p.preview.selected && !p.charge.amount.is_zero() {
                groups.entry(p.intake.customer_id).or_default().push(p);
            }
        }

        let mut invoices = Vec::new();
        let mut failures = Vec::new();
        for (customer_id, group) in groups {
            match self.bill_customer_group(customer_id, &group, criteria).await {
                Ok(mut created) => invoices.append(&mut created),
                Err(e) => {
                    error!(
                        %run_id,
                        "Billing failed for customer {}: {}",
                        customer_id, e
                    );
                    failures.push(RunFailure {
                        customer_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            %run_id,
            "Billing run finished: {} invoices, {} failures, total {}",
            invoices.len(),
            failures.len(),
            total_amount
        );

        Ok(RunOutcome {
            run_id,
            invoices,
            total_amount,
            lines: priced.into_iter().map(|p| p.preview).collect(),
            failures,
        })
    }

    /// Clear the watermark of every active intake whose invoice no longer
    /// exists, re-opening it for billing. Returns the number of intakes
    /// reset.
    #[instrument(skip(self))]
    pub async fn reset_watermarks(&self, company_id: i64) -> AppResult<u64> {
        let intakes = self.intake_repo.find_watermarked_active(company_id).await?;
        let mut reset = 0u64;
        for intake in intakes {
            if !self.invoice_issuer.has_active_invoice(&intake.number).await? {
                self.intake_repo.clear_watermark(intake.id).await?;
                info!("Reset billing watermark on intake {}", intake.number);
                reset += 1;
            }
        }
        Ok(reset)
    }

    fn acquire_slot(&self, company_id: i64) -> AppResult<RunSlot> {
        let mut running = self.running.lock();
        if !running.insert(company_id) {
            return Err(AppError::Conflict(format!(
                "a billing run is already in progress for company {company_id}"
            )));
        }
        Ok(RunSlot {
            company_id,
            running: self.running.clone(),
        })
    }

    /// Select eligible intakes, diagnosing an empty selection into an
    /// actionable error.
    async fn select_eligible(&self, criteria: &RunCriteria) -> AppResult<Vec<Intake>> {
        let query = EligibilityQuery::from(criteria);
        let eligible = self.intake_repo.find_eligible_for_billing(&query).await?;
        if !eligible.is_empty() {
            return Ok(eligible);
        }

        if self.intake_repo.count_active(criteria.company_id).await? == 0 {
            return Err(AppError::NoActiveIntakes);
        }
        // Unbilled mode also covers intakes checked in before the window,
        // so only the upper bound applies there.
        let range_from = if criteria.unbilled_only {
            NaiveDate::MIN
        } else {
            criteria.date_from
        };
        let in_range = self
            .intake_repo
            .count_checked_in_between(criteria.company_id, range_from, criteria.date_to)
            .await?;
        if in_range == 0 {
            return Err(AppError::NoIntakesInRange {
                from: criteria.date_from,
                to: criteria.date_to,
            });
        }
        Err(AppError::AllIntakesBilled {
            from: criteria.date_from,
            to: criteria.date_to,
        })
    }

    async fn price_intakes(
        &self,
        intakes: Vec<Intake>,
        criteria: &RunCriteria,
    ) -> AppResult<Vec<PricedIntake>> {
        let now = self.clock.now();
        let mut rule_cache: HashMap<i64, Option<TariffRule>> = HashMap::new();
        let mut priced = Vec::with_capacity(intakes.len());

        for intake in intakes {
            let lines = self.intake_repo.find_lines(intake.id).await?;
            let paired = self.pair_rules(&lines, &mut rule_cache).await?;
            let priced_lines: Vec<PricedLine<'_>> = paired
                .iter()
                .map(|(line, rule)| PricedLine {
                    line,
                    rule: rule.as_ref(),
                })
                .collect();

            let charge = compute_period_charge(
                &intake,
                &priced_lines,
                criteria.date_from,
                criteria.date_to,
            );
            let days =
                compute_days_breakdown(&intake, criteria.date_from, criteria.date_to, now);
            debug!(
                "Intake {}: {:.2} pending days, amount {}",
                intake.number, days.pending_days, charge.amount
            );

            let preview = BillingPreviewLine {
                intake_id: intake.id,
                intake_number: intake.number.clone(),
                customer_id: intake.customer_id,
                total_days: days.total_days,
                billed_days: days.billed_days,
                pending_days: days.pending_days,
                period_amount: charge.amount,
                selected: true,
            };
            priced.push(PricedIntake {
                intake,
                charge,
                preview,
            });
        }
        Ok(priced)
    }

    async fn pair_rules(
        &self,
        lines: &[StorageLine],
        cache: &mut HashMap<i64, Option<TariffRule>>,
    ) -> AppResult<Vec<(StorageLine, Option<TariffRule>)>> {
        let mut paired = Vec::with_capacity(lines.len());
        for line in lines {
            let rule = match line.tariff_rule_id {
                Some(rule_id) => match cache.get(&rule_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched = self.tariff_repo.find_by_id(rule_id).await?;
                        cache.insert(rule_id, fetched.clone());
                        fetched
                    }
                },
                None => None,
            };
            paired.push((line.clone(), rule));
        }
        Ok(paired)
    }

    /// Bill one customer's intakes. Watermarks are advanced with a
    /// compare-and-swap before invoicing; an intake whose watermark was
    /// moved by a concurrent run is dropped from the invoice. If invoice
    /// creation then fails, the watermarks are rolled back.
    async fn bill_customer_group(
        &self,
        customer_id: i64,
        group: &[&PricedIntake],
        criteria: &RunCriteria,
    ) -> AppResult<Vec<InvoiceHandle>> {
        let mut claimed: Vec<&PricedIntake> = Vec::new();
        for p in group {
            let advanced = self
                .intake_repo
                .advance_watermark(p.intake.id, p.intake.last_billed_date, criteria.date_to)
                .await?;
            if advanced {
                claimed.push(p);
            } else {
                warn!(
                    "Intake {} was billed by a concurrent run, dropping it",
                    p.intake.number
                );
            }
        }
        if claimed.is_empty() {
            return Ok(Vec::new());
        }

        let result = self
            .issue_invoices(customer_id, &claimed, criteria)
            .await;
        if result.is_err() {
            for p in &claimed {
                self.rollback_watermark(p, criteria.date_to).await;
            }
        }
        result
    }

    async fn issue_invoices(
        &self,
        customer_id: i64,
        claimed: &[&PricedIntake],
        criteria: &RunCriteria,
    ) -> AppResult<Vec<InvoiceHandle>> {
        let invoice_date = self.clock.now().date_naive();
        let mut invoices = Vec::new();

        match criteria.grouping {
            InvoiceGrouping::PerCustomer => {
                let mut lines = Vec::new();
                for p in claimed {
                    lines.extend(self.draft_lines(p).await?);
                }
                let reference = run_reference(
                    criteria,
                    claimed.iter().map(|p| p.intake.number.as_str()),
                );
                invoices.push(
                    self.invoice_issuer
                        .create_invoice(&InvoiceDraft {
                            customer_id,
                            company_id: criteria.company_id,
                            currency: claimed[0].intake.currency.clone(),
                            reference,
                            invoice_date,
                            lines,
                        })
                        .await?,
                );
            }
            InvoiceGrouping::PerIntake => {
                for p in claimed {
                    let lines = self.draft_lines(p).await?;
                    let reference =
                        run_reference(criteria, std::iter::once(p.intake.number.as_str()));
                    invoices.push(
                        self.invoice_issuer
                            .create_invoice(&InvoiceDraft {
                                customer_id,
                                company_id: criteria.company_id,
                                currency: p.intake.currency.clone(),
                                reference,
                                invoice_date,
                                lines,
                            })
                            .await?,
                    );
                }
            }
        }
        Ok(invoices)
    }

    /// One invoice line per service product share of the intake's charge.
    async fn draft_lines(&self, p: &PricedIntake) -> AppResult<Vec<InvoiceLineDraft>> {
        let mut lines = Vec::with_capacity(p.charge.items.len());
        for item in &p.charge.items {
            let account = self
                .account_resolver
                .resolve_income_account(item.service_product_id)
                .await?
                .ok_or(AppError::AccountResolution(item.service_product_id))?;
            lines.push(InvoiceLineDraft {
                product_id: item.service_product_id,
                description: format!(
                    "Storage {}: {} to {}, {:.2} days",
                    p.intake.number,
                    p.charge.period_start.date_naive(),
                    p.charge.period_end.date_naive(),
                    p.charge.period_days,
                ),
                amount: item.amount,
                account,
            });
        }
        Ok(lines)
    }

    /// Best-effort watermark rollback after a failed invoice. A failure here
    /// leaves the intake for the reset sweep to repair.
    async fn rollback_watermark(&self, p: &PricedIntake, advanced_to: NaiveDate) {
        let result = match p.intake.last_billed_date {
            Some(previous) => {
                self.intake_repo
                    .advance_watermark(p.intake.id, Some(advanced_to), previous)
                    .await
                    .map(|_| ())
            }
            None => self.intake_repo.clear_watermark(p.intake.id).await,
        };
        if let Err(e) = result {
            error!(
                "Failed to roll back watermark on intake {}: {}",
                p.intake.number, e
            );
        }
    }
}

/// Invoice back-reference carrying the window and the intake numbers, so
/// the reset sweep can find the invoice from an intake number.
fn run_reference<'a>(criteria: &RunCriteria, numbers: impl Iterator<Item = &'a str>) -> String {
    let numbers: Vec<&str> = numbers.collect();
    format!(
        "Cold storage charges from {} to {}: {}",
        criteria.date_from,
        criteria.date_to,
        numbers.join(", ")
    )
}
