//! Release service
//!
//! Takes goods out of storage. A draft release prices each requested
//! quantity by pro-rating the storage line's lifetime charge over the
//! released share; validation executes the stock moves, freezes released
//! lines and advances the intake state. Validated releases can then be
//! invoiced.

use coldstore_core::{
    models::{
        release::prorated_release_amount, Intake, InvoiceHandle, Release, ReleaseLine,
        ReleaseState, StorageLine, TariffRule,
    },
    traits::{
        AccountResolver, Clock, IntakeRepository, InvoiceDraft, InvoiceIssuer, InvoiceLineDraft,
        ReleaseRepository, Sequencer, StockMover, StockMoveRequest, TariffRepository,
    },
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::constants::{CUSTOMERS_LOCATION_ID, RELEASE_SERIES};

/// Input for creating a release
#[derive(Debug, Clone)]
pub struct NewRelease {
    pub intake_id: i64,
    pub released_at: Option<chrono::DateTime<chrono::Utc>>,
    pub gate_entry_id: Option<i64>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub lines: Vec<NewReleaseLine>,
}

/// Requested quantity off one storage line
#[derive(Debug, Clone)]
pub struct NewReleaseLine {
    pub storage_line_id: i64,
    pub qty_out: f64,
}

/// Release business logic
pub struct ReleaseService {
    release_repo: Arc<dyn ReleaseRepository>,
    intake_repo: Arc<dyn IntakeRepository>,
    tariff_repo: Arc<dyn TariffRepository>,
    sequencer: Arc<dyn Sequencer>,
    stock_mover: Arc<dyn StockMover>,
    invoice_issuer: Arc<dyn InvoiceIssuer>,
    account_resolver: Arc<dyn AccountResolver>,
    clock: Arc<dyn Clock>,
}

impl ReleaseService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        release_repo: Arc<dyn ReleaseRepository>,
        intake_repo: Arc<dyn IntakeRepository>,
        tariff_repo: Arc<dyn TariffRepository>,
        sequencer: Arc<dyn Sequencer>,
        stock_mover: Arc<dyn StockMover>,
        invoice_issuer: Arc<dyn InvoiceIssuer>,
        account_resolver: Arc<dyn AccountResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            release_repo,
            intake_repo,
            tariff_repo,
            sequencer,
            stock_mover,
            invoice_issuer,
            account_resolver,
            clock,
        }
    }

    /// Create a draft release against an active intake. Each line's charge
    /// is the storage line's lifetime subtotal at the release time, pro-rated
    /// by the released share of the checked-in quantity.
    #[instrument(skip(self, input), fields(intake_id = input.intake_id))]
    pub async fn create(&self, input: NewRelease) -> AppResult<(Release, Vec<ReleaseLine>)> {
        if input.lines.is_empty() {
            return Err(AppError::Validation(
                "release requires at least one line".into(),
            ));
        }

        let intake = self.get_intake(input.intake_id).await?;
        if !intake.is_active() {
            return Err(AppError::invalid_state(
                "intake",
                "checked_in or partially_out",
                intake.state,
            ));
        }

        let released_at = input.released_at.unwrap_or_else(|| self.clock.now());
        let storage_lines = self.storage_lines_by_id(intake.id).await?;
        let number = self.sequencer.next_document_number(RELEASE_SERIES).await?;

        let release = Release {
            id: 0,
            number,
            intake_id: intake.id,
            customer_id: intake.customer_id,
            company_id: intake.company_id,
            released_at,
            state: ReleaseState::Draft,
            currency: intake.currency.clone(),
            gate_entry_id: input.gate_entry_id,
            vehicle_number: input.vehicle_number,
            driver_name: input.driver_name,
            created_at: released_at,
            updated_at: released_at,
        };
        let release = self.release_repo.create(&release).await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for requested in input.lines {
            let storage_line = storage_lines.get(&requested.storage_line_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "storage line {} on intake {}",
                    requested.storage_line_id, intake.number
                ))
            })?;

            let rule = self.rule_for(storage_line).await?;
            let subtotal = match rule {
                Some(ref rule) => rule.compute_amount(storage_line, released_at).0,
                None => Decimal::ZERO,
            };
            let amount =
                prorated_release_amount(subtotal, storage_line.qty_in, requested.qty_out);

            let line = ReleaseLine {
                id: 0,
                release_id: release.id,
                storage_line_id: storage_line.id,
                product_id: storage_line.product_id,
                lot: storage_line.lot.clone(),
                qty_out: requested.qty_out,
                amount,
            };
            line.validate(storage_line.qty_in, storage_line.qty_out)?;
            lines.push(self.release_repo.create_line(&line).await?);
        }

        info!(
            "Created release {} against intake {} ({} lines)",
            release.number,
            intake.number,
            lines.len()
        );
        Ok((release, lines))
    }

    /// Validate a draft release: goods leave the freezer, quantities come
    /// off the storage lines, fully released lines freeze their span, and
    /// the intake advances to partially out or closed.
    #[instrument(skip(self))]
    pub async fn validate(&self, release_id: i64) -> AppResult<Release> {
        let mut release = self.get_release(release_id).await?;
        let mut intake = self.get_intake(release.intake_id).await?;
        let release_lines = self.release_repo.find_lines(release_id).await?;
        let mut storage_lines = self.storage_lines_by_id(intake.id).await?;

        // Re-check availability against current quantities before any
        // side effects.
        for line in &release_lines {
            let storage_line = storage_lines.get(&line.storage_line_id).ok_or_else(|| {
                AppError::NotFound(format!("storage line {}", line.storage_line_id))
            })?;
            line.validate(storage_line.qty_in, storage_line.qty_out)?;
        }
        release.mark_done()?;

        for line in &release_lines {
            let storage_line = match storage_lines.get_mut(&line.storage_line_id) {
                Some(storage_line) => storage_line,
                None => continue,
            };

            self.stock_mover
                .move_goods(&StockMoveRequest {
                    reference: release.number.clone(),
                    product_id: line.product_id,
                    lot: line.lot.clone(),
                    qty: line.qty_out,
                    uom: storage_line.uom.clone(),
                    source_location_id: intake.location_id,
                    dest_location_id: CUSTOMERS_LOCATION_ID,
                    company_id: intake.company_id,
                })
                .await?;

            storage_line.qty_out += line.qty_out;
            if storage_line.is_fully_released() {
                storage_line.released_at = Some(release.released_at);
            }
            let rule = self.rule_for(storage_line).await?;
            storage_line.recompute_subtotal(rule.as_ref(), release.released_at);
            self.intake_repo.update_line(storage_line).await?;
        }

        if storage_lines.values().all(|l| l.is_fully_released()) {
            let all_lines: Vec<_> = storage_lines.into_values().collect();
            intake.close(&all_lines)?;
        } else {
            intake.mark_partially_out()?;
        }
        self.intake_repo.update(&intake).await?;

        let release = self.release_repo.update(&release).await?;
        info!("Validated release {} (intake {})", release.number, intake.number);
        Ok(release)
    }

    /// Cancel a draft release. Validated releases cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self, release_id: i64) -> AppResult<Release> {
        let mut release = self.get_release(release_id).await?;
        release.cancel()?;
        let release = self.release_repo.update(&release).await?;
        info!("Cancelled release {}", release.number);
        Ok(release)
    }

    /// Invoice a validated release: one invoice line per priced release
    /// line, charged to the matched rule's service product.
    #[instrument(skip(self))]
    pub async fn invoice_release(&self, release_id: i64) -> AppResult<InvoiceHandle> {
        let release = self.get_release(release_id).await?;
        if release.state != ReleaseState::Done {
            return Err(AppError::invalid_state("release", "done", release.state));
        }
        if self.invoice_issuer.has_active_invoice(&release.number).await? {
            return Err(AppError::Conflict(format!(
                "release {} is already invoiced",
                release.number
            )));
        }

        let intake = self.get_intake(release.intake_id).await?;
        let release_lines = self.release_repo.find_lines(release_id).await?;
        let storage_lines = self.storage_lines_by_id(intake.id).await?;

        let mut drafts = Vec::new();
        for line in &release_lines {
            if line.amount.is_zero() {
                debug!(
                    "Skipping unpriced release line {} on {}",
                    line.id, release.number
                );
                continue;
            }
            let storage_line = storage_lines.get(&line.storage_line_id).ok_or_else(|| {
                AppError::NotFound(format!("storage line {}", line.storage_line_id))
            })?;
            let rule = self.rule_for(storage_line).await?.ok_or_else(|| {
                AppError::InvoiceCreation(format!(
                    "storage line {} has no tariff rule",
                    storage_line.id
                ))
            })?;

            let account = self
                .account_resolver
                .resolve_income_account(rule.service_product_id)
                .await?
                .ok_or(AppError::AccountResolution(rule.service_product_id))?;

            drafts.push(InvoiceLineDraft {
                product_id: rule.service_product_id,
                description: charge_description(storage_line, &release, &rule),
                amount: line.amount,
                account,
            });
        }

        let invoice = self
            .invoice_issuer
            .create_invoice(&InvoiceDraft {
                customer_id: release.customer_id,
                company_id: release.company_id,
                currency: release.currency.clone(),
                reference: release.number.clone(),
                invoice_date: self.clock.now().date_naive(),
                lines: drafts,
            })
            .await?;

        info!(
            "Invoiced release {} as {} for customer {}",
            release.number, invoice.number, release.customer_id
        );
        Ok(invoice)
    }

    /// Fetch a release with its lines.
    pub async fn get_with_lines(&self, release_id: i64) -> AppResult<(Release, Vec<ReleaseLine>)> {
        let release = self.get_release(release_id).await?;
        let lines = self.release_repo.find_lines(release_id).await?;
        Ok((release, lines))
    }

    /// Releases against an intake, newest first.
    pub async fn list_for_intake(&self, intake_id: i64) -> AppResult<Vec<Release>> {
        self.release_repo.find_by_intake(intake_id).await
    }

    /// List releases with pagination.
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Release>> {
        self.release_repo.find_all(limit, offset).await
    }

    /// Total number of releases.
    pub async fn count(&self) -> AppResult<i64> {
        self.release_repo.count().await
    }

    async fn rule_for(&self, line: &StorageLine) -> AppResult<Option<TariffRule>> {
        match line.tariff_rule_id {
            Some(rule_id) => self.tariff_repo.find_by_id(rule_id).await,
            None => Ok(None),
        }
    }

    async fn storage_lines_by_id(&self, intake_id: i64) -> AppResult<HashMap<i64, StorageLine>> {
        Ok(self
            .intake_repo
            .find_lines(intake_id)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect())
    }

    async fn get_release(&self, release_id: i64) -> AppResult<Release> {
        self.release_repo
            .find_by_id(release_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("release {release_id}")))
    }

    async fn get_intake(&self, intake_id: i64) -> AppResult<Intake> {
        self.intake_repo
            .find_by_id(intake_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("intake {intake_id}")))
    }
}

/// Invoice line text for a released storage line.
fn charge_description(line: &StorageLine, release: &Release, rule: &TariffRule) -> String {
    let days = line.duration_hours(release.released_at) / 24.0;
    let lot = line.lot.as_deref().unwrap_or("-");
    format!(
        "Storage: product {} ({}) from {} to {}, {:.2} days @ {}/{}",
        line.product_id,
        lot,
        line.checked_in_at.date_naive(),
        release.released_at.date_naive(),
        days,
        line.effective_rate(rule.price_unit),
        line.bill_basis.unwrap_or(rule.basis),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        checked_in_intake, fixed_now, priced_line, test_rule, MockAccountResolver, MockClock,
        MockIntakeRepository, MockInvoiceIssuer, MockReleaseRepository, MockSequencer,
        MockStockMover, MockTariffRepository,
    };
    use chrono::Duration;
    use coldstore_core::models::IntakeState;
    use coldstore_core::traits::Repository;
    use rust_decimal_macros::dec;

    struct Fixture {
        release_repo: Arc<MockReleaseRepository>,
        intake_repo: Arc<MockIntakeRepository>,
        stock_mover: Arc<MockStockMover>,
        invoice_issuer: Arc<MockInvoiceIssuer>,
        svc: ReleaseService,
    }

    /// 100kg checked in 10 days ago at 2.00/kg/day: lifetime charge 2000.
    fn fixture() -> Fixture {
        fixture_with_resolver(Arc::new(MockAccountResolver::default()))
    }

    fn fixture_with_resolver(account_resolver: Arc<MockAccountResolver>) -> Fixture {
        let rule = test_rule(1, 10, dec!(2.00));
        let checked_in = fixed_now() - Duration::days(10);
        let intake = checked_in_intake(1, 7, checked_in);
        let line = priced_line(1, 1, 100.0, &rule, checked_in);

        let release_repo = Arc::new(MockReleaseRepository::default());
        let intake_repo = Arc::new(MockIntakeRepository::with_intakes(vec![(
            intake,
            vec![line],
        )]));
        let stock_mover = Arc::new(MockStockMover::default());
        let invoice_issuer = Arc::new(MockInvoiceIssuer::default());

        let svc = ReleaseService::new(
            release_repo.clone(),
            intake_repo.clone(),
            Arc::new(MockTariffRepository::new(vec![rule])),
            Arc::new(MockSequencer::new("REL")),
            stock_mover.clone(),
            invoice_issuer.clone(),
            account_resolver,
            Arc::new(MockClock::default()),
        );
        Fixture {
            release_repo,
            intake_repo,
            stock_mover,
            invoice_issuer,
            svc,
        }
    }

    fn request(qty_out: f64) -> NewRelease {
        NewRelease {
            intake_id: 1,
            released_at: None,
            gate_entry_id: None,
            vehicle_number: Some("KA-01-1234".into()),
            driver_name: Some("R. Gomez".into()),
            lines: vec![NewReleaseLine {
                storage_line_id: 1,
                qty_out,
            }],
        }
    }

    #[tokio::test]
    async fn test_partial_release_prorates_charge() {
        let f = fixture();
        let (release, lines) = f.svc.create(request(40.0)).await.unwrap();
        assert_eq!(release.number, "REL-0001");
        // 40% of the 2000 lifetime charge.
        assert_eq!(lines[0].amount, dec!(800.00));
    }

    #[tokio::test]
    async fn test_full_release_takes_whole_charge() {
        let f = fixture();
        let (_, lines) = f.svc.create(request(100.0)).await.unwrap();
        assert_eq!(lines[0].amount, dec!(2000.00));
    }

    #[tokio::test]
    async fn test_cannot_release_more_than_available() {
        let f = fixture();
        let err = f.svc.create(request(150.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_validate_partial_moves_stock_and_marks_intake() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        let release = f.svc.validate(release.id).await.unwrap();
        assert_eq!(release.state, ReleaseState::Done);

        let moves = f.stock_mover.moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].qty, 40.0);
        assert_eq!(moves[0].dest_location_id, CUSTOMERS_LOCATION_ID);

        let line = f.intake_repo.line(1).unwrap();
        assert_eq!(line.qty_out, 40.0);
        assert!(line.released_at.is_none());

        let intake = f.intake_repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(intake.state, IntakeState::PartiallyOut);
    }

    #[tokio::test]
    async fn test_validate_full_release_closes_intake() {
        let f = fixture();
        let (release, _) = f.svc.create(request(100.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();

        let line = f.intake_repo.line(1).unwrap();
        assert!(line.is_fully_released());
        assert!(line.released_at.is_some());
        // Span frozen: the lifetime charge stays at 10 days.
        assert_eq!(line.subtotal, dec!(2000.00));

        let intake = f.intake_repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(intake.state, IntakeState::Closed);
    }

    #[tokio::test]
    async fn test_validate_twice_rejected() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();
        let err = f.svc.validate(release.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_two_releases_respect_remaining_availability() {
        let f = fixture();
        let (first, _) = f.svc.create(request(70.0)).await.unwrap();
        f.svc.validate(first.id).await.unwrap();

        // Only 30 left; asking for 40 must fail at creation.
        let err = f.svc.create(request(40.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let (second, lines) = f.svc.create(request(30.0)).await.unwrap();
        f.svc.validate(second.id).await.unwrap();
        // Remaining 30% of the lifetime charge.
        assert_eq!(lines[0].amount, dec!(600.00));
    }

    #[tokio::test]
    async fn test_cancel_done_release_rejected() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();
        assert!(f.svc.cancel(release.id).await.is_err());
    }

    #[tokio::test]
    async fn test_invoice_release() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();

        let invoice = f.svc.invoice_release(release.id).await.unwrap();
        assert_eq!(invoice.number, "INV-00001");

        let drafts = f.invoice_issuer.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].reference, "REL-0001");
        assert_eq!(drafts[0].lines.len(), 1);
        assert_eq!(drafts[0].lines[0].amount, dec!(800.00));
        assert_eq!(drafts[0].lines[0].account, "400100");
        assert!(drafts[0].lines[0].description.starts_with("Storage:"));
    }

    #[tokio::test]
    async fn test_invoice_draft_release_rejected() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        let err = f.svc.invoice_release(release.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_invoice_twice_rejected() {
        let f = fixture();
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();
        f.svc.invoice_release(release.id).await.unwrap();
        let err = f.svc.invoice_release(release.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invoice_fails_without_income_account() {
        let f = fixture_with_resolver(Arc::new(MockAccountResolver::unresolvable()));
        let (release, _) = f.svc.create(request(40.0)).await.unwrap();
        f.svc.validate(release.id).await.unwrap();
        let err = f.svc.invoice_release(release.id).await.unwrap_err();
        assert!(matches!(err, AppError::AccountResolution(100)));
    }

    #[tokio::test]
    async fn test_release_against_draft_intake_rejected() {
        let rule = test_rule(1, 10, dec!(2.00));
        let checked_in = fixed_now() - Duration::days(1);
        let mut intake = checked_in_intake(1, 7, checked_in);
        intake.state = IntakeState::Draft;
        let line = priced_line(1, 1, 100.0, &rule, checked_in);

        let f = fixture();
        // Overwrite the fixture intake with a draft one.
        f.intake_repo.update(&intake).await.unwrap();
        f.intake_repo.update_line(&line).await.unwrap();

        let err = f.svc.create(request(10.0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
        // No release was persisted.
        assert_eq!(f.release_repo.count().await.unwrap(), 0);
    }
}
