//! In-memory mock repositories and collaborators shared by service tests.

use coldstore_core::{
    models::{
        EligibilityQuery, Intake, IntakeState, InvoiceHandle, Release, ReleaseLine, ReleaseState,
        StorageContract, StorageLine, TariffRule, TemperatureLog,
    },
    models::tariff::{BillingBasis, RoundingPolicy},
    traits::{
        AccountResolver, Clock, ContractRepository, IntakeRepository, InvoiceDraft, InvoiceIssuer,
        MoveHandle, ReleaseRepository, Repository, Sequencer, StockMover, StockMoveRequest,
        TariffRepository, TemperatureLogRepository,
    },
    AppError,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Rule fixture: weight basis, ceil_day, one-day minimum.
pub fn test_rule(id: i64, sequence: i32, price_unit: Decimal) -> TariffRule {
    let now = fixed_now();
    TariffRule {
        id,
        name: format!("rule {id}"),
        company_id: 1,
        active: true,
        sequence,
        basis: BillingBasis::Weight,
        product_id: None,
        category_id: None,
        min_temp: None,
        max_temp: None,
        min_qty: None,
        price_unit,
        currency: "USD".into(),
        rounding_policy: RoundingPolicy::CeilDay,
        min_bill_days: 1.0,
        service_product_id: 100,
        created_at: now,
        updated_at: now,
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .unwrap()
}

/// Clock pinned to a settable instant.
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(fixed_now()),
        }
    }
}

impl MockClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Sequencer handing out "{prefix}-{n:04}".
pub struct MockSequencer {
    prefix: String,
    counter: AtomicI64,
}

impl MockSequencer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl Sequencer for MockSequencer {
    async fn next_document_number(&self, _series: &str) -> Result<String, AppError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{:04}", self.prefix, n))
    }
}

/// Records moves; can be told to fail.
#[derive(Default)]
pub struct MockStockMover {
    moves: Mutex<Vec<StockMoveRequest>>,
    pub fail: Mutex<bool>,
}

impl MockStockMover {
    pub fn moves(&self) -> Vec<StockMoveRequest> {
        self.moves.lock().clone()
    }
}

#[async_trait]
impl StockMover for MockStockMover {
    async fn move_goods(&self, request: &StockMoveRequest) -> Result<MoveHandle, AppError> {
        if *self.fail.lock() {
            return Err(AppError::Stock("insufficient quantity".into()));
        }
        let mut moves = self.moves.lock();
        moves.push(request.clone());
        Ok(MoveHandle {
            id: moves.len() as i64,
        })
    }
}

/// Records invoice drafts; per-customer failure injection and a settable
/// set of references considered still invoiced.
#[derive(Default)]
pub struct MockInvoiceIssuer {
    drafts: Mutex<Vec<InvoiceDraft>>,
    counter: AtomicI64,
    pub fail_for_customer: Mutex<Option<i64>>,
    pub active_references: Mutex<Vec<String>>,
}

impl MockInvoiceIssuer {
    pub fn drafts(&self) -> Vec<InvoiceDraft> {
        self.drafts.lock().clone()
    }
}

#[async_trait]
impl InvoiceIssuer for MockInvoiceIssuer {
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<InvoiceHandle, AppError> {
        if draft.lines.is_empty() {
            return Err(AppError::InvoiceCreation("invoice draft has no lines".into()));
        }
        if *self.fail_for_customer.lock() == Some(draft.customer_id) {
            return Err(AppError::InvoiceCreation(format!(
                "injected failure for customer {}",
                draft.customer_id
            )));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.drafts.lock().push(draft.clone());
        self.active_references.lock().push(draft.reference.clone());
        Ok(InvoiceHandle {
            id: n,
            number: format!("INV-{n:05}"),
        })
    }

    // Whole document numbers only, mirroring the word-boundary match of
    // the production gateway: INT-1000 never matches INT-10001.
    async fn has_active_invoice(&self, reference: &str) -> Result<bool, AppError> {
        Ok(self.active_references.lock().iter().any(|r| {
            r.split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .any(|token| token.eq_ignore_ascii_case(reference))
        }))
    }
}

/// Resolves every product to one account unless told a product has none.
pub struct MockAccountResolver {
    pub accounts: Mutex<HashMap<i64, String>>,
    pub default_account: Option<String>,
}

impl Default for MockAccountResolver {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            default_account: Some("400100".to_string()),
        }
    }
}

impl MockAccountResolver {
    pub fn unresolvable() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            default_account: None,
        }
    }
}

#[async_trait]
impl AccountResolver for MockAccountResolver {
    async fn resolve_income_account(
        &self,
        service_product_id: i64,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .accounts
            .lock()
            .get(&service_product_id)
            .cloned()
            .or_else(|| self.default_account.clone()))
    }
}

/// In-memory tariff repository.
pub struct MockTariffRepository {
    rules: Mutex<Vec<TariffRule>>,
}

impl MockTariffRepository {
    pub fn new(rules: Vec<TariffRule>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }
}

#[async_trait]
impl Repository<TariffRule, i64> for MockTariffRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<TariffRule>, AppError> {
        Ok(self.rules.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<TariffRule>, AppError> {
        Ok(self
            .rules
            .lock()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.rules.lock().len() as i64)
    }

    async fn create(&self, entity: &TariffRule) -> Result<TariffRule, AppError> {
        let mut rules = self.rules.lock();
        let mut rule = entity.clone();
        rule.id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        rules.push(rule.clone());
        Ok(rule)
    }

    async fn update(&self, entity: &TariffRule) -> Result<TariffRule, AppError> {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|r| r.id == entity.id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity.clone())
            }
            None => Err(AppError::NotFound(format!("tariff rule {}", entity.id))),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut rules = self.rules.lock();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        Ok(rules.len() < before)
    }
}

#[async_trait]
impl TariffRepository for MockTariffRepository {
    async fn find_active(&self, company_id: i64) -> Result<Vec<TariffRule>, AppError> {
        let mut active: Vec<_> = self
            .rules
            .lock()
            .iter()
            .filter(|r| r.active && r.company_id == company_id)
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.sequence, r.id));
        Ok(active)
    }

    async fn search(
        &self,
        company_id: i64,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TariffRule>, i64), AppError> {
        let matches: Vec<_> = self
            .rules
            .lock()
            .iter()
            .filter(|r| r.company_id == company_id)
            .filter(|r| {
                name.map(|n| r.name.to_lowercase().contains(&n.to_lowercase()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        let total = matches.len() as i64;
        Ok((
            matches
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            total,
        ))
    }
}

/// In-memory intake repository with watermark compare-and-swap.
#[derive(Default)]
pub struct MockIntakeRepository {
    intakes: Mutex<HashMap<i64, Intake>>,
    lines: Mutex<HashMap<i64, StorageLine>>,
    next_intake_id: AtomicI64,
    next_line_id: AtomicI64,
}

impl MockIntakeRepository {
    pub fn with_intakes(intakes: Vec<(Intake, Vec<StorageLine>)>) -> Self {
        let repo = Self::default();
        {
            let mut stored = repo.intakes.lock();
            let mut stored_lines = repo.lines.lock();
            for (intake, lines) in intakes {
                repo.next_intake_id.fetch_max(intake.id, Ordering::SeqCst);
                stored.insert(intake.id, intake);
                for line in lines {
                    repo.next_line_id.fetch_max(line.id, Ordering::SeqCst);
                    stored_lines.insert(line.id, line);
                }
            }
        }
        repo
    }

    pub fn watermark(&self, intake_id: i64) -> Option<NaiveDate> {
        self.intakes
            .lock()
            .get(&intake_id)
            .and_then(|i| i.last_billed_date)
    }

    pub fn line(&self, line_id: i64) -> Option<StorageLine> {
        self.lines.lock().get(&line_id).cloned()
    }
}

#[async_trait]
impl Repository<Intake, i64> for MockIntakeRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Intake>, AppError> {
        Ok(self.intakes.lock().get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<Intake>, AppError> {
        let mut all: Vec<_> = self.intakes.lock().values().cloned().collect();
        all.sort_by_key(|i| i.id);
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.intakes.lock().len() as i64)
    }

    async fn create(&self, entity: &Intake) -> Result<Intake, AppError> {
        let mut intake = entity.clone();
        intake.id = self.next_intake_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.intakes.lock().insert(intake.id, intake.clone());
        Ok(intake)
    }

    async fn update(&self, entity: &Intake) -> Result<Intake, AppError> {
        let mut intakes = self.intakes.lock();
        if !intakes.contains_key(&entity.id) {
            return Err(AppError::NotFound(format!("intake {}", entity.id)));
        }
        intakes.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.intakes.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl IntakeRepository for MockIntakeRepository {
    async fn find_by_number(&self, number: &str) -> Result<Option<Intake>, AppError> {
        Ok(self
            .intakes
            .lock()
            .values()
            .find(|i| i.number == number)
            .cloned())
    }

    async fn find_lines(&self, intake_id: i64) -> Result<Vec<StorageLine>, AppError> {
        let mut lines: Vec<_> = self
            .lines
            .lock()
            .values()
            .filter(|l| l.intake_id == intake_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn create_line(&self, line: &StorageLine) -> Result<StorageLine, AppError> {
        let mut line = line.clone();
        line.id = self.next_line_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lines.lock().insert(line.id, line.clone());
        Ok(line)
    }

    async fn update_line(&self, line: &StorageLine) -> Result<StorageLine, AppError> {
        let mut lines = self.lines.lock();
        if !lines.contains_key(&line.id) {
            return Err(AppError::NotFound(format!("storage line {}", line.id)));
        }
        lines.insert(line.id, line.clone());
        Ok(line.clone())
    }

    async fn find_eligible_for_billing(
        &self,
        query: &EligibilityQuery,
    ) -> Result<Vec<Intake>, AppError> {
        let mut eligible: Vec<_> = self
            .intakes
            .lock()
            .values()
            .filter(|i| i.company_id == query.company_id && i.state.is_active())
            .filter(|i| {
                query.customer_ids.is_empty() || query.customer_ids.contains(&i.customer_id)
            })
            .filter(|i| {
                query.contract_ids.is_empty()
                    || i.contract_id
                        .map(|c| query.contract_ids.contains(&c))
                        .unwrap_or(false)
            })
            .filter(|i| {
                let check_in = i.checked_in_at.date_naive();
                if query.unbilled_only {
                    let unbilled = i
                        .last_billed_date
                        .map(|w| w < query.date_from)
                        .unwrap_or(true);
                    unbilled && check_in <= query.date_to
                } else {
                    check_in >= query.date_from && check_in <= query.date_to
                }
            })
            .cloned()
            .collect();
        eligible.sort_by_key(|i| (i.customer_id, i.checked_in_at, i.id));
        Ok(eligible)
    }

    async fn count_active(&self, company_id: i64) -> Result<i64, AppError> {
        Ok(self
            .intakes
            .lock()
            .values()
            .filter(|i| i.company_id == company_id && i.state.is_active())
            .count() as i64)
    }

    async fn count_checked_in_between(
        &self,
        company_id: i64,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<i64, AppError> {
        Ok(self
            .intakes
            .lock()
            .values()
            .filter(|i| i.company_id == company_id && i.state.is_active())
            .filter(|i| {
                let check_in = i.checked_in_at.date_naive();
                check_in >= date_from && check_in <= date_to
            })
            .count() as i64)
    }

    async fn advance_watermark(
        &self,
        intake_id: i64,
        expected: Option<NaiveDate>,
        new: NaiveDate,
    ) -> Result<bool, AppError> {
        let mut intakes = self.intakes.lock();
        match intakes.get_mut(&intake_id) {
            Some(intake) if intake.last_billed_date == expected => {
                intake.last_billed_date = Some(new);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::NotFound(format!("intake {intake_id}"))),
        }
    }

    async fn clear_watermark(&self, intake_id: i64) -> Result<(), AppError> {
        if let Some(intake) = self.intakes.lock().get_mut(&intake_id) {
            intake.last_billed_date = None;
        }
        Ok(())
    }

    async fn find_watermarked_active(&self, company_id: i64) -> Result<Vec<Intake>, AppError> {
        let mut found: Vec<_> = self
            .intakes
            .lock()
            .values()
            .filter(|i| {
                i.company_id == company_id && i.state.is_active() && i.last_billed_date.is_some()
            })
            .cloned()
            .collect();
        found.sort_by_key(|i| i.id);
        Ok(found)
    }
}

/// In-memory release repository.
#[derive(Default)]
pub struct MockReleaseRepository {
    releases: Mutex<HashMap<i64, Release>>,
    lines: Mutex<HashMap<i64, ReleaseLine>>,
    next_release_id: AtomicI64,
    next_line_id: AtomicI64,
}

#[async_trait]
impl Repository<Release, i64> for MockReleaseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Release>, AppError> {
        Ok(self.releases.lock().get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<Release>, AppError> {
        let mut all: Vec<_> = self.releases.lock().values().cloned().collect();
        all.sort_by_key(|r| r.id);
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.releases.lock().len() as i64)
    }

    async fn create(&self, entity: &Release) -> Result<Release, AppError> {
        let mut release = entity.clone();
        release.id = self.next_release_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.releases.lock().insert(release.id, release.clone());
        Ok(release)
    }

    async fn update(&self, entity: &Release) -> Result<Release, AppError> {
        let mut releases = self.releases.lock();
        if !releases.contains_key(&entity.id) {
            return Err(AppError::NotFound(format!("release {}", entity.id)));
        }
        releases.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.releases.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl ReleaseRepository for MockReleaseRepository {
    async fn find_by_number(&self, number: &str) -> Result<Option<Release>, AppError> {
        Ok(self
            .releases
            .lock()
            .values()
            .find(|r| r.number == number)
            .cloned())
    }

    async fn find_lines(&self, release_id: i64) -> Result<Vec<ReleaseLine>, AppError> {
        let mut lines: Vec<_> = self
            .lines
            .lock()
            .values()
            .filter(|l| l.release_id == release_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn create_line(&self, line: &ReleaseLine) -> Result<ReleaseLine, AppError> {
        let mut line = line.clone();
        line.id = self.next_line_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lines.lock().insert(line.id, line.clone());
        Ok(line)
    }

    async fn find_by_intake(&self, intake_id: i64) -> Result<Vec<Release>, AppError> {
        let mut found: Vec<_> = self
            .releases
            .lock()
            .values()
            .filter(|r| r.intake_id == intake_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(found)
    }
}

/// In-memory contract repository.
#[derive(Default)]
pub struct MockContractRepository {
    contracts: Mutex<HashMap<i64, StorageContract>>,
}

impl MockContractRepository {
    pub fn with_contracts(contracts: Vec<StorageContract>) -> Self {
        let repo = Self::default();
        {
            let mut stored = repo.contracts.lock();
            for contract in contracts {
                stored.insert(contract.id, contract);
            }
        }
        repo
    }

    pub fn next_invoice_date(&self, contract_id: i64) -> Option<NaiveDate> {
        self.contracts
            .lock()
            .get(&contract_id)
            .and_then(|c| c.next_invoice_date)
    }
}

#[async_trait]
impl Repository<StorageContract, i64> for MockContractRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<StorageContract>, AppError> {
        Ok(self.contracts.lock().get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<StorageContract>, AppError> {
        let mut all: Vec<_> = self.contracts.lock().values().cloned().collect();
        all.sort_by_key(|c| c.id);
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.contracts.lock().len() as i64)
    }

    async fn create(&self, entity: &StorageContract) -> Result<StorageContract, AppError> {
        let mut contracts = self.contracts.lock();
        let mut contract = entity.clone();
        contract.id = contracts.keys().max().copied().unwrap_or(0) + 1;
        contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn update(&self, entity: &StorageContract) -> Result<StorageContract, AppError> {
        let mut contracts = self.contracts.lock();
        if !contracts.contains_key(&entity.id) {
            return Err(AppError::NotFound(format!("contract {}", entity.id)));
        }
        contracts.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.contracts.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl ContractRepository for MockContractRepository {
    async fn find_by_number(&self, number: &str) -> Result<Option<StorageContract>, AppError> {
        Ok(self
            .contracts
            .lock()
            .values()
            .find(|c| c.number == number)
            .cloned())
    }

    async fn find_due(&self, today: NaiveDate) -> Result<Vec<StorageContract>, AppError> {
        let mut due: Vec<_> = self
            .contracts
            .lock()
            .values()
            .filter(|c| c.is_due(today))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.id);
        Ok(due)
    }

    async fn update_next_invoice_date(
        &self,
        contract_id: i64,
        next: NaiveDate,
    ) -> Result<(), AppError> {
        match self.contracts.lock().get_mut(&contract_id) {
            Some(contract) => {
                contract.next_invoice_date = Some(next);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("contract {contract_id}"))),
        }
    }
}

/// In-memory temperature log repository.
#[derive(Default)]
pub struct MockTemperatureLogRepository {
    logs: Mutex<Vec<TemperatureLog>>,
}

#[async_trait]
impl TemperatureLogRepository for MockTemperatureLogRepository {
    async fn create(&self, log: &TemperatureLog) -> Result<TemperatureLog, AppError> {
        let mut logs = self.logs.lock();
        let mut log = log.clone();
        log.id = logs.len() as i64 + 1;
        logs.push(log.clone());
        Ok(log)
    }

    async fn find_by_location(
        &self,
        location_id: i64,
        limit: i64,
    ) -> Result<Vec<TemperatureLog>, AppError> {
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|l| l.location_id == location_id)
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_intake(&self, intake_id: i64) -> Result<Vec<TemperatureLog>, AppError> {
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|l| l.intake_id == Some(intake_id))
            .rev()
            .cloned()
            .collect())
    }
}

/// Intake fixture in the checked-in state.
pub fn checked_in_intake(id: i64, customer_id: i64, checked_in_at: DateTime<Utc>) -> Intake {
    Intake {
        id,
        number: format!("INT-{id:04}"),
        customer_id,
        location_id: 3,
        contract_id: None,
        company_id: 1,
        checked_in_at,
        planned_out: None,
        temperature_target: -18.0,
        state: IntakeState::CheckedIn,
        last_billed_date: None,
        currency: "USD".into(),
        note: None,
        created_at: checked_in_at,
        updated_at: checked_in_at,
    }
}

/// Storage line fixture priced under `rule`.
pub fn priced_line(
    id: i64,
    intake_id: i64,
    weight: f64,
    rule: &TariffRule,
    checked_in_at: DateTime<Utc>,
) -> StorageLine {
    StorageLine {
        id,
        intake_id,
        product_id: 55,
        product_category_id: None,
        lot: Some("LOT-A".into()),
        qty_in: weight,
        qty_out: 0.0,
        uom: "kg".into(),
        weight,
        volume: 0.0,
        pallet_count: 0.0,
        checked_in_at,
        released_at: None,
        tariff_rule_id: Some(rule.id),
        price_unit: rule.price_unit,
        bill_basis: Some(rule.basis),
        subtotal: Decimal::ZERO,
        remark: None,
    }
}

/// Release fixture in the draft state.
pub fn draft_release(id: i64, intake_id: i64, customer_id: i64) -> Release {
    let now = fixed_now();
    Release {
        id,
        number: format!("REL-{id:04}"),
        intake_id,
        customer_id,
        company_id: 1,
        released_at: now,
        state: ReleaseState::Draft,
        currency: "USD".into(),
        gate_entry_id: None,
        vehicle_number: None,
        driver_name: None,
        created_at: now,
        updated_at: now,
    }
}
