//! Intake service
//!
//! Owns the intake lifecycle: creation with tariff auto-matching, check-in
//! with gate-in stock moves, charge recomputation, temperature readings and
//! the closing/cancelling transitions.

use coldstore_core::{
    models::{
        intake::compute_line_subtotal, tariff::match_rule, Intake, IntakeState, IntakeTotals,
        StorageLine, TariffRule, TemperatureLog, TemperatureStatus,
    },
    traits::{
        Clock, IntakeRepository, Sequencer, StockMover, StockMoveRequest, TariffRepository,
        TemperatureLogRepository,
    },
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::constants::{CUSTOMERS_LOCATION_ID, INTAKE_SERIES};

/// Input for creating an intake
#[derive(Debug, Clone)]
pub struct NewIntake {
    pub customer_id: i64,
    pub location_id: i64,
    pub contract_id: Option<i64>,
    pub company_id: i64,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub planned_out: Option<DateTime<Utc>>,
    pub temperature_target: f64,
    pub currency: String,
    pub note: Option<String>,
    pub lines: Vec<NewStorageLine>,
}

/// Input for one storage line
#[derive(Debug, Clone)]
pub struct NewStorageLine {
    pub product_id: i64,
    pub product_category_id: Option<i64>,
    pub lot: Option<String>,
    pub qty_in: f64,
    pub uom: String,
    pub weight: f64,
    pub volume: f64,
    pub pallet_count: f64,
    /// Preset rule; auto-matching never overrides it
    pub tariff_rule_id: Option<i64>,
    /// Rate override; when unset the rule's rate is snapshotted
    pub price_unit: Option<Decimal>,
    pub remark: Option<String>,
}

/// Input for a temperature reading
#[derive(Debug, Clone)]
pub struct NewTemperatureReading {
    pub intake_id: Option<i64>,
    pub location_id: i64,
    pub recorded_at: Option<DateTime<Utc>>,
    pub temperature: f64,
    pub sensor_ref: Option<String>,
    pub company_id: i64,
}

/// Intake business logic
pub struct IntakeService {
    intake_repo: Arc<dyn IntakeRepository>,
    tariff_repo: Arc<dyn TariffRepository>,
    temperature_repo: Arc<dyn TemperatureLogRepository>,
    sequencer: Arc<dyn Sequencer>,
    stock_mover: Arc<dyn StockMover>,
    clock: Arc<dyn Clock>,
}

impl IntakeService {
    pub fn new(
        intake_repo: Arc<dyn IntakeRepository>,
        tariff_repo: Arc<dyn TariffRepository>,
        temperature_repo: Arc<dyn TemperatureLogRepository>,
        sequencer: Arc<dyn Sequencer>,
        stock_mover: Arc<dyn StockMover>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intake_repo,
            tariff_repo,
            temperature_repo,
            sequencer,
            stock_mover,
            clock,
        }
    }

    /// Create a draft intake with its lines. Each line is matched against
    /// the active tariff rules unless a rule was preset on it; matched rates
    /// are snapshotted and lifetime subtotals computed immediately.
    #[instrument(skip(self, input), fields(customer_id = input.customer_id))]
    pub async fn create(&self, input: NewIntake) -> AppResult<(Intake, Vec<StorageLine>)> {
        if input.lines.is_empty() {
            return Err(AppError::Validation(
                "intake requires at least one storage line".into(),
            ));
        }

        let now = self.clock.now();
        let checked_in_at = input.checked_in_at.unwrap_or(now);
        let number = self.sequencer.next_document_number(INTAKE_SERIES).await?;

        let intake = Intake {
            id: 0,
            number,
            customer_id: input.customer_id,
            location_id: input.location_id,
            contract_id: input.contract_id,
            company_id: input.company_id,
            checked_in_at,
            planned_out: input.planned_out,
            temperature_target: input.temperature_target,
            state: IntakeState::Draft,
            last_billed_date: None,
            currency: input.currency,
            note: input.note,
            created_at: now,
            updated_at: now,
        };

        let intake = self.intake_repo.create(&intake).await?;
        info!("Created intake {} for customer {}", intake.number, intake.customer_id);

        let rules = self.tariff_repo.find_active(input.company_id).await?;
        let mut lines = Vec::with_capacity(input.lines.len());

        for new_line in input.lines {
            let mut line = StorageLine {
                id: 0,
                intake_id: intake.id,
                product_id: new_line.product_id,
                product_category_id: new_line.product_category_id,
                lot: new_line.lot,
                qty_in: new_line.qty_in,
                qty_out: 0.0,
                uom: new_line.uom,
                weight: new_line.weight,
                volume: new_line.volume,
                pallet_count: new_line.pallet_count,
                checked_in_at,
                released_at: None,
                tariff_rule_id: None,
                price_unit: Decimal::ZERO,
                bill_basis: None,
                subtotal: Decimal::ZERO,
                remark: new_line.remark,
            };
            line.validate()?;

            let rule = self
                .resolve_rule(&line, new_line.tariff_rule_id, &rules, intake.temperature_target)
                .await?;
            if let Some(ref rule) = rule {
                line.assign_rule(rule);
            } else {
                warn!(
                    "No tariff rule matched product {} on intake {}",
                    line.product_id, intake.number
                );
            }
            if let Some(price_unit) = new_line.price_unit {
                line.price_unit = price_unit;
            }
            line.recompute_subtotal(rule.as_ref(), now);

            lines.push(self.intake_repo.create_line(&line).await?);
        }

        Ok((intake, lines))
    }

    /// A preset rule wins over auto-matching; otherwise first match in
    /// ascending sequence order.
    async fn resolve_rule(
        &self,
        line: &StorageLine,
        preset_rule_id: Option<i64>,
        rules: &[TariffRule],
        temperature_target: f64,
    ) -> AppResult<Option<TariffRule>> {
        match preset_rule_id {
            Some(rule_id) => {
                let rule = self
                    .tariff_repo
                    .find_by_id(rule_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("tariff rule {rule_id}")))?;
                Ok(Some(rule))
            }
            None => Ok(match_rule(rules, line, temperature_target).cloned()),
        }
    }

    /// Check an intake in: goods enter the freezer location from the
    /// customers counterpart location, one stock move per line.
    #[instrument(skip(self))]
    pub async fn check_in(&self, intake_id: i64) -> AppResult<Intake> {
        let mut intake = self.get_intake(intake_id).await?;
        intake.check_in()?;

        let lines = self.intake_repo.find_lines(intake_id).await?;
        for line in &lines {
            self.stock_mover
                .move_goods(&StockMoveRequest {
                    reference: intake.number.clone(),
                    product_id: line.product_id,
                    lot: line.lot.clone(),
                    qty: line.qty_in,
                    uom: line.uom.clone(),
                    source_location_id: CUSTOMERS_LOCATION_ID,
                    dest_location_id: intake.location_id,
                    company_id: intake.company_id,
                })
                .await?;
        }

        let intake = self.intake_repo.update(&intake).await?;
        info!("Checked in intake {}", intake.number);
        Ok(intake)
    }

    /// Cancel an intake. Not permitted once closed.
    #[instrument(skip(self))]
    pub async fn cancel(&self, intake_id: i64) -> AppResult<Intake> {
        let mut intake = self.get_intake(intake_id).await?;
        intake.cancel()?;
        let intake = self.intake_repo.update(&intake).await?;
        info!("Cancelled intake {}", intake.number);
        Ok(intake)
    }

    /// Close an intake once every line is fully released.
    #[instrument(skip(self))]
    pub async fn close(&self, intake_id: i64) -> AppResult<Intake> {
        let mut intake = self.get_intake(intake_id).await?;
        let lines = self.intake_repo.find_lines(intake_id).await?;
        intake.close(&lines)?;
        let intake = self.intake_repo.update(&intake).await?;
        info!("Closed intake {}", intake.number);
        Ok(intake)
    }

    /// Recompute every line's lifetime subtotal from its assigned rule and
    /// the current time. Released lines keep their frozen span.
    #[instrument(skip(self))]
    pub async fn recompute_charges(&self, intake_id: i64) -> AppResult<IntakeTotals> {
        let intake = self.get_intake(intake_id).await?;
        let lines = self.intake_repo.find_lines(intake_id).await?;
        let now = self.clock.now();

        let mut updated = Vec::with_capacity(lines.len());
        for mut line in lines {
            let rule = match line.tariff_rule_id {
                Some(rule_id) => self.tariff_repo.find_by_id(rule_id).await?,
                None => None,
            };
            let subtotal = compute_line_subtotal(&line, rule.as_ref(), now);
            if subtotal != line.subtotal {
                line.subtotal = subtotal;
                line = self.intake_repo.update_line(&line).await?;
            }
            updated.push(line);
        }

        let totals = Intake::totals(&updated);
        debug!(
            "Recomputed charges for intake {}: {} {}",
            intake.number, totals.amount, intake.currency
        );
        Ok(totals)
    }

    /// Fetch an intake with its lines and aggregated totals.
    #[instrument(skip(self))]
    pub async fn get_with_lines(
        &self,
        intake_id: i64,
    ) -> AppResult<(Intake, Vec<StorageLine>, IntakeTotals)> {
        let intake = self.get_intake(intake_id).await?;
        let lines = self.intake_repo.find_lines(intake_id).await?;
        let totals = Intake::totals(&lines);
        Ok((intake, lines, totals))
    }

    /// List intakes with pagination.
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Intake>> {
        self.intake_repo.find_all(limit, offset).await
    }

    /// Total number of intakes.
    pub async fn count(&self) -> AppResult<i64> {
        self.intake_repo.count().await
    }

    /// Recent temperature readings for a location.
    pub async fn temperature_for_location(
        &self,
        location_id: i64,
        limit: i64,
    ) -> AppResult<Vec<TemperatureLog>> {
        self.temperature_repo.find_by_location(location_id, limit).await
    }

    /// Temperature readings recorded against an intake.
    pub async fn temperature_for_intake(&self, intake_id: i64) -> AppResult<Vec<TemperatureLog>> {
        self.temperature_repo.find_by_intake(intake_id).await
    }

    /// Record a temperature reading, classified against the monitored
    /// intake's target (or 0°C when unattached).
    #[instrument(skip(self, input))]
    pub async fn record_temperature(
        &self,
        input: NewTemperatureReading,
    ) -> AppResult<TemperatureLog> {
        let now = self.clock.now();
        let target = match input.intake_id {
            Some(intake_id) => self.get_intake(intake_id).await?.temperature_target,
            None => 0.0,
        };

        let log = TemperatureLog {
            id: 0,
            intake_id: input.intake_id,
            location_id: input.location_id,
            recorded_at: input.recorded_at.unwrap_or(now),
            temperature: input.temperature,
            sensor_ref: input.sensor_ref,
            status: TemperatureStatus::classify(input.temperature, target),
            company_id: input.company_id,
        };
        log.validate(now)?;

        if log.status == TemperatureStatus::Critical {
            warn!(
                "Critical temperature {}°C at location {} (target {}°C)",
                log.temperature, log.location_id, target
            );
        }

        self.temperature_repo.create(&log).await
    }

    async fn get_intake(&self, intake_id: i64) -> AppResult<Intake> {
        self.intake_repo
            .find_by_id(intake_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("intake {intake_id}")))
    }
}
