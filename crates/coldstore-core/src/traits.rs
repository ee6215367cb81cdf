//! Common traits for repositories and collaborators
//!
//! Defines abstractions for database access and for the external documents
//! billing touches (stock moves, invoices, document numbers).

use crate::error::AppError;
use crate::models::{
    EligibilityQuery, GateEntry, Intake, InvoiceHandle, Release, ReleaseLine, StorageContract,
    StorageLine, TariffRule, TemperatureLog,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Tariff rule repository trait with specialized methods
#[async_trait]
pub trait TariffRepository: Repository<TariffRule, i64> {
    /// Active rules for a company, in ascending sequence order
    async fn find_active(&self, company_id: i64) -> Result<Vec<TariffRule>, AppError>;

    /// Search rules by name
    async fn search(
        &self,
        company_id: i64,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TariffRule>, i64), AppError>;
}

/// Intake repository trait with specialized methods
#[async_trait]
pub trait IntakeRepository: Repository<Intake, i64> {
    /// Find intake by document number
    async fn find_by_number(&self, number: &str) -> Result<Option<Intake>, AppError>;

    /// Lines belonging to an intake
    async fn find_lines(&self, intake_id: i64) -> Result<Vec<StorageLine>, AppError>;

    /// Persist a new line
    async fn create_line(&self, line: &StorageLine) -> Result<StorageLine, AppError>;

    /// Persist line changes (quantities, release time, subtotal)
    async fn update_line(&self, line: &StorageLine) -> Result<StorageLine, AppError>;

    /// Intakes eligible for a billing run, per the query's window, watermark
    /// and filter settings
    async fn find_eligible_for_billing(
        &self,
        query: &EligibilityQuery,
    ) -> Result<Vec<Intake>, AppError>;

    /// Count of active intakes for a company, for eligibility diagnosis
    async fn count_active(&self, company_id: i64) -> Result<i64, AppError>;

    /// Count of active intakes checked in within a window, for eligibility
    /// diagnosis
    async fn count_checked_in_between(
        &self,
        company_id: i64,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<i64, AppError>;

    /// Advance the billing watermark, compare-and-swap against the value
    /// read at selection time. Returns false when another run moved it
    /// first; the caller must then treat the intake as already billed.
    async fn advance_watermark(
        &self,
        intake_id: i64,
        expected: Option<NaiveDate>,
        new: NaiveDate,
    ) -> Result<bool, AppError>;

    /// Clear the billing watermark
    async fn clear_watermark(&self, intake_id: i64) -> Result<(), AppError>;

    /// Active intakes carrying a watermark, for the reset sweep
    async fn find_watermarked_active(&self, company_id: i64) -> Result<Vec<Intake>, AppError>;
}

/// Release repository trait with specialized methods
#[async_trait]
pub trait ReleaseRepository: Repository<Release, i64> {
    /// Find release by document number
    async fn find_by_number(&self, number: &str) -> Result<Option<Release>, AppError>;

    /// Lines belonging to a release
    async fn find_lines(&self, release_id: i64) -> Result<Vec<ReleaseLine>, AppError>;

    /// Persist a new line
    async fn create_line(&self, line: &ReleaseLine) -> Result<ReleaseLine, AppError>;

    /// Releases against an intake, newest first
    async fn find_by_intake(&self, intake_id: i64) -> Result<Vec<Release>, AppError>;
}

/// Contract repository trait with specialized methods
#[async_trait]
pub trait ContractRepository: Repository<StorageContract, i64> {
    /// Find contract by document number
    async fn find_by_number(&self, number: &str) -> Result<Option<StorageContract>, AppError>;

    /// Active, non-manual contracts whose next invoice date has passed
    async fn find_due(&self, today: NaiveDate) -> Result<Vec<StorageContract>, AppError>;

    /// Move the next invoice date after a successful cycle billing
    async fn update_next_invoice_date(
        &self,
        contract_id: i64,
        next: NaiveDate,
    ) -> Result<(), AppError>;
}

/// Gate entry repository trait
#[async_trait]
pub trait GateEntryRepository: Repository<GateEntry, i64> {
    /// Entries for an intake or release document
    async fn find_by_document(
        &self,
        intake_id: Option<i64>,
        release_id: Option<i64>,
    ) -> Result<Vec<GateEntry>, AppError>;
}

/// Temperature log repository trait
#[async_trait]
pub trait TemperatureLogRepository: Send + Sync {
    /// Persist a reading
    async fn create(&self, log: &TemperatureLog) -> Result<TemperatureLog, AppError>;

    /// Readings for a location, newest first
    async fn find_by_location(
        &self,
        location_id: i64,
        limit: i64,
    ) -> Result<Vec<TemperatureLog>, AppError>;

    /// Readings for an intake, newest first
    async fn find_by_intake(&self, intake_id: i64) -> Result<Vec<TemperatureLog>, AppError>;
}

/// Document number generator
#[async_trait]
pub trait Sequencer: Send + Sync {
    /// Next number in a named series, e.g. "intake" -> "INT-0042"
    async fn next_document_number(&self, series: &str) -> Result<String, AppError>;
}

/// Request to move goods between locations
#[derive(Debug, Clone)]
pub struct StockMoveRequest {
    pub reference: String,
    pub product_id: i64,
    pub lot: Option<String>,
    pub qty: f64,
    pub uom: String,
    pub source_location_id: i64,
    pub dest_location_id: i64,
    pub company_id: i64,
}

/// Reference to a completed stock move
#[derive(Debug, Clone)]
pub struct MoveHandle {
    pub id: i64,
}

/// Warehouse inventory collaborator
#[async_trait]
pub trait StockMover: Send + Sync {
    /// Execute a stock move; fails when the source lacks quantity
    async fn move_goods(&self, request: &StockMoveRequest) -> Result<MoveHandle, AppError>;
}

/// One line of an invoice to be created
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLineDraft {
    /// Service product invoiced
    pub product_id: i64,

    /// Human-readable charge description
    pub description: String,

    /// Amount for the line (quantity 1 at this price)
    pub amount: Decimal,

    /// Income account resolved for the service product
    pub account: String,
}

/// An invoice to be created by the accounting collaborator
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDraft {
    pub customer_id: i64,
    pub company_id: i64,
    pub currency: String,

    /// Back-reference to the source document(s), used by the watermark
    /// reset sweep to detect deleted invoices
    pub reference: String,

    pub invoice_date: NaiveDate,
    pub lines: Vec<InvoiceLineDraft>,
}

/// Accounting collaborator that issues customer invoices
#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    /// Create an invoice document
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<InvoiceHandle, AppError>;

    /// Whether a non-cancelled invoice referencing the given document exists
    async fn has_active_invoice(&self, reference: &str) -> Result<bool, AppError>;
}

/// Resolves the income account for a service product
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Income account for a service product, from the product or its
    /// category. `None` means billing must fail with a diagnosed error.
    async fn resolve_income_account(
        &self,
        service_product_id: i64,
    ) -> Result<Option<String>, AppError>;
}

/// Clock abstraction so duration math is testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000);
        assert_eq!(p.per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }
}
