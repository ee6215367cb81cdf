//! Business logic services for ColdStore
//!
//! This crate contains the business logic that orchestrates cold-storage
//! operations: intake lifecycle, releases with pro-rated charges, period
//! billing runs, and the scheduled contract sweep.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies behind the traits in `coldstore-core`
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `IntakeService` - Intake lifecycle, tariff matching, charge recompute
//! - `ReleaseService` - Releases with pro-rated charges and invoicing
//! - `BillingRunService` - Period billing runs with watermark control
//! - `ContractBillingSweep` - Scheduled billing of due contracts

pub mod billing_run;
pub mod contract_billing;
pub mod contract_service;
pub mod gate_service;
pub mod intake_service;
pub mod release_service;

#[cfg(test)]
pub(crate) mod testing;

pub use billing_run::BillingRunService;
pub use contract_billing::ContractBillingSweep;
pub use contract_service::ContractService;
pub use gate_service::GateEntryService;
pub use intake_service::IntakeService;
pub use release_service::ReleaseService;

/// Business logic constants
pub mod constants {
    /// Document series for intake numbers
    pub const INTAKE_SERIES: &str = "intake";

    /// Document series for release numbers
    pub const RELEASE_SERIES: &str = "release";

    /// Document series for contract numbers
    pub const CONTRACT_SERIES: &str = "contract";

    /// Location id for the customers counterpart location, the source of
    /// gate-in moves and the destination of gate-out moves
    pub const CUSTOMERS_LOCATION_ID: i64 = 1;
}
