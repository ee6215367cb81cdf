//! Domain models for ColdStore
//!
//! Pure data types and the business rules that operate on them. No I/O here;
//! persistence lives behind the traits in [`crate::traits`].

pub mod billing_run;
pub mod contract;
pub mod gate_entry;
pub mod intake;
pub mod release;
pub mod tariff;
pub mod temperature;

pub use billing_run::{
    BillingPreviewLine, EligibilityQuery, InvoiceGrouping, InvoiceHandle, RunCriteria, RunFailure,
    RunOutcome,
};
pub use contract::{ContractState, InvoiceCycle, PricingModel, StorageContract};
pub use gate_entry::{GateEntry, GateEntryState, GateEntryType};
pub use intake::{Intake, IntakeState, IntakeTotals, StorageLine};
pub use release::{Release, ReleaseLine, ReleaseState};
pub use tariff::{BillingBasis, RoundingPolicy, TariffRule};
pub use temperature::{TemperatureLog, TemperatureStatus};
