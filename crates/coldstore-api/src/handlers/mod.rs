//! HTTP request handlers

pub mod billing;
pub mod contract;
pub mod gate;
pub mod health;
pub mod intake;
pub mod release;
pub mod tariff;

pub use billing::configure as configure_billing;
pub use contract::configure as configure_contracts;
pub use gate::configure as configure_gate_entries;
pub use health::configure as configure_health;
pub use intake::configure as configure_intakes;
pub use release::configure as configure_releases;
pub use tariff::configure as configure_tariffs;
