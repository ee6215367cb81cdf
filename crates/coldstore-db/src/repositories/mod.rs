//! Repository implementations
//!
//! PostgreSQL-backed implementations of the repository traits defined in
//! `coldstore-core`.

pub mod contract_repo;
pub mod gate_repo;
pub mod intake_repo;
pub mod release_repo;
pub mod tariff_repo;
pub mod temperature_repo;

pub use contract_repo::PgContractRepository;
pub use gate_repo::PgGateEntryRepository;
pub use intake_repo::PgIntakeRepository;
pub use release_repo::PgReleaseRepository;
pub use tariff_repo::PgTariffRepository;
pub use temperature_repo::PgTemperatureLogRepository;
