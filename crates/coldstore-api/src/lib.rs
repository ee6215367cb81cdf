//! HTTP API layer for ColdStore
//!
//! Actix-web handlers and DTOs for the cold-storage billing API.

pub mod dto;
pub mod handlers;

pub use dto::{ApiResponse, PaginationParams};

pub use handlers::{
    configure_billing, configure_contracts, configure_gate_entries, configure_health,
    configure_intakes, configure_releases, configure_tariffs,
};
