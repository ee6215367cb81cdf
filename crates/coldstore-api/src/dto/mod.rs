//! Request and response DTOs

pub mod billing;
pub mod common;
pub mod contract;
pub mod gate;
pub mod intake;
pub mod release;
pub mod tariff;

pub use common::{ApiResponse, PaginationParams};
