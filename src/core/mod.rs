//! Core module - Configuration, error handling, and common types

mod config;
mod error;
mod types;

pub use config::{Config, PowerRule, TariffTable, DEFAULT_TARIFF};
pub use error::{Error, Result};
pub use types::{
    Analysis, Comparison, CurrentBill, Offer, PowerVector, TariffCode, ValidationReport,
    MAX_PERIODS,
};
