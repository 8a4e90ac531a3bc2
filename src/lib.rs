pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use crate::adapters::{LocalStore, MemoryStore};
pub use crate::core::aggregator::{aggregate, AggregationKey};
pub use crate::core::engine::{ContributionEngine, EngineOptions, WriteMode};
pub use crate::domain::{
    CalculationOutcome, ContributionResult, ContributionStore, JurisdictionStandard, SalaryRecord,
};
pub use crate::utils::error::{CalcError, Result};
