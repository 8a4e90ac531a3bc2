pub mod aggregator;
pub mod contribution;
pub mod engine;
pub mod run_lock;

pub use crate::domain::{ContributionResult, ContributionStore, JurisdictionStandard, SalaryRecord};
pub use crate::utils::error::Result;
