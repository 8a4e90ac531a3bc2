// Domain layer: core models and ports (interfaces).

pub mod model;
pub mod ports;

pub use model::{CalculationOutcome, ContributionResult, JurisdictionStandard, SalaryRecord};
pub use ports::ContributionStore;
