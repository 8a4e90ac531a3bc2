use crate::core::aggregator::{aggregate, AggregationKey};
use crate::core::contribution;
use crate::core::run_lock::RunLock;
use crate::domain::{CalculationOutcome, ContributionResult, ContributionStore, JurisdictionStandard};
use crate::utils::error::{CalcError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Every run replaces the whole result set, so all runs share one lock scope.
const RESULTS_LOCK_SCOPE: &str = "contribution-results";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// How a run's results reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Clear, then write row by row. A failed write leaves the rows already
    /// written in place and the outcome reports how many made it.
    #[default]
    PerRow,
    /// Hand the whole set to `ContributionStore::replace_results`.
    Atomic,
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "per_row" | "per-row" => Ok(WriteMode::PerRow),
            "atomic" => Ok(WriteMode::Atomic),
            other => Err(format!("unknown write mode '{}', expected per_row or atomic", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub aggregation_key: AggregationKey,
    pub write_mode: WriteMode,
    pub timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            aggregation_key: AggregationKey::default(),
            write_mode: WriteMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

pub struct ContributionEngine<S: ContributionStore> {
    store: S,
    options: EngineOptions,
    run_lock: RunLock,
}

impl<S: ContributionStore> ContributionEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, EngineOptions::default())
    }

    pub fn with_options(store: S, options: EngineOptions) -> Self {
        Self::with_run_lock(store, options, RunLock::new())
    }

    /// Engines built over the same data must share one `RunLock` for their
    /// runs to exclude each other.
    pub fn with_run_lock(store: S, options: EngineOptions, run_lock: RunLock) -> Self {
        Self {
            store,
            options,
            run_lock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn run_lock(&self) -> &RunLock {
        &self.run_lock
    }

    /// Recomputes every employee's contribution against the standard for
    /// `jurisdiction` (and `year`, or the latest year when `None`) and
    /// replaces the stored result set. Never fails past this boundary: all
    /// errors come back as an unsuccessful outcome with a readable message.
    pub async fn calculate(&self, jurisdiction: &str, year: Option<&str>) -> CalculationOutcome {
        let jurisdiction = jurisdiction.trim();
        let year = year.map(str::trim).filter(|y| !y.is_empty());

        let _guard = match self.run_lock.try_acquire(RESULTS_LOCK_SCOPE) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("⏳ Rejected calculation for {}: {}", jurisdiction, e);
                return CalculationOutcome::failure(e.to_string());
            }
        };

        let deadline = Instant::now() + self.options.timeout;
        let error = match self.run(jurisdiction, year, deadline).await {
            Ok(outcome) => return outcome,
            Err(e) => e,
        };

        tracing::error!(
            "❌ Calculation failed: {} (Category: {:?}, Severity: {:?})",
            error,
            error.category(),
            error.severity()
        );
        let message = match &error {
            CalcError::StandardNotFound { .. } => error.to_string(),
            _ => format!(
                "calculation for {} ({}) failed: {}",
                jurisdiction,
                year.unwrap_or("latest year"),
                error.user_friendly_message()
            ),
        };
        CalculationOutcome::failure(message)
    }

    /// Awaits one store step, giving up once the run's deadline passes.
    async fn before_deadline<T>(
        &self,
        deadline: Instant,
        step: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout_at(deadline, step).await {
            Ok(result) => result,
            Err(_) => Err(CalcError::upstream(
                "finish the calculation run",
                format!("timed out after {:?}", self.options.timeout),
            )),
        }
    }

    async fn run(
        &self,
        jurisdiction: &str,
        year: Option<&str>,
        deadline: Instant,
    ) -> Result<CalculationOutcome> {
        let (results, standard) = self
            .before_deadline(deadline, self.prepare(jurisdiction, year))
            .await?;

        match self.options.write_mode {
            WriteMode::PerRow => self.write_per_row(results, standard, deadline).await,
            WriteMode::Atomic => {
                let written = self
                    .before_deadline(deadline, self.store.replace_results(results))
                    .await?;
                Ok(Self::completed(written, standard))
            }
        }
    }

    /// Fetches, aggregates and computes. Touches nothing in the store.
    async fn prepare(
        &self,
        jurisdiction: &str,
        year: Option<&str>,
    ) -> Result<(Vec<ContributionResult>, JurisdictionStandard)> {
        tracing::info!(
            "🚀 Starting contribution run for {} ({})",
            jurisdiction,
            year.unwrap_or("latest year")
        );

        let salaries = self.store.fetch_all_salaries().await?;
        tracing::info!("📥 Fetched {} salary records", salaries.len());

        let groups = aggregate(&salaries, self.options.aggregation_key);
        tracing::debug!(
            "Aggregated into {} employees by {:?}",
            groups.len(),
            self.options.aggregation_key
        );

        let standard = self
            .store
            .fetch_standard(jurisdiction, year)
            .await?
            .ok_or_else(|| CalcError::StandardNotFound {
                jurisdiction: jurisdiction.to_string(),
                year: year.map(str::to_string),
            })?;
        tracing::info!(
            "📐 Using standard {} {}: base {}..{}, rate {}",
            standard.jurisdiction_name,
            standard.year,
            standard.base_min,
            standard.base_max,
            standard.rate
        );

        let computed_at = Utc::now();
        let mut results = Vec::with_capacity(groups.len());
        for group in groups.values() {
            if let Some(result) =
                contribution::compute(&group.employee_name, &group.amounts, &standard, computed_at)?
            {
                results.push(result);
            }
        }
        results.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));

        Ok((results, standard))
    }

    async fn write_per_row(
        &self,
        results: Vec<ContributionResult>,
        standard: JurisdictionStandard,
        deadline: Instant,
    ) -> Result<CalculationOutcome> {
        self.before_deadline(deadline, self.store.clear_results()).await?;
        tracing::debug!("Cleared previous results");

        let total = results.len();
        let mut written = Vec::with_capacity(total);
        for result in results {
            match self
                .before_deadline(deadline, self.store.write_result(result))
                .await
            {
                Ok(stored) => written.push(stored),
                Err(e) => {
                    tracing::error!(
                        "❌ Result write failed after {} of {} rows: {}",
                        written.len(),
                        total,
                        e
                    );
                    return Ok(CalculationOutcome {
                        success: false,
                        message: format!(
                            "wrote {} of {} results before the run stopped: {}",
                            written.len(),
                            total,
                            e.user_friendly_message()
                        ),
                        processed: written.len(),
                        results: written,
                        standard_used: Some(standard),
                    });
                }
            }
        }

        Ok(Self::completed(written, standard))
    }

    fn completed(written: Vec<ContributionResult>, standard: JurisdictionStandard) -> CalculationOutcome {
        tracing::info!("✅ Calculated contributions for {} employees", written.len());
        CalculationOutcome {
            success: true,
            message: format!("calculated contributions for {} employees", written.len()),
            processed: written.len(),
            results: written,
            standard_used: Some(standard),
        }
    }
}
