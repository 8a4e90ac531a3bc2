use crate::domain::model::{ContributionResult, JurisdictionStandard, SalaryRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistence collaborator for salaries, standards and results.
///
/// Every method that touches the backing store reports failures as
/// `CalcError::UpstreamFailure`.
#[async_trait]
pub trait ContributionStore: Send + Sync {
    async fn fetch_all_salaries(&self) -> Result<Vec<SalaryRecord>>;

    async fn fetch_standard(
        &self,
        jurisdiction_name: &str,
        year: Option<&str>,
    ) -> Result<Option<JurisdictionStandard>>;

    async fn clear_results(&self) -> Result<()>;

    async fn write_result(&self, result: ContributionResult) -> Result<ContributionResult>;

    /// Clears and writes as one step. Stores that can swap atomically should
    /// override this; the default keeps the clear-then-write order.
    async fn replace_results(
        &self,
        results: Vec<ContributionResult>,
    ) -> Result<Vec<ContributionResult>> {
        self.clear_results().await?;
        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            stored.push(self.write_result(result).await?);
        }
        Ok(stored)
    }

    async fn insert_salaries(&self, salaries: Vec<SalaryRecord>) -> Result<usize>;

    async fn insert_standards(&self, standards: Vec<JurisdictionStandard>) -> Result<usize>;

    /// Newest year first.
    async fn list_standards(&self) -> Result<Vec<JurisdictionStandard>>;

    /// Ordered by employee name.
    async fn list_results(&self) -> Result<Vec<ContributionResult>>;
}
