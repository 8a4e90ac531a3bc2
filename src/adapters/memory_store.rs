use crate::domain::{ContributionResult, ContributionStore, JurisdictionStandard, SalaryRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    salaries: Vec<SalaryRecord>,
    standards: Vec<JurisdictionStandard>,
    results: Vec<ContributionResult>,
}

/// In-process store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(salaries: Vec<SalaryRecord>, standards: Vec<JurisdictionStandard>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables {
                salaries,
                standards,
                results: Vec::new(),
            })),
        }
    }
}

#[async_trait]
impl ContributionStore for MemoryStore {
    async fn fetch_all_salaries(&self) -> Result<Vec<SalaryRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.salaries.clone())
    }

    async fn fetch_standard(
        &self,
        jurisdiction_name: &str,
        year: Option<&str>,
    ) -> Result<Option<JurisdictionStandard>> {
        let tables = self.tables.lock().await;
        Ok(JurisdictionStandard::select(&tables.standards, jurisdiction_name, year).cloned())
    }

    async fn clear_results(&self) -> Result<()> {
        self.tables.lock().await.results.clear();
        Ok(())
    }

    async fn write_result(&self, result: ContributionResult) -> Result<ContributionResult> {
        self.tables.lock().await.results.push(result.clone());
        Ok(result)
    }

    async fn replace_results(
        &self,
        results: Vec<ContributionResult>,
    ) -> Result<Vec<ContributionResult>> {
        let mut tables = self.tables.lock().await;
        tables.results = results.clone();
        Ok(results)
    }

    async fn insert_salaries(&self, salaries: Vec<SalaryRecord>) -> Result<usize> {
        let count = salaries.len();
        self.tables.lock().await.salaries.extend(salaries);
        Ok(count)
    }

    async fn insert_standards(&self, standards: Vec<JurisdictionStandard>) -> Result<usize> {
        let count = standards.len();
        self.tables.lock().await.standards.extend(standards);
        Ok(count)
    }

    async fn list_standards(&self) -> Result<Vec<JurisdictionStandard>> {
        let mut standards = self.tables.lock().await.standards.clone();
        standards.sort_by(|a, b| b.year_key().cmp(&a.year_key()));
        Ok(standards)
    }

    async fn list_results(&self) -> Result<Vec<ContributionResult>> {
        let mut results = self.tables.lock().await.results.clone();
        results.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn result(name: &str) -> ContributionResult {
        ContributionResult {
            employee_name: name.to_string(),
            avg_salary: Decimal::from(1000),
            contribution_base: Decimal::from(1900),
            company_fee: Decimal::from(100),
            computed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_clones_share_tables() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write_result(result("Alice")).await.unwrap();
        assert_eq!(other.list_results().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_results_swaps_whole_set() {
        let store = MemoryStore::new();
        store.write_result(result("Old")).await.unwrap();
        store
            .replace_results(vec![result("Bob"), result("Alice")])
            .await
            .unwrap();
        let names: Vec<String> = store
            .list_results()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.employee_name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }
}
