use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One employee's salary for one month, as ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    pub employee_id: String,
    pub employee_name: String,
    /// YYYYMM
    pub period: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Contribution-base bounds and rate published by a jurisdiction for a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionStandard {
    pub jurisdiction_name: String,
    pub year: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_min: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_max: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
}

impl JurisdictionStandard {
    /// Picks the standard for `jurisdiction`. With `year` the match is exact,
    /// otherwise the most recent year wins.
    pub fn select<'a, I>(candidates: I, jurisdiction: &str, year: Option<&str>) -> Option<&'a Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        candidates
            .into_iter()
            .filter(|s| s.jurisdiction_name == jurisdiction)
            .filter(|s| year.map_or(true, |y| s.year == y))
            .max_by(|a, b| a.year_key().cmp(&b.year_key()))
    }

    /// Ordering key for `year`: numeric years sort numerically and above
    /// anything that does not parse.
    pub fn year_key(&self) -> (Option<u32>, &str) {
        (self.year.trim().parse().ok(), self.year.as_str())
    }
}

/// One employee's computed contribution for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionResult {
    pub employee_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_salary: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub contribution_base: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub company_fee: Decimal,
    pub computed_at: DateTime<Utc>,
}

/// What `calculate` hands back to its caller, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub success: bool,
    pub message: String,
    /// Number of employees whose result was written.
    pub processed: usize,
    pub results: Vec<ContributionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_used: Option<JurisdictionStandard>,
}

impl CalculationOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            processed: 0,
            results: Vec::new(),
            standard_used: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn standard(name: &str, year: &str) -> JurisdictionStandard {
        JurisdictionStandard {
            jurisdiction_name: name.to_string(),
            year: year.to_string(),
            base_min: Decimal::from(1900),
            base_max: Decimal::from(25000),
            rate: Decimal::from_str("0.154").unwrap(),
        }
    }

    #[test]
    fn test_select_latest_year_when_unspecified() {
        let all = vec![
            standard("佛山", "2023"),
            standard("佛山", "2024"),
            standard("广州", "2025"),
        ];
        let picked = JurisdictionStandard::select(&all, "佛山", None).unwrap();
        assert_eq!(picked.year, "2024");
    }

    #[test]
    fn test_select_exact_year() {
        let all = vec![standard("佛山", "2023"), standard("佛山", "2024")];
        let picked = JurisdictionStandard::select(&all, "佛山", Some("2023")).unwrap();
        assert_eq!(picked.year, "2023");
        assert!(JurisdictionStandard::select(&all, "佛山", Some("2022")).is_none());
        assert!(JurisdictionStandard::select(&all, "深圳", None).is_none());
    }

    #[test]
    fn test_numeric_years_outrank_unparseable() {
        let all = vec![standard("佛山", "n/a"), standard("佛山", "999"), standard("佛山", "2024")];
        let picked = JurisdictionStandard::select(&all, "佛山", None).unwrap();
        assert_eq!(picked.year, "2024");
    }

    #[test]
    fn test_failure_outcome_is_empty() {
        let outcome = CalculationOutcome::failure("boom");
        assert!(!outcome.success);
        assert_eq!(outcome.processed, 0);
        assert!(outcome.results.is_empty());
        assert!(outcome.standard_used.is_none());
    }
}
