use crate::domain::SalaryRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which record field identifies an employee when grouping salary history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKey {
    /// Group by display name. Records sharing a name are merged even when
    /// their ids differ.
    #[default]
    EmployeeName,
    /// Group by the stable employee id and carry the name along.
    EmployeeId,
}

impl std::str::FromStr for AggregationKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "employee_name" | "name" => Ok(AggregationKey::EmployeeName),
            "employee_id" | "id" => Ok(AggregationKey::EmployeeId),
            other => Err(format!(
                "unknown aggregation key '{}', expected employee_name or employee_id",
                other
            )),
        }
    }
}

/// Salary history of one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeSalaries {
    pub employee_name: String,
    pub amounts: Vec<Decimal>,
}

/// Groups salary records by employee. The map is keyed by whatever `key`
/// selects; records whose key field is empty are skipped.
pub fn aggregate(records: &[SalaryRecord], key: AggregationKey) -> BTreeMap<String, EmployeeSalaries> {
    let mut groups: BTreeMap<String, EmployeeSalaries> = BTreeMap::new();

    for record in records {
        let group_key = match key {
            AggregationKey::EmployeeName => &record.employee_name,
            AggregationKey::EmployeeId => &record.employee_id,
        };
        if group_key.is_empty() {
            tracing::debug!("Skipping salary record for period {} with empty key", record.period);
            continue;
        }

        let entry = groups
            .entry(group_key.clone())
            .or_insert_with(|| EmployeeSalaries {
                employee_name: record.employee_name.clone(),
                amounts: Vec::new(),
            });
        // 以 id 分組時顯示名稱取最後一筆
        if !record.employee_name.is_empty() {
            entry.employee_name.clone_from(&record.employee_name);
        }
        entry.amounts.push(record.amount);
    }

    groups
}
