use crate::domain::{ContributionResult, ContributionStore, JurisdictionStandard, SalaryRecord};
use crate::utils::error::{CalcError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SALARIES_FILE: &str = "salaries.csv";
pub const STANDARDS_FILE: &str = "standards.csv";
pub const RESULTS_FILE: &str = "results.csv";

/// Keeps each table as a CSV file under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

fn upstream(operation: &'static str) -> impl FnOnce(CalcError) -> CalcError {
    move |e| match e {
        CalcError::UpstreamFailure { .. } => e,
        other => CalcError::upstream(operation, other),
    }
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn table_path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    fn read_table<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.table_path(file);
        let reader = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for row in csv_reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn append_rows<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<usize> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.table_path(file);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(rows.len())
    }

    /// Writes the table to a sibling temp file and renames it into place.
    fn swap_table<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.table_path(file);
        let tmp_path = self.table_path(&format!("{}.tmp", file));

        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl ContributionStore for LocalStore {
    async fn fetch_all_salaries(&self) -> Result<Vec<SalaryRecord>> {
        let mut salaries: Vec<SalaryRecord> =
            self.read_table(SALARIES_FILE).map_err(upstream("read salaries"))?;
        salaries.sort_by(|a, b| {
            (&a.employee_name, &a.period).cmp(&(&b.employee_name, &b.period))
        });
        Ok(salaries)
    }

    async fn fetch_standard(
        &self,
        jurisdiction_name: &str,
        year: Option<&str>,
    ) -> Result<Option<JurisdictionStandard>> {
        let standards: Vec<JurisdictionStandard> =
            self.read_table(STANDARDS_FILE).map_err(upstream("read standards"))?;
        Ok(JurisdictionStandard::select(&standards, jurisdiction_name, year).cloned())
    }

    async fn clear_results(&self) -> Result<()> {
        match fs::remove_file(self.table_path(RESULTS_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CalcError::upstream("clear results", e)),
        }
    }

    async fn write_result(&self, result: ContributionResult) -> Result<ContributionResult> {
        self.append_rows(RESULTS_FILE, std::slice::from_ref(&result))
            .map_err(upstream("write result"))?;
        Ok(result)
    }

    async fn replace_results(
        &self,
        results: Vec<ContributionResult>,
    ) -> Result<Vec<ContributionResult>> {
        self.swap_table(RESULTS_FILE, &results)
            .map_err(upstream("replace results"))?;
        Ok(results)
    }

    async fn insert_salaries(&self, salaries: Vec<SalaryRecord>) -> Result<usize> {
        self.append_rows(SALARIES_FILE, &salaries)
            .map_err(upstream("insert salaries"))
    }

    async fn insert_standards(&self, standards: Vec<JurisdictionStandard>) -> Result<usize> {
        self.append_rows(STANDARDS_FILE, &standards)
            .map_err(upstream("insert standards"))
    }

    async fn list_standards(&self) -> Result<Vec<JurisdictionStandard>> {
        let mut standards: Vec<JurisdictionStandard> =
            self.read_table(STANDARDS_FILE).map_err(upstream("read standards"))?;
        standards.sort_by(|a, b| b.year_key().cmp(&a.year_key()));
        Ok(standards)
    }

    async fn list_results(&self) -> Result<Vec<ContributionResult>> {
        let mut results: Vec<ContributionResult> =
            self.read_table(RESULTS_FILE).map_err(upstream("read results"))?;
        results.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
        Ok(results)
    }
}
