//! Spreadsheet and CSV import of contribution standards and monthly salaries.
//!
//! Headers are matched against a list of accepted names per field (English
//! and Chinese). Any invalid row rejects the whole file; row numbers in the
//! report count the header as row 1.

use crate::domain::{ContributionStore, JurisdictionStandard, SalaryRecord};
use crate::utils::error::{CalcError, Result, RowError};
use crate::utils::validation::check_range;
use calamine::{Data, Range, Reader};
use csv::StringRecord;
use regex::Regex;
use rust_decimal::Decimal;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// How an upload is decoded, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    /// `.xlsx` or `.xls`; only the first worksheet is read.
    Spreadsheet,
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let reason = match extension.as_deref() {
            Some("csv") => return Ok(ImportFormat::Csv),
            Some("xlsx") | Some("xls") => return Ok(ImportFormat::Spreadsheet),
            Some(other) => format!(
                "unsupported file type .{} (accepted: {})",
                other,
                ALLOWED_EXTENSIONS.join(", ")
            ),
            None => "file name has no extension".to_string(),
        };
        Err(CalcError::UnsupportedFile {
            file: path.display().to_string(),
            reason,
        })
    }
}

const CITY_NAME_COLUMNS: &[&str] = &["city_name", "city_namte", "cityname", "城市名", "城市名称"];
const YEAR_COLUMNS: &[&str] = &["year", "年份", "年度"];
const BASE_MIN_COLUMNS: &[&str] = &["base_min", "basemin", "基数下限", "下限", "缴费基数下限"];
const BASE_MAX_COLUMNS: &[&str] = &["base_max", "basemax", "基数上限", "上限", "缴费基数上限"];
const RATE_COLUMNS: &[&str] = &["rate", "缴纳比例", "比例", "费率"];

const EMPLOYEE_ID_COLUMNS: &[&str] = &["employee_id", "employeeid", "工号", "员工编号", "员工工号"];
const EMPLOYEE_NAME_COLUMNS: &[&str] = &["employee_name", "employeename", "姓名", "员工姓名"];
const MONTH_COLUMNS: &[&str] = &["month", "月份", "年月"];
const SALARY_AMOUNT_COLUMNS: &[&str] = &["salary_amount", "salaryamount", "工资", "工资金额", "金额"];

fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{6}$").expect("month pattern is valid"))
}

/// Header row plus data rows of one uploaded sheet.
struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(format: ImportFormat, data: &[u8]) -> Result<Self> {
        match format {
            ImportFormat::Csv => Self::from_csv(data),
            ImportFormat::Spreadsheet => Self::from_workbook(data),
        }
    }

    fn from_csv(data: &[u8]) -> Result<Self> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);
        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for row in reader.records() {
            rows.push(row?);
        }
        Ok(Self { headers, rows })
    }

    fn from_workbook(data: &[u8]) -> Result<Self> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data))?;
        match workbook.worksheet_range_at(0) {
            Some(range) => Ok(Self::from_range(&range?)),
            None => Err(CalcError::EmptyImport),
        }
    }

    /// First used row is the header. Fully blank rows are dropped, as the CSV
    /// reader drops blank lines.
    fn from_range(range: &Range<Data>) -> Self {
        let mut records = range
            .rows()
            .filter(|cells| cells.iter().any(|cell| !matches!(cell, Data::Empty)))
            .map(|cells| StringRecord::from(cells.iter().map(cell_text).collect::<Vec<_>>()));
        let headers = records.next().unwrap_or_else(StringRecord::new);
        Self {
            headers,
            rows: records.collect(),
        }
    }

    /// Index of the first header matching any of `names`, in priority order.
    fn find_column(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|h| h.trim() == *name))
    }
}

/// Whole numbers stored as floats print without a fraction (`2024`, not
/// `2024.0`), so years, months and ids read the same as in CSV.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        other => other.to_string(),
    }
}

/// Resolved column positions; `None` when the file has no such column.
struct Columns<const N: usize>([Option<usize>; N]);

impl<const N: usize> Columns<N> {
    fn resolve(table: &Table, synonyms: [&[&str]; N]) -> Self {
        Self(synonyms.map(|names| table.find_column(names)))
    }

    fn text<'r>(&self, row: &'r StringRecord, field: usize) -> &'r str {
        self.0[field]
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Absent or blank numeric cells read as zero.
fn parse_decimal(cell: &str) -> Option<Decimal> {
    if cell.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(cell)
        .or_else(|_| Decimal::from_scientific(cell))
        .ok()
}

fn non_negative(cell: &str, field: &str) -> std::result::Result<Decimal, String> {
    match parse_decimal(cell) {
        Some(value) if value >= Decimal::ZERO => Ok(value),
        _ => Err(format!("{} must be a non-negative number, got '{}'", field, cell)),
    }
}

const CITY: usize = 0;
const YEAR: usize = 1;
const BASE_MIN: usize = 2;
const BASE_MAX: usize = 3;
const RATE: usize = 4;

const EMPLOYEE_ID: usize = 0;
const EMPLOYEE_NAME: usize = 1;
const MONTH: usize = 2;
const AMOUNT: usize = 3;

fn standard_from_row(columns: &Columns<5>, row: &StringRecord) -> std::result::Result<JurisdictionStandard, String> {
    let city = columns.text(row, CITY);
    if city.is_empty() {
        return Err(format!(
            "jurisdiction name is missing (looked for columns: {})",
            CITY_NAME_COLUMNS.join(", ")
        ));
    }
    let year = columns.text(row, YEAR);
    if year.is_empty() {
        return Err("year is missing".to_string());
    }
    let base_min = non_negative(columns.text(row, BASE_MIN), "base_min")?;
    let base_max = non_negative(columns.text(row, BASE_MAX), "base_max")?;
    if base_max < base_min {
        return Err(format!("base_max {} is below base_min {}", base_max, base_min));
    }
    let rate_cell = columns.text(row, RATE);
    let rate = parse_decimal(rate_cell).ok_or_else(|| format!("rate must be a number, got '{}'", rate_cell))?;
    check_range("rate", rate, Decimal::ZERO, Decimal::ONE)?;

    Ok(JurisdictionStandard {
        jurisdiction_name: city.to_string(),
        year: year.to_string(),
        base_min,
        base_max,
        rate,
    })
}

fn salary_from_row(columns: &Columns<4>, row: &StringRecord) -> std::result::Result<SalaryRecord, String> {
    let employee_id = columns.text(row, EMPLOYEE_ID);
    if employee_id.is_empty() {
        return Err(format!(
            "employee id is missing (looked for columns: {})",
            EMPLOYEE_ID_COLUMNS.join(", ")
        ));
    }
    let employee_name = columns.text(row, EMPLOYEE_NAME);
    if employee_name.is_empty() {
        return Err("employee name is missing".to_string());
    }
    let month = columns.text(row, MONTH);
    if month.is_empty() {
        return Err("month is missing".to_string());
    }
    validate_period(month)?;
    let amount = non_negative(columns.text(row, AMOUNT), "salary_amount")?;

    Ok(SalaryRecord {
        employee_id: employee_id.to_string(),
        employee_name: employee_name.to_string(),
        period: month.to_string(),
        amount,
    })
}

/// Runs `convert` over every data row, collecting records and row errors.
fn convert_rows<T, const N: usize>(
    table: &Table,
    columns: &Columns<N>,
    convert: fn(&Columns<N>, &StringRecord) -> std::result::Result<T, String>,
) -> Result<Vec<T>> {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        match convert(columns, row) {
            Ok(record) => records.push(record),
            Err(message) => errors.push(RowError { row: index + 2, message }),
        }
    }

    if !errors.is_empty() {
        return Err(CalcError::ValidationFailure { errors });
    }
    if records.is_empty() {
        return Err(CalcError::EmptyImport);
    }
    Ok(records)
}

pub fn parse_standards(format: ImportFormat, data: &[u8]) -> Result<Vec<JurisdictionStandard>> {
    standards_from_table(&Table::read(format, data)?)
}

pub fn parse_salaries(format: ImportFormat, data: &[u8]) -> Result<Vec<SalaryRecord>> {
    salaries_from_table(&Table::read(format, data)?)
}

fn standards_from_table(table: &Table) -> Result<Vec<JurisdictionStandard>> {
    let columns = Columns::resolve(
        table,
        [CITY_NAME_COLUMNS, YEAR_COLUMNS, BASE_MIN_COLUMNS, BASE_MAX_COLUMNS, RATE_COLUMNS],
    );
    convert_rows(table, &columns, standard_from_row)
}

fn salaries_from_table(table: &Table) -> Result<Vec<SalaryRecord>> {
    let columns = Columns::resolve(
        table,
        [EMPLOYEE_ID_COLUMNS, EMPLOYEE_NAME_COLUMNS, MONTH_COLUMNS, SALARY_AMOUNT_COLUMNS],
    );
    convert_rows(table, &columns, salary_from_row)
}

/// Checks a YYYYMM period: six digits, year 2000..=2100, month 1..=12.
pub fn validate_period(period: &str) -> std::result::Result<(), String> {
    if !month_pattern().is_match(period) {
        return Err(format!("month '{}' must be formatted as YYYYMM (e.g. 202401)", period));
    }
    let year: u32 = period[..4].parse().map_err(|_| "invalid year".to_string())?;
    let month: u32 = period[4..].parse().map_err(|_| "invalid month".to_string())?;
    check_range("year", year, 2000, 2100)?;
    check_range("month", month, 1, 12)?;
    Ok(())
}

async fn read_import_file(path: &Path) -> Result<Table> {
    let format = ImportFormat::from_path(path)?;
    let data = tokio::fs::read(path).await?;
    tracing::debug!("Read {} bytes as {:?}", data.len(), format);
    Table::read(format, &data)
}

pub async fn import_standards<S: ContributionStore>(store: &S, path: &Path) -> Result<usize> {
    tracing::info!("📂 Importing contribution standards from {}", path.display());
    let table = read_import_file(path).await?;
    let standards = standards_from_table(&table)?;
    tracing::debug!("Parsed {} standards", standards.len());
    let inserted = store.insert_standards(standards).await?;
    tracing::info!("✅ Imported {} standards", inserted);
    Ok(inserted)
}

pub async fn import_salaries<S: ContributionStore>(store: &S, path: &Path) -> Result<usize> {
    tracing::info!("📂 Importing salaries from {}", path.display());
    let table = read_import_file(path).await?;
    let salaries = salaries_from_table(&table)?;
    tracing::debug!("Parsed {} salary records", salaries.len());
    let inserted = store.insert_salaries(salaries).await?;
    tracing::info!("✅ Imported {} salary records", inserted);
    Ok(inserted)
}
