use anyhow::Result;
use contrib_calc::app::ingest;
use contrib_calc::{
    AggregationKey, ContributionEngine, ContributionStore, EngineOptions, LocalStore, WriteMode,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tempfile::TempDir;

const STANDARDS_CSV: &str = "\
城市名,年份,基数下限,基数上限,缴纳比例
佛山,2023,1800,24000,0.15
佛山,2024,1900,25000,0.154
广州,2024,2300,36000,0.16
";

const SALARIES_CSV: &str = "\
employee_id,employee_name,month,salary_amount
E001,Alice,202401,5000
E001,Alice,202402,6000
E001,Alice,202403,7000
E002,Bob,202401,1000
E002,Bob,202402,1500
E003,Carol,202401,30000
E003,Carol,202402,28000
";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn seeded_store(temp_dir: &TempDir, salaries_csv: &str) -> Result<LocalStore> {
    let standards_path: PathBuf = temp_dir.path().join("standards.input.csv");
    let salaries_path: PathBuf = temp_dir.path().join("salaries.input.csv");
    tokio::fs::write(&standards_path, STANDARDS_CSV).await?;
    tokio::fs::write(&salaries_path, salaries_csv).await?;

    let store = LocalStore::new(temp_dir.path().join("data"));
    assert_eq!(ingest::import_standards(&store, &standards_path).await?, 3);
    ingest::import_salaries(&store, &salaries_path).await?;
    Ok(store)
}

#[tokio::test]
async fn test_end_to_end_import_and_calculate() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = seeded_store(&temp_dir, SALARIES_CSV).await?;
    let engine = ContributionEngine::new(store.clone());

    let outcome = engine.calculate("佛山", None).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.processed, 3);
    let standard = outcome.standard_used.as_ref().unwrap();
    assert_eq!(standard.year, "2024");
    assert_eq!(standard.rate, dec("0.154"));

    let stored = store.list_results().await?;
    let summary: Vec<(String, Decimal, Decimal, Decimal)> = stored
        .iter()
        .map(|r| (r.employee_name.clone(), r.avg_salary, r.contribution_base, r.company_fee))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Alice".to_string(), dec("6000"), dec("6000"), dec("924.00")),
            ("Bob".to_string(), dec("1250"), dec("1900"), dec("292.60")),
            ("Carol".to_string(), dec("29000"), dec("25000"), dec("3850.00")),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_instead_of_appending() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = seeded_store(&temp_dir, SALARIES_CSV).await?;
    let engine = ContributionEngine::new(store.clone());

    let first = engine.calculate("佛山", Some("2024")).await;
    let second = engine.calculate("佛山", Some("2024")).await;

    assert!(first.success && second.success);
    assert_eq!(store.list_results().await?.len(), 3);
    let fees = |o: &contrib_calc::CalculationOutcome| -> Vec<Decimal> {
        o.results.iter().map(|r| r.company_fee).collect()
    };
    assert_eq!(fees(&first), fees(&second));
    Ok(())
}

#[tokio::test]
async fn test_missing_standard_keeps_previous_results() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = seeded_store(&temp_dir, SALARIES_CSV).await?;
    let engine = ContributionEngine::new(store.clone());
    assert!(engine.calculate("佛山", None).await.success);

    let outcome = engine.calculate("深圳", Some("2030")).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("深圳"));
    assert!(outcome.message.contains("2030"));
    assert!(outcome.results.is_empty());
    assert_eq!(store.list_results().await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_atomic_mode_with_older_standard() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = seeded_store(&temp_dir, SALARIES_CSV).await?;
    let engine = ContributionEngine::with_options(
        store.clone(),
        EngineOptions {
            write_mode: WriteMode::Atomic,
            ..Default::default()
        },
    );

    let outcome = engine.calculate("佛山", Some("2023")).await;

    assert!(outcome.success, "{}", outcome.message);
    let carol = store
        .list_results()
        .await?
        .into_iter()
        .find(|r| r.employee_name == "Carol")
        .unwrap();
    assert_eq!(carol.contribution_base, dec("24000"));
    assert_eq!(carol.company_fee, dec("3600.00"));
    Ok(())
}

#[tokio::test]
async fn test_name_collision_merges_by_default_and_splits_by_id() -> Result<()> {
    let salaries = "\
employee_id,employee_name,month,salary_amount
E001,Alice,202401,4000
E777,Alice,202401,8000
";
    let temp_dir = TempDir::new()?;
    let store = seeded_store(&temp_dir, salaries).await?;

    let by_name = ContributionEngine::new(store.clone()).calculate("佛山", None).await;
    assert_eq!(by_name.processed, 1);
    assert_eq!(by_name.results[0].avg_salary, dec("6000"));

    let by_id = ContributionEngine::with_options(
        store.clone(),
        EngineOptions {
            aggregation_key: AggregationKey::EmployeeId,
            ..Default::default()
        },
    )
    .calculate("佛山", None)
    .await;
    assert_eq!(by_id.processed, 2);
    assert!(by_id.results.iter().all(|r| r.employee_name == "Alice"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_salary_file_imports_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("bad.csv");
    tokio::fs::write(
        &path,
        "employee_id,employee_name,month,salary_amount\nE1,Alice,202401,5000\nE2,Bob,202415,1000\n",
    )
    .await?;
    let store = LocalStore::new(temp_dir.path().join("data"));

    let err = ingest::import_salaries(&store, &path).await.unwrap_err();

    assert!(err.user_friendly_message().contains("row 3"));
    assert!(store.fetch_all_salaries().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_xlsx_salaries_calculate_like_csv() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let standards_path = temp_dir.path().join("standards.input.csv");
    tokio::fs::write(&standards_path, STANDARDS_CSV).await?;
    let store = LocalStore::new(temp_dir.path().join("data"));
    ingest::import_standards(&store, &standards_path).await?;

    let salaries_path = temp_dir.path().join("salaries.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["工号", "姓名", "月份", "工资"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    let rows = [
        ("E001", "Alice", 202401.0, 5000.0),
        ("E001", "Alice", 202402.0, 6000.0),
        ("E001", "Alice", 202403.0, 7000.0),
        ("E002", "Bob", 202401.0, 1000.0),
        ("E002", "Bob", 202402.0, 1500.0),
    ];
    for (i, (id, name, month, amount)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *id)?;
        sheet.write_string(row, 1, *name)?;
        sheet.write_number(row, 2, *month)?;
        sheet.write_number(row, 3, *amount)?;
    }
    workbook.save(&salaries_path)?;

    assert_eq!(ingest::import_salaries(&store, &salaries_path).await?, 5);
    let outcome = ContributionEngine::new(store.clone()).calculate("佛山", None).await;

    assert!(outcome.success, "{}", outcome.message);
    let fees: Vec<String> = outcome.results.iter().map(|r| r.company_fee.to_string()).collect();
    assert_eq!(fees, vec!["924.00", "292.60"]);
    assert_eq!(outcome.results[1].avg_salary.to_string(), "1250.00");
    Ok(())
}
