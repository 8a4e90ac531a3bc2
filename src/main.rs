use clap::Parser;
use contrib_calc::app::ingest;
use contrib_calc::utils::error::{CalcError, ErrorSeverity};
use contrib_calc::utils::{logger, validation::Validate};
use contrib_calc::{CliConfig, Command, ContributionEngine, ContributionStore, LocalStore};

fn exit_code(e: &CalcError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: CalcError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入並合併配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail(e);
        }
    };

    logger::init_logger(cli.verbose, config.logging.level.as_deref(), config.logging.format);
    tracing::info!("Starting contrib-calc");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(e);
    }

    let store = LocalStore::new(config.data_dir());

    match cli.command {
        Command::ImportStandards { file } => match ingest::import_standards(&store, &file).await {
            Ok(count) => println!("✅ Imported {} standards", count),
            Err(e) => fail(e),
        },
        Command::ImportSalaries { file } => match ingest::import_salaries(&store, &file).await {
            Ok(count) => println!("✅ Imported {} salary records", count),
            Err(e) => fail(e),
        },
        Command::Calculate { city, year } => {
            let jurisdiction = city.unwrap_or_else(|| config.calculation.default_jurisdiction.clone());
            let year = year.or_else(|| config.calculation.default_year.clone());

            let engine = ContributionEngine::with_options(store, config.engine_options());
            let outcome = engine.calculate(&jurisdiction, year.as_deref()).await;

            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                eprintln!("❌ {}", outcome.message);
                std::process::exit(1);
            }
        }
        Command::Results => match store.list_results().await {
            Ok(results) => println!("{}", serde_json::to_string_pretty(&results)?),
            Err(e) => fail(e),
        },
        Command::Standards => match store.list_standards().await {
            Ok(standards) => println!("{}", serde_json::to_string_pretty(&standards)?),
            Err(e) => fail(e),
        },
    }

    Ok(())
}
