use crate::config::toml_config::TomlConfig;
use crate::core::aggregator::AggregationKey;
use crate::core::engine::WriteMode;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "contrib-calc")]
#[command(about = "Social-insurance contribution calculator")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the CSV tables (overrides store.data_dir)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Group salaries by employee_name or employee_id
    #[arg(long)]
    pub aggregation_key: Option<AggregationKey>,

    /// per_row or atomic
    #[arg(long)]
    pub write_mode: Option<WriteMode>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import jurisdiction standards from an .xlsx, .xls or .csv file
    ImportStandards { file: PathBuf },
    /// Import monthly salaries from an .xlsx, .xls or .csv file
    ImportSalaries { file: PathBuf },
    /// Recompute every employee's contribution
    Calculate {
        /// Jurisdiction name (defaults to calculation.default_jurisdiction)
        #[arg(long)]
        city: Option<String>,
        /// Standard year; the latest year is used when omitted
        #[arg(long)]
        year: Option<String>,
    },
    /// Print the current result set as JSON
    Results,
    /// Print the imported standards as JSON
    Standards,
}

impl CliConfig {
    /// Loads the TOML file (or defaults) and applies command line overrides.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.store.data_dir = data_dir.clone();
        }
        if let Some(key) = self.aggregation_key {
            config.calculation.aggregation_key = key;
        }
        if let Some(mode) = self.write_mode {
            config.calculation.write_mode = mode;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.calculation.timeout_seconds = timeout;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_calculate_command() {
        let cli = CliConfig::try_parse_from([
            "contrib-calc",
            "--data-dir",
            "/tmp/data",
            "calculate",
            "--city",
            "佛山",
            "--year",
            "2024",
        ])
        .unwrap();

        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/data"));
        match cli.command {
            Command::Calculate { city, year } => {
                assert_eq!(city.as_deref(), Some("佛山"));
                assert_eq!(year.as_deref(), Some("2024"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[store]\ndata_dir = \"/from/file\"\n[calculation]\nwrite_mode = \"per_row\"\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::try_parse_from([
            "contrib-calc",
            "--config",
            &path,
            "--write-mode",
            "atomic",
            "--aggregation-key",
            "employee_id",
            "results",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();

        assert_eq!(config.data_dir(), "/from/file");
        assert_eq!(config.calculation.write_mode, WriteMode::Atomic);
        assert_eq!(config.calculation.aggregation_key, AggregationKey::EmployeeId);
    }

    #[test]
    fn test_rejects_unknown_write_mode() {
        let result = CliConfig::try_parse_from(["contrib-calc", "--write-mode", "later", "results"]);
        assert!(result.is_err());
    }
}
