pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "facility-reports")]
#[command(about = "Productivity analysis imports and weekend manager reports")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the spreadsheet data directory
    #[arg(long)]
    pub data_path: Option<String>,

    /// Override the SQLite database path
    #[arg(long)]
    pub database: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import timesheet spreadsheets into the productivity table
    Import {
        /// Re-import even when no data file changed
        #[arg(long)]
        force: bool,

        /// Import a single file on top of the stored data
        #[arg(long)]
        file: Option<String>,
    },
    /// Show whether the data directory changed since the last import
    Status,
    /// Print a productivity summary for one employee
    Summary {
        #[arg(long)]
        user: String,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// List tracked headings and their labels
    Labels,
    /// List a manager's weekend reports that are still in progress
    Wmr {
        #[arg(long)]
        user_id: i64,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the TOML file when one is given and applies the command-line
    /// overrides on top.
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                AppConfig::from_file(path)?
            }
            None => AppConfig::default(),
        };

        if let Some(data_path) = &self.data_path {
            config.import.data_path = data_path.clone();
        }
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::core::ConfigProvider;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = CliConfig::parse_from([
            "facility-reports",
            "--data-path",
            "/tmp/timesheets",
            "--database",
            "/tmp/reports.db",
            "summary",
            "--user",
            "arehl",
            "--from",
            "2015-10-01",
        ]);

        let config = cli.resolve().unwrap();
        assert_eq!(config.data_path(), "/tmp/timesheets");
        assert_eq!(config.database_path(), "/tmp/reports.db");
        match cli.command {
            Command::Summary { user, from, to } => {
                assert_eq!(user, "arehl");
                assert_eq!(from, NaiveDate::from_ymd_opt(2015, 10, 1));
                assert_eq!(to, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_import_flags() {
        let cli = CliConfig::parse_from(["facility-reports", "-v", "import", "--force"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Import { force: true, file: None }));
    }
}
