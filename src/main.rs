use clap::Parser;
use facility_reports::config::Command;
use facility_reports::core::columns;
use facility_reports::core::{CellStore, ConfigProvider, ReportStore};
use facility_reports::domain::model::DateRange;
use facility_reports::utils::error::{ErrorSeverity, ReportError};
use facility_reports::utils::{logger, validation::Validate};
use facility_reports::{
    app::pipelines, AppConfig, CliConfig, Database, LocalStorage, ProductivityAnalysis,
    SheetPipeline, SqliteCellStore, SqliteReportStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose || config.verbose());
    } else {
        logger::init_cli_logger(cli.verbose || config.verbose());
    }

    tracing::info!("Starting facility-reports");
    tracing::debug!("Resolved config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn analysis(
    config: &AppConfig,
    db: &Database,
) -> facility_reports::Result<ProductivityAnalysis<SqliteCellStore>> {
    Ok(ProductivityAnalysis::new(
        SqliteCellStore::new(db.clone()),
        config.subject_schema()?,
    ))
}

fn sheet_pipeline(
    config: &AppConfig,
    db: &Database,
) -> facility_reports::Result<SheetPipeline<LocalStorage, SqliteCellStore>> {
    let storage = LocalStorage::new(config.data_path());
    Ok(SheetPipeline::new(storage, Arc::new(analysis(config, db)?))
        .with_extensions(config.allowed_extensions()))
}

async fn run(command: &Command, config: &AppConfig) -> facility_reports::Result<()> {
    let db = Database::open(config.database_path())?;

    match command {
        Command::Import { force, file } => {
            let pipeline = sheet_pipeline(config, &db)?;
            let summary = match file {
                Some(file) => pipelines::import_sheet(pipeline, file).await?,
                None => {
                    if !force && !pipeline.ready_to_update().await? {
                        tracing::info!("✅ Data files unchanged since the last import");
                        println!("✅ Nothing to import, data is up to date");
                        return Ok(());
                    }
                    pipelines::full_import(pipeline).await?
                }
            };
            println!("✅ Import completed successfully!");
            println!(
                "📊 {} files, {} rows, {} cells inserted, {} skipped",
                summary.files, summary.rows, summary.inserted, summary.skipped
            );
        }
        Command::Status => {
            let pipeline = sheet_pipeline(config, &db)?;
            let files = pipeline.get_data_files().await?;
            let cells = pipeline.analysis().store().count()?;
            let ready = pipeline.ready_to_update().await?;
            println!("📁 Data path: {}", config.data_path());
            println!("📄 Data files: {}", files.len());
            println!("🗄️ Stored cells: {}", cells);
            println!(
                "{}",
                if ready {
                    "🔄 Import needed"
                } else {
                    "✅ Up to date"
                }
            );
        }
        Command::Summary { user, from, to } => {
            let range = match (from, to) {
                (Some(start), Some(end)) => Some(DateRange::new(*start, *end)),
                (None, None) => None,
                _ => {
                    return Err(ReportError::ValidationError {
                        message: "--from and --to must be given together".to_string(),
                    })
                }
            };
            let summary = analysis(config, &db)?.summary(user, range)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Labels => {
            for heading in columns::tracked_columns() {
                println!("{:<20} {}", heading, columns::label(Some(heading)));
            }
        }
        Command::Wmr { user_id } => {
            let store = SqliteReportStore::new(db.clone());
            let reports = store.current_reports(*user_id)?;
            if reports.is_empty() {
                println!("No reports in progress for user {}", user_id);
            }
            for report in reports {
                println!(
                    "#{} {} {}",
                    report.id.unwrap_or_default(),
                    report
                        .date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    report.name.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
