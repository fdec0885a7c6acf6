pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod db;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalStorage;
pub use app::pipelines::SheetPipeline;
pub use app::weekend_manager::WeekendManagerReportsController;
pub use config::AppConfig;
pub use core::{etl::ImportEngine, productivity::ProductivityAnalysis};
pub use db::{Database, SqliteCellStore, SqliteReportStore};
pub use utils::error::{ReportError, Result};
