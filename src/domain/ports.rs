use crate::domain::model::{DataCell, DateRange, ImportBatch, ImportSummary, NewDataCell, Sheet};
use crate::domain::weekend_manager::WeekendManagerReport;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn modified(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<DateTime<Utc>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn data_path(&self) -> &str;
    fn database_path(&self) -> &str;
    fn allowed_extensions(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Sheet>>;
    async fn transform(&self, sheets: Vec<Sheet>) -> Result<ImportBatch>;
    async fn load(&self, batch: ImportBatch) -> Result<ImportSummary>;
}

/// Fact table backing the productivity analysis.
pub trait CellStore: Send + Sync {
    fn insert(&self, cell: &NewDataCell) -> Result<DataCell>;
    /// Inserts the cells whose (report, heading) pair is not stored yet.
    /// Returns `(inserted, skipped)`.
    fn insert_missing(&self, cells: &[NewDataCell]) -> Result<(usize, usize)>;
    /// Deletes every stored cell and inserts `cells` like `insert_missing`,
    /// all in one transaction.
    fn replace_all(&self, cells: &[NewDataCell]) -> Result<(usize, usize)>;
    fn contains(&self, report_id: i64, heading: &str) -> Result<bool>;
    fn clear(&self) -> Result<usize>;
    fn count(&self) -> Result<usize>;
    fn count_heading(&self, heading: &str) -> Result<usize>;
    fn last(&self) -> Result<Option<DataCell>>;
    fn sum(&self, user_id: &str, heading: &str, range: Option<DateRange>) -> Result<f64>;
    fn count_for(&self, user_id: &str, heading: &str, range: Option<DateRange>) -> Result<usize>;
    fn count_distinct(&self, user_id: &str, heading: &str, range: Option<DateRange>)
        -> Result<usize>;
    fn earliest_import(&self) -> Result<Option<DateTime<Utc>>>;
}

pub trait ReportStore: Send + Sync {
    fn insert(&self, report: &WeekendManagerReport) -> Result<WeekendManagerReport>;
    fn find(&self, id: i64) -> Result<Option<WeekendManagerReport>>;
    fn update(&self, report: &WeekendManagerReport) -> Result<WeekendManagerReport>;
    fn delete(&self, id: i64) -> Result<bool>;
    fn count(&self) -> Result<usize>;
    fn last(&self) -> Result<Option<WeekendManagerReport>>;
    fn current_reports(&self, creator_id: i64) -> Result<Vec<WeekendManagerReport>>;
}
