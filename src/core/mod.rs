pub mod columns;
pub mod etl;
pub mod productivity;
pub mod subjects;

pub use crate::domain::model::{ImportBatch, ImportSummary, Sheet};
pub use crate::domain::ports::{CellStore, ConfigProvider, Pipeline, ReportStore, Storage};
pub use crate::utils::error::Result;
