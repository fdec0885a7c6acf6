pub mod sheet_pipeline;

pub use sheet_pipeline::{full_import, import_sheet, SheetPipeline};
