use crate::adapters::spreadsheet::{self, extension_of};
use crate::core::columns::{ColumnIndex, REPORT_DATE, REPORT_ID, USER_ID};
use crate::core::etl::ImportEngine;
use crate::core::productivity::ProductivityAnalysis;
use crate::core::{CellStore, ImportBatch, ImportSummary, Pipeline, Sheet, Storage};
use crate::utils::error::{ReportError, Result};
use std::sync::Arc;

/// Reads timesheet exports from a data directory and loads them into the
/// productivity fact table.
pub struct SheetPipeline<S: Storage, C: CellStore> {
    storage: S,
    analysis: Arc<ProductivityAnalysis<C>>,
    extensions: Vec<String>,
    files: Option<Vec<String>>,
    replace: bool,
}

impl<S: Storage, C: CellStore> SheetPipeline<S, C> {
    pub fn new(storage: S, analysis: Arc<ProductivityAnalysis<C>>) -> Self {
        Self {
            storage,
            analysis,
            extensions: spreadsheet::SUPPORTED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            files: None,
            replace: false,
        }
    }

    /// Restricts imports to the given extensions (without the leading dot).
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Imports only the named files instead of the whole data directory.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = Some(files);
        self
    }

    /// Makes `load` swap out every stored cell instead of adding to them.
    pub fn replacing_existing(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn analysis(&self) -> &ProductivityAnalysis<C> {
        &self.analysis
    }

    /// Spreadsheet files in the data directory, sorted by name.
    pub async fn get_data_files(&self) -> Result<Vec<String>> {
        let files = self.storage.list_files().await?;
        Ok(files
            .into_iter()
            .filter(|f| spreadsheet::is_supported(f))
            .filter(|f| {
                extension_of(f).is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
            })
            .collect())
    }

    /// Reads one file and makes its heading row the active one.
    pub async fn import_initialize(&self, file: &str) -> Result<Vec<String>> {
        let bytes = self.storage.read_file(file).await?;
        let sheet = spreadsheet::read_sheet(file, bytes)?;
        self.analysis.set_headings(sheet.headings.clone());
        tracing::debug!("Active headings taken from {}", file);
        Ok(sheet.headings)
    }

    /// True when the table is empty or a data file changed after the
    /// earliest stored cell was imported.
    pub async fn ready_to_update(&self) -> Result<bool> {
        let Some(imported_at) = self.analysis.store().earliest_import()? else {
            tracing::debug!("No data cells stored yet, import needed");
            return Ok(true);
        };

        for file in self.get_data_files().await? {
            let modified = self.storage.modified(&file).await?;
            if modified > imported_at {
                tracing::debug!(
                    "{} modified at {} after last import at {}",
                    file,
                    modified,
                    imported_at
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: CellStore> Pipeline for SheetPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Sheet>> {
        let files = match &self.files {
            Some(files) => files.clone(),
            None => self.get_data_files().await?,
        };

        if files.is_empty() {
            tracing::warn!("No spreadsheet files to import");
        }

        let mut sheets = Vec::with_capacity(files.len());
        for file in files {
            tracing::debug!("Reading {}", file);
            let bytes = self.storage.read_file(&file).await?;
            sheets.push(spreadsheet::read_sheet(&file, bytes)?);
        }
        Ok(sheets)
    }

    async fn transform(&self, sheets: Vec<Sheet>) -> Result<ImportBatch> {
        let mut batch = ImportBatch {
            files: sheets.len(),
            ..ImportBatch::default()
        };

        for sheet in sheets {
            let index = ColumnIndex::new(&sheet.headings);
            let missing = index.missing(&[REPORT_ID, USER_ID, REPORT_DATE]);
            if !missing.is_empty() {
                return Err(ReportError::processing(format!(
                    "{} is missing required column(s): {}",
                    sheet.name,
                    missing.join(", ")
                )));
            }

            let mut rejected = 0;
            for (i, row) in sheet.rows.iter().enumerate() {
                batch.rows += 1;
                match ProductivityAnalysis::<C>::cells_for_row(&index, row) {
                    Ok(cells) => batch.cells.extend(cells),
                    Err(e) => {
                        rejected += 1;
                        // +2: heading row and 1-based numbering
                        tracing::warn!("⚠️ {} row {} skipped: {}", sheet.name, i + 2, e);
                    }
                }
            }

            tracing::debug!(
                "{}: {} rows, {} rejected",
                sheet.name,
                sheet.rows.len(),
                rejected
            );
        }

        Ok(batch)
    }

    async fn load(&self, batch: ImportBatch) -> Result<ImportSummary> {
        let (inserted, skipped) = if self.replace {
            self.analysis.replace_cells(&batch.cells)?
        } else {
            self.analysis.import_cells(&batch.cells)?
        };
        Ok(ImportSummary {
            files: batch.files,
            rows: batch.rows,
            inserted,
            skipped,
        })
    }
}

/// Re-imports every data file. Stored cells are only replaced once all files
/// have been read and transformed, in one transaction.
pub async fn full_import<S: Storage, C: CellStore>(
    pipeline: SheetPipeline<S, C>,
) -> Result<ImportSummary> {
    ImportEngine::new(pipeline.replacing_existing()).run().await
}

/// Imports a single data file on top of what is already stored.
pub async fn import_sheet<S: Storage, C: CellStore>(
    pipeline: SheetPipeline<S, C>,
    file: &str,
) -> Result<ImportSummary> {
    ImportEngine::new(pipeline.with_files(vec![file.to_string()]))
        .run()
        .await
}
