use crate::core::Pipeline;
use crate::domain::model::ImportSummary;
use crate::utils::error::Result;
use std::time::Instant;

pub struct ImportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ImportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<ImportSummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting productivity import");

        // Extract
        let sheets = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} sheet(s)", sheets.len());

        // Transform
        let batch = self.pipeline.transform(sheets).await?;
        tracing::info!(
            "🔄 Transformed {} row(s) into {} data cell(s)",
            batch.rows,
            batch.cells.len()
        );

        // Load
        let summary = self.pipeline.load(batch).await?;
        tracing::info!(
            "💾 Loaded {} new data cell(s), skipped {} already imported ({:?})",
            summary.inserted,
            summary.skipped,
            started.elapsed()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Cell, ImportBatch, NewDataCell, Sheet};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct StubPipeline {
        loaded: Mutex<Vec<NewDataCell>>,
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Vec<Sheet>> {
            Ok(vec![Sheet {
                name: "stub.csv".to_string(),
                headings: vec!["pMeetings".to_string()],
                rows: vec![vec![Cell::Float(1.5)], vec![Cell::Float(2.0)]],
            }])
        }

        async fn transform(&self, sheets: Vec<Sheet>) -> Result<ImportBatch> {
            let mut batch = ImportBatch {
                files: sheets.len(),
                ..ImportBatch::default()
            };
            for sheet in sheets {
                for (i, row) in sheet.rows.iter().enumerate() {
                    batch.rows += 1;
                    batch.cells.push(NewDataCell {
                        report_id: i as i64,
                        user_id: "arehl".to_string(),
                        heading: "pMeetings".to_string(),
                        report_date: NaiveDate::from_ymd_opt(2015, 10, 1).unwrap(),
                        value: row[0].as_f64().unwrap(),
                    });
                }
            }
            Ok(batch)
        }

        async fn load(&self, batch: ImportBatch) -> Result<ImportSummary> {
            let inserted = batch.cells.len();
            self.loaded.lock().unwrap().extend(batch.cells);
            Ok(ImportSummary {
                files: batch.files,
                rows: batch.rows,
                inserted,
                skipped: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_engine_runs_all_phases() {
        let engine = ImportEngine::new(StubPipeline {
            loaded: Mutex::new(Vec::new()),
        });
        let summary = engine.run().await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                files: 1,
                rows: 2,
                inserted: 2,
                skipped: 0
            }
        );
        assert_eq!(engine.pipeline().loaded.lock().unwrap().len(), 2);
    }
}
