use crate::core::columns::{
    self, ColumnIndex, CLIENT_CASE_NUMBER, COLUMNS_TO_COUNT_HOURS, COLUMNS_TO_COUNT_INCIDENTS,
    EXTRA_COLUMNS_TO_TRACK, REPORT_DATE, REPORT_ID, TRAVEL, USER_ID,
};
use crate::core::subjects::SubjectSchema;
use crate::domain::model::{Cell, DataCell, DateRange, NewDataCell, ProductivitySummary};
use crate::domain::ports::CellStore;
use crate::utils::error::{ReportError, Result};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Active heading row and its lookup.
#[derive(Debug)]
struct Layout {
    headings: Vec<String>,
    index: ColumnIndex,
}

impl Layout {
    fn new(headings: Vec<String>) -> Self {
        let index = ColumnIndex::new(&headings);
        Self { headings, index }
    }
}

/// Per-clinician productivity figures computed from imported timesheet rows.
pub struct ProductivityAnalysis<C: CellStore> {
    store: C,
    subjects: SubjectSchema,
    layout: RwLock<Layout>,
}

impl<C: CellStore> ProductivityAnalysis<C> {
    pub fn new(store: C, subjects: SubjectSchema) -> Self {
        Self {
            store,
            subjects,
            layout: RwLock::new(Layout::new(columns::default_headings())),
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    // The layout is replaced whole, so a poisoned lock still holds a usable value.
    fn with_layout<T>(&self, f: impl FnOnce(&Layout) -> T) -> T {
        let layout = self.layout.read().unwrap_or_else(PoisonError::into_inner);
        f(&layout)
    }

    pub fn headings(&self) -> Vec<String> {
        self.with_layout(|layout| layout.headings.clone())
    }

    /// Replaces the active heading row, e.g. with the first row of a sheet.
    pub fn set_headings(&self, headings: Vec<String>) {
        let layout = Layout::new(headings);
        *self.layout.write().unwrap_or_else(PoisonError::into_inner) = layout;
    }

    /// The canonical layout of the timesheet export.
    pub fn get_headings(&self) -> Vec<String> {
        columns::default_headings()
    }

    pub fn label(&self, heading: Option<&str>) -> &'static str {
        columns::label(heading)
    }

    pub fn columns_to_count_hours(&self) -> &'static [&'static str] {
        &COLUMNS_TO_COUNT_HOURS
    }

    pub fn columns_to_count_incidents(&self) -> &'static [&'static str] {
        &COLUMNS_TO_COUNT_INCIDENTS
    }

    pub fn extra_columns_to_track(&self) -> &'static [&'static str] {
        &EXTRA_COLUMNS_TO_TRACK
    }

    pub fn tracked_columns(&self) -> Vec<&'static str> {
        columns::tracked_columns()
    }

    pub fn subject_schema(&self) -> &SubjectSchema {
        &self.subjects
    }

    pub fn subject_field(&self, user_id: &str, field: &str) -> Option<serde_json::Value> {
        self.subjects.field(user_id, field)
    }

    pub fn cell_value(&self, row: &[Cell], heading: &str) -> Option<f64> {
        self.with_layout(|layout| columns::cell_value(&layout.index, row, heading))
    }

    /// Builds the fact for one heading of a row, or `None` when the row has
    /// nothing to record under it.
    pub fn cell_for(
        index: &ColumnIndex,
        row: &[Cell],
        heading: &str,
    ) -> Result<Option<NewDataCell>> {
        let Some(value) = columns::cell_value(index, row, heading) else {
            return Ok(None);
        };

        let report_id = index
            .cell(row, REPORT_ID)
            .and_then(Cell::as_i64)
            .ok_or_else(|| ReportError::processing("row has no numeric reportID"))?;
        let user_id = index
            .cell(row, USER_ID)
            .map(Cell::as_text)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ReportError::processing(format!("report {} has no userID", report_id))
            })?;
        let report_date = index
            .cell(row, REPORT_DATE)
            .and_then(Cell::as_date)
            .ok_or_else(|| {
                ReportError::processing(format!("report {} has no reportDate", report_id))
            })?;

        Ok(Some(NewDataCell {
            report_id,
            user_id,
            heading: heading.to_string(),
            report_date,
            value,
        }))
    }

    /// Every tracked fact of a row.
    pub fn cells_for_row(index: &ColumnIndex, row: &[Cell]) -> Result<Vec<NewDataCell>> {
        let mut cells = Vec::new();
        for heading in columns::tracked_columns() {
            if let Some(cell) = Self::cell_for(index, row, heading)? {
                cells.push(cell);
            }
        }
        Ok(cells)
    }

    /// Persists a single fact. Nothing is written when the cell has no value.
    pub fn import_cell(&self, row: &[Cell], heading: &str) -> Result<Option<DataCell>> {
        match self.with_layout(|layout| Self::cell_for(&layout.index, row, heading))? {
            Some(cell) => Ok(Some(self.store.insert(&cell)?)),
            None => Ok(None),
        }
    }

    /// Imports all tracked headings of a row, skipping (report, heading)
    /// pairs that are already stored. Returns `(inserted, skipped)`.
    pub fn import_row(&self, row: &[Cell]) -> Result<(usize, usize)> {
        let cells = self.with_layout(|layout| Self::cells_for_row(&layout.index, row))?;
        self.import_cells(&cells)
    }

    pub fn import_cells(&self, cells: &[NewDataCell]) -> Result<(usize, usize)> {
        self.store.insert_missing(cells)
    }

    /// Swaps the whole fact table for `cells`. Nothing changes if it fails.
    pub fn replace_cells(&self, cells: &[NewDataCell]) -> Result<(usize, usize)> {
        let counts = self.store.replace_all(cells)?;
        tracing::info!("🧹 Replaced productivity data cells with {} new cell(s)", counts.0);
        Ok(counts)
    }

    pub fn clear_db_table(&self) -> Result<usize> {
        let removed = self.store.clear()?;
        tracing::info!("🧹 Cleared {} productivity data cells", removed);
        Ok(removed)
    }

    pub fn column_sum(&self, user_id: &str, heading: &str, range: Option<DateRange>) -> Result<f64> {
        Ok(round2(self.store.sum(user_id, heading, range)?))
    }

    /// Number of distinct values, e.g. distinct client case numbers.
    pub fn column_unique(
        &self,
        user_id: &str,
        heading: &str,
        range: Option<DateRange>,
    ) -> Result<usize> {
        self.store.count_distinct(user_id, heading, range)
    }

    pub fn incident_count(
        &self,
        user_id: &str,
        heading: &str,
        range: Option<DateRange>,
    ) -> Result<usize> {
        self.store.count_for(user_id, heading, range)
    }

    pub fn user_total_hours(&self, user_id: &str, range: Option<DateRange>) -> Result<f64> {
        let mut total = 0.0;
        for heading in COLUMNS_TO_COUNT_HOURS {
            total += self.store.sum(user_id, heading, range)?;
        }
        Ok(round2(total))
    }

    /// Expected hours minus travel time.
    pub fn user_available_hours(&self, user_id: &str, range: Option<DateRange>) -> Result<f64> {
        let subject = self
            .subjects
            .find(user_id)
            .ok_or_else(|| ReportError::not_found("subject", user_id))?;
        let travel = self.store.sum(user_id, TRAVEL, range)?;
        Ok(round2(subject.expected_hours - travel))
    }

    pub fn summary(&self, user_id: &str, range: Option<DateRange>) -> Result<ProductivitySummary> {
        let mut hours = BTreeMap::new();
        for heading in COLUMNS_TO_COUNT_HOURS {
            hours.insert(heading.to_string(), self.column_sum(user_id, heading, range)?);
        }

        let mut incidents = BTreeMap::new();
        for heading in COLUMNS_TO_COUNT_INCIDENTS {
            if heading != CLIENT_CASE_NUMBER {
                incidents.insert(heading.to_string(), self.incident_count(user_id, heading, range)?);
            }
        }

        let available_hours = match self.user_available_hours(user_id, range) {
            Ok(hours) => Some(hours),
            Err(ReportError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(ProductivitySummary {
            user_id: user_id.to_string(),
            name: self.subjects.find(user_id).map(|s| s.name.clone()),
            range,
            hours,
            total_hours: self.user_total_hours(user_id, range)?,
            available_hours,
            incidents,
            unique_clients: self.column_unique(user_id, CLIENT_CASE_NUMBER, range)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteCellStore};
    use chrono::NaiveDate;

    fn analysis() -> ProductivityAnalysis<SqliteCellStore> {
        let store = SqliteCellStore::new(Database::open_in_memory().unwrap());
        ProductivityAnalysis::new(store, SubjectSchema::builtin().unwrap())
    }

    fn sample_row() -> Vec<Cell> {
        let mut row = vec![Cell::Int(0); 63];
        row[0] = Cell::Int(536630);
        row[1] = Cell::from("arehl");
        row[5] = Cell::Date(NaiveDate::from_ymd_opt(2015, 10, 12).unwrap());
        row
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(153.54 + 0.7), 154.24);
    }

    #[test]
    fn test_set_headings_changes_lookup() {
        let pa = analysis();
        assert_eq!(pa.headings().len(), 63);
        assert_eq!(pa.headings(), pa.get_headings());

        pa.set_headings(vec!["reportID".into(), "userID".into(), "reportDate".into(), "pMeetings".into()]);
        let row = vec![
            Cell::Int(1),
            Cell::from("arehl"),
            Cell::Date(NaiveDate::from_ymd_opt(2015, 10, 1).unwrap()),
            Cell::Float(2.5),
        ];
        assert_eq!(pa.cell_value(&row, "pMeetings"), Some(2.5));
    }

    #[test]
    fn test_import_row_records_tracked_headings_once() {
        let pa = analysis();
        let mut row = sample_row();
        row[6] = Cell::Int(45811);
        row[16] = Cell::Float(1.25);
        row[19] = Cell::Float(0.5);
        row[54] = Cell::from("in");

        // clientCaseNumber, pMeetings, pTravel, officelocation_in, officelocation_total
        assert_eq!(pa.import_row(&row).unwrap(), (5, 0));
        assert_eq!(pa.import_row(&row).unwrap(), (0, 5));
        assert_eq!(pa.store().count().unwrap(), 5);
    }

    #[test]
    fn test_row_without_date_is_rejected() {
        let pa = analysis();
        let mut row = sample_row();
        row[5] = Cell::Empty;
        row[16] = Cell::Float(1.0);
        assert!(matches!(
            pa.import_cell(&row, "pMeetings"),
            Err(ReportError::ProcessingError { .. })
        ));
        // rows with nothing to record never look at identity columns
        assert!(pa.import_cell(&row, "pTraining").unwrap().is_none());
    }

    #[test]
    fn test_summary() {
        let pa = analysis();
        let mut row = sample_row();
        row[16] = Cell::Float(2.0);
        row[21] = Cell::Float(1.5);
        row[6] = Cell::Int(45811);
        row[46] = Cell::Int(2);
        pa.import_row(&row).unwrap();

        let summary = pa.summary("arehl", None).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Amanda Rehl"));
        assert_eq!(summary.total_hours, 3.5);
        assert_eq!(summary.hours["cFaceToFace"], 1.5);
        assert_eq!(summary.incidents["cFee_NB_late"], 1);
        assert_eq!(summary.incidents["officelocation_total"], 0);
        assert_eq!(summary.unique_clients, 1);
        assert_eq!(summary.available_hours, Some(150.0));

        let stranger = pa.summary("nobody", None).unwrap();
        assert_eq!(stranger.available_hours, None);
        assert_eq!(stranger.total_hours, 0.0);
    }
}
