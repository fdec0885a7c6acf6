use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, params, OptionalExtension, Row};

use super::{format_timestamp, parse_day, parse_timestamp, Database};
use crate::domain::model::{DataCell, DateRange, NewDataCell};
use crate::domain::ports::CellStore;
use crate::utils::error::Result;

const SELECT_COLUMNS: &str =
    "id, report_id, user_id, heading, report_date, value, created_at";

const RANGE_FILTER: &str = "user_id = :user_id AND heading = :heading \
     AND (:start IS NULL OR report_date >= :start) \
     AND (:end IS NULL OR report_date <= :end)";

impl TryFrom<&Row<'_>> for DataCell {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        let report_date: String = row.get("report_date")?;
        let created_at: String = row.get("created_at")?;
        Ok(Self {
            id: row.get("id")?,
            report_id: row.get("report_id")?,
            user_id: row.get("user_id")?,
            heading: row.get("heading")?,
            report_date: parse_day(&report_date)?,
            value: row.get("value")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn range_bounds(range: Option<DateRange>) -> (Option<String>, Option<String>) {
    match range {
        Some(r) => (Some(r.start.to_string()), Some(r.end.to_string())),
        None => (None, None),
    }
}

/// `productivity_data_cells` table.
#[derive(Clone, Debug)]
pub struct SqliteCellStore {
    db: Database,
}

impl SqliteCellStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Overwrites the import timestamp of every cell.
    pub fn restamp(&self, created_at: DateTime<Utc>) -> Result<usize> {
        self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE productivity_data_cells SET created_at = ?1",
                params![format_timestamp(created_at)],
            )?)
        })
    }

    fn aggregate<T: rusqlite::types::FromSql>(
        &self,
        expression: &str,
        user_id: &str,
        heading: &str,
        range: Option<DateRange>,
    ) -> Result<T> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            "SELECT {} FROM productivity_data_cells WHERE {}",
            expression, RANGE_FILTER
        );
        self.db.with_connection(|conn| {
            Ok(conn.query_row(
                &sql,
                named_params! {
                    ":user_id": user_id,
                    ":heading": heading,
                    ":start": start,
                    ":end": end,
                },
                |row| row.get(0),
            )?)
        })
    }
}

fn insert_cell(conn: &rusqlite::Connection, cell: &NewDataCell, now: &str) -> Result<i64> {
    conn.execute(
        r#"
            INSERT INTO productivity_data_cells (
                report_id, user_id, heading, report_date, value, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            cell.report_id,
            cell.user_id,
            cell.heading,
            cell.report_date.to_string(),
            cell.value,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts the cells whose (report, heading) pair is not stored yet, pairs
/// earlier in `cells` included.
fn insert_missing_in(
    conn: &rusqlite::Connection,
    cells: &[NewDataCell],
    now: &str,
) -> Result<(usize, usize)> {
    let mut exists = conn.prepare(
        "SELECT 1 FROM productivity_data_cells WHERE report_id = ?1 AND heading = ?2 LIMIT 1",
    )?;
    let mut inserted = 0;
    let mut skipped = 0;
    for cell in cells {
        if exists
            .query_row(params![cell.report_id, cell.heading], |_| Ok(()))
            .optional()?
            .is_some()
        {
            skipped += 1;
            continue;
        }
        insert_cell(conn, cell, now)?;
        inserted += 1;
    }
    Ok((inserted, skipped))
}

impl CellStore for SqliteCellStore {
    fn insert(&self, cell: &NewDataCell) -> Result<DataCell> {
        let created_at = Utc::now();
        let id = self
            .db
            .with_connection(|conn| insert_cell(conn, cell, &format_timestamp(created_at)))?;
        Ok(DataCell {
            id,
            report_id: cell.report_id,
            user_id: cell.user_id.clone(),
            heading: cell.heading.clone(),
            report_date: cell.report_date,
            value: cell.value,
            created_at,
        })
    }

    fn insert_missing(&self, cells: &[NewDataCell]) -> Result<(usize, usize)> {
        let now = format_timestamp(Utc::now());
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let counts = insert_missing_in(&tx, cells, &now)?;
            tx.commit()?;
            Ok(counts)
        })
    }

    fn replace_all(&self, cells: &[NewDataCell]) -> Result<(usize, usize)> {
        let now = format_timestamp(Utc::now());
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM productivity_data_cells", [])?;
            let counts = insert_missing_in(&tx, cells, &now)?;
            tx.commit()?;
            tracing::debug!(removed, inserted = counts.0, "replaced productivity data cells");
            Ok(counts)
        })
    }

    fn contains(&self, report_id: i64, heading: &str) -> Result<bool> {
        self.db.with_connection(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM productivity_data_cells WHERE report_id = ?1 AND heading = ?2 LIMIT 1",
                    params![report_id, heading],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn clear(&self) -> Result<usize> {
        self.db
            .with_connection(|conn| Ok(conn.execute("DELETE FROM productivity_data_cells", [])?))
    }

    fn count(&self) -> Result<usize> {
        self.db.with_connection(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM productivity_data_cells", [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        })
    }

    fn count_heading(&self, heading: &str) -> Result<usize> {
        self.db.with_connection(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM productivity_data_cells WHERE heading = ?1",
                params![heading],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    fn last(&self) -> Result<Option<DataCell>> {
        let sql = format!(
            "SELECT {} FROM productivity_data_cells ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS
        );
        self.db.with_connection(|conn| {
            Ok(conn
                .query_row(&sql, [], |row| DataCell::try_from(row))
                .optional()?)
        })
    }

    fn sum(&self, user_id: &str, heading: &str, range: Option<DateRange>) -> Result<f64> {
        self.aggregate("COALESCE(SUM(value), 0.0)", user_id, heading, range)
    }

    fn count_for(&self, user_id: &str, heading: &str, range: Option<DateRange>) -> Result<usize> {
        let n: i64 = self.aggregate("COUNT(*)", user_id, heading, range)?;
        Ok(n as usize)
    }

    fn count_distinct(
        &self,
        user_id: &str,
        heading: &str,
        range: Option<DateRange>,
    ) -> Result<usize> {
        let n: i64 = self.aggregate("COUNT(DISTINCT value)", user_id, heading, range)?;
        Ok(n as usize)
    }

    fn earliest_import(&self) -> Result<Option<DateTime<Utc>>> {
        self.db.with_connection(|conn| {
            let earliest: Option<String> = conn.query_row(
                "SELECT MIN(created_at) FROM productivity_data_cells",
                [],
                |row| row.get(0),
            )?;
            Ok(earliest.as_deref().map(parse_timestamp).transpose()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cell(report_id: i64, heading: &str, day: u32, value: f64) -> NewDataCell {
        NewDataCell {
            report_id,
            user_id: "arehl".to_string(),
            heading: heading.to_string(),
            report_date: NaiveDate::from_ymd_opt(2015, 10, day).unwrap(),
            value,
        }
    }

    fn store() -> SqliteCellStore {
        SqliteCellStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_insert_and_last() {
        let store = store();
        assert!(store.last().unwrap().is_none());
        store.insert(&cell(1, "pMeetings", 2, 1.5)).unwrap();
        let saved = store.insert(&cell(2, "pMeetings", 3, 2.25)).unwrap();

        let last = store.last().unwrap().unwrap();
        assert_eq!(last.id, saved.id);
        assert_eq!(last.value, 2.25);
        assert_eq!(last.report_date, NaiveDate::from_ymd_opt(2015, 10, 3).unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_range_aggregates() {
        let store = store();
        store.insert(&cell(1, "pMeetings", 1, 1.0)).unwrap();
        store.insert(&cell(2, "pMeetings", 15, 2.5)).unwrap();
        store.insert(&cell(3, "pMeetings", 31, 4.0)).unwrap();
        store.insert(&cell(3, "pTravel", 31, 4.0)).unwrap();

        let first_half = DateRange::new(
            NaiveDate::from_ymd_opt(2015, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 10, 15).unwrap(),
        );
        assert_eq!(store.sum("arehl", "pMeetings", Some(first_half)).unwrap(), 3.5);
        assert_eq!(store.sum("arehl", "pMeetings", None).unwrap(), 7.5);
        assert_eq!(store.sum("bdalesio", "pMeetings", None).unwrap(), 0.0);
        assert_eq!(store.count_for("arehl", "pMeetings", Some(first_half)).unwrap(), 2);
        assert_eq!(store.count_heading("pTravel").unwrap(), 1);
    }

    #[test]
    fn test_insert_missing_skips_existing_pairs() {
        let store = store();
        store.insert(&cell(10, "pMeetings", 1, 1.0)).unwrap();

        let batch = vec![cell(10, "pMeetings", 1, 1.0), cell(10, "pTravel", 1, 0.5)];
        assert_eq!(store.insert_missing(&batch).unwrap(), (1, 1));
        assert_eq!(store.insert_missing(&batch).unwrap(), (0, 2));
        assert!(store.contains(10, "pTravel").unwrap());
        assert!(!store.contains(11, "pTravel").unwrap());
    }

    #[test]
    fn test_replace_all_swaps_the_table_contents() {
        let store = store();
        store.insert(&cell(1, "pMeetings", 1, 1.0)).unwrap();
        store.insert(&cell(2, "pTravel", 2, 0.5)).unwrap();

        let batch = vec![
            cell(1, "pMeetings", 1, 3.0),
            cell(3, "pMeetings", 3, 2.0),
            cell(3, "pMeetings", 3, 2.0),
        ];
        assert_eq!(store.replace_all(&batch).unwrap(), (2, 1));
        assert_eq!(store.count().unwrap(), 2);
        assert!(!store.contains(2, "pTravel").unwrap());
        assert_eq!(store.sum("arehl", "pMeetings", None).unwrap(), 5.0);
    }

    #[test]
    fn test_failed_replace_keeps_existing_cells() {
        let store = store();
        store.insert(&cell(1, "pMeetings", 1, 1.0)).unwrap();

        // NULL value violates the NOT NULL constraint mid-batch
        let batch = vec![cell(2, "pMeetings", 2, 1.0), cell(3, "pMeetings", 3, f64::NAN)];
        assert!(store.replace_all(&batch).is_err());
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.contains(1, "pMeetings").unwrap());
    }

    #[test]
    fn test_clear_and_restamp() {
        let store = store();
        assert!(store.earliest_import().unwrap().is_none());
        store.insert(&cell(1, "pMeetings", 1, 1.0)).unwrap();
        store.insert(&cell(2, "pMeetings", 2, 1.0)).unwrap();

        let month_ago = Utc::now() - chrono::Duration::days(30);
        assert_eq!(store.restamp(month_ago).unwrap(), 2);
        let earliest = store.earliest_import().unwrap().unwrap();
        assert!((earliest - month_ago).num_seconds().abs() < 1);

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }
}
