#![allow(dead_code)]

use chrono::NaiveDate;
use facility_reports::core::columns::DEFAULT_HEADINGS;
use facility_reports::core::subjects::SubjectSchema;
use facility_reports::domain::model::{Cell, Session, User};
use facility_reports::domain::weekend_manager::{Admission, WeekendManagerReport};
use facility_reports::{Database, ProductivityAnalysis, SqliteCellStore, SqliteReportStore};
use serde_json::{json, Value};
use std::path::Path;

pub fn analysis() -> ProductivityAnalysis<SqliteCellStore> {
    let store = SqliteCellStore::new(Database::open_in_memory().unwrap());
    ProductivityAnalysis::new(store, SubjectSchema::builtin().unwrap())
}

pub fn report_store() -> SqliteReportStore {
    SqliteReportStore::new(Database::open_in_memory().unwrap())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A 63-column row with every numeric column zeroed.
pub fn sample_row(report_id: i64, user_id: &str, report_date: NaiveDate) -> Vec<Cell> {
    let mut row = vec![Cell::Int(0); DEFAULT_HEADINGS.len()];
    row[0] = Cell::Int(report_id);
    row[1] = Cell::from(user_id);
    row[5] = Cell::Date(report_date);
    row
}

/// Writes a CSV export with the default heading row. Each row is given as
/// `(column index, value)` pairs on top of a zeroed row.
pub fn write_csv(path: &Path, rows: &[Vec<(usize, &str)>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(DEFAULT_HEADINGS).unwrap();
    for fields in rows {
        let mut record = vec!["0".to_string(); DEFAULT_HEADINGS.len()];
        for (i, value) in fields {
            record[*i] = value.to_string();
        }
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

pub fn manager() -> User {
    User::new(7, "dwhitfield").with_permission("wmr")
}

pub fn manager_session() -> Session {
    Session::signed_in(manager())
}

pub fn valid_report(creator_id: i64) -> WeekendManagerReport {
    let mut report = WeekendManagerReport::new(creator_id);
    report.facility_id = Some(3);
    report.date = Some(date(2015, 10, 3));
    report.name = Some("Dana Whitfield".to_string());
    report.clinical_manager = Some("Ruth Ellison".to_string());
    report.nighttime_supervisor = Some("Omar Bishop".to_string());
    report.therapist = Some("Lena Park".to_string());
    report.dietary_supervisor = Some("Carl Mendes".to_string());
    report.friday_initial_census = Some(112);
    report.friday_net_census = Some(110);
    report.saturday_net_census = Some(111);
    report.sunday_net_census = Some(113);
    report.admissions.push(Admission {
        resident_name: Some("Harold Finch".to_string()),
        room_number: Some("214".to_string()),
        admitted_from: Some("St. Mary's".to_string()),
        notes: None,
    });
    report
}

/// Form parameters for a complete report, as a browser would post them.
pub fn valid_attributes() -> Value {
    json!({
        "facility_id": "3",
        "date": "2015-10-03",
        "name": "Dana Whitfield",
        "clinical_manager": "Ruth Ellison",
        "nighttime_supervisor": "Omar Bishop",
        "therapist": "Lena Park",
        "dietary_supervisor": "Carl Mendes",
        "friday_initial_census": "112",
        "friday_net_census": "110",
        "saturday_net_census": "111",
        "sunday_net_census": "113",
        "notes": "Quiet weekend",
        "admissions": [
            {"resident_name": "Harold Finch", "room_number": 214, "admitted_from": "St. Mary's"}
        ],
        "wmr_pharmacy_concerns": [
            {"description": "Late delivery", "action_taken": "Called the pharmacy"}
        ]
    })
}

pub fn invalid_attributes() -> Value {
    json!({"name": "", "friday_net_census": "-4"})
}
