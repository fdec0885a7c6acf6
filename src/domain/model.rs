use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single spreadsheet cell, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Numeric value of the cell. NaN and infinities count as no value.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Int(i) => *i as f64,
            Cell::Float(f) => *f,
            Cell::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Cell::Text(s) => s.trim().parse().ok()?,
            Cell::Empty | Cell::Date(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.to_string(),
        }
    }

    /// 日期欄位可能是真正的日期、Excel 序號或文字
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Float(serial) => excel_serial_to_date(*serial),
            Cell::Int(serial) => excel_serial_to_date(*serial as f64),
            Cell::Text(s) => parse_date(s),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY` and `MM/DD/YY`; a trailing time part is
/// ignored. chrono's `%Y` also takes two digits, so the year width picks the
/// format.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.split_whitespace().next().unwrap_or(value);

    if date_part.contains('-') {
        return NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .ok()
            .filter(|d| d.year() >= 1000);
    }

    let fmt = match date_part.rsplit('/').next().map(str::len) {
        Some(2) => "%m/%d/%y",
        Some(4) => "%m/%d/%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(date_part, fmt).ok()
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headings: Vec<String>,
    pub rows: Vec<Row>,
}

/// A persisted productivity fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCell {
    pub id: i64,
    pub report_id: i64,
    pub user_id: String,
    pub heading: String,
    pub report_date: NaiveDate,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDataCell {
    pub report_id: i64,
    pub user_id: String,
    pub heading: String,
    pub report_date: NaiveDate,
    pub value: f64,
}

/// Inclusive date range used by the reporting queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub files: usize,
    pub rows: usize,
    pub cells: Vec<NewDataCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub files: usize,
    pub rows: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// An employee covered by the productivity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub expected_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductivitySummary {
    pub user_id: String,
    pub name: Option<String>,
    pub range: Option<DateRange>,
    pub hours: BTreeMap<String, f64>,
    pub total_hours: f64,
    pub available_hours: Option<f64>,
    pub incidents: BTreeMap<String, usize>,
    pub unique_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub permissions: Vec<String>,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.permissions.push(name.into());
        self
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p == name || p == "admin")
    }
}

/// The authenticated caller of a request, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
}

impl Session {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}
