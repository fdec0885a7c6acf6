use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::domain::model::{excel_serial_to_date, parse_date, Cell, Row, Sheet};
use crate::utils::error::{ReportError, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["xls", "xlsx", "xlsm", "xlsb", "ods", "csv"];

pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Parses a spreadsheet file; the format is chosen from the file extension.
/// The first row supplies the headings.
pub fn read_sheet(name: &str, bytes: Vec<u8>) -> Result<Sheet> {
    let (headings, rows) = match extension_of(name).as_deref() {
        Some("csv") => read_csv(&bytes)?,
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext) => read_workbook(bytes)?,
        _ => {
            return Err(ReportError::processing(format!(
                "unsupported spreadsheet format: {}",
                name
            )))
        }
    };

    tracing::debug!(
        "Read sheet {} ({} headings, {} rows)",
        name,
        headings.len(),
        rows.len()
    );

    Ok(Sheet {
        name: name.to_string(),
        headings,
        rows,
    })
}

fn read_workbook(bytes: Vec<u8>) -> Result<(Vec<String>, Vec<Row>)> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::processing("workbook has no sheets"))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headings = match rows.next() {
        Some(header) => header.iter().map(|c| data_to_cell(c).as_text()).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|row| row.iter().map(data_to_cell).collect::<Row>())
        .filter(|row| !row.iter().all(Cell::is_blank))
        .collect();

    Ok((headings, rows))
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_date(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        _ => Cell::Empty,
    }
}

fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Row>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headings = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = record.iter().map(parse_field).collect();
        if !row.iter().all(Cell::is_blank) {
            rows.push(row);
        }
    }

    Ok((headings, rows))
}

/// CSV exports carry no type information, so each field is typed by parsing.
pub fn parse_field(field: &str) -> Cell {
    let field = field.trim();
    if field.is_empty() {
        return Cell::Empty;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Cell::Int(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        if f.is_finite() {
            return Cell::Float(f);
        }
    }
    if let Some(date) = parse_date(field) {
        return Cell::Date(date);
    }
    match field.to_ascii_lowercase().as_str() {
        "true" => Cell::Bool(true),
        "false" => Cell::Bool(false),
        _ => Cell::Text(field.to_string()),
    }
}
