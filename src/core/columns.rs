//! Timesheet export layout and the per-heading cell rules.
//!
//! The export is a wide, fixed-width sheet of 63 positional columns. Some of
//! the headings we track are not real columns: `officelocation_in`,
//! `officelocation_out` and `officelocation_total` are derived from the
//! `officelocation` column, and the `cFee_NB_*` headings from `cFee_NB`.

use crate::domain::model::Cell;
use std::collections::HashMap;

pub const NO_LABEL: &str = "[No label matches this field]";

pub const REPORT_ID: &str = "reportID";
pub const USER_ID: &str = "userID";
pub const REPORT_DATE: &str = "reportDate";
pub const CLIENT_CASE_NUMBER: &str = "clientCaseNumber";
pub const TRAVEL: &str = "pTravel";

const OFFICE_LOCATION: &str = "officelocation";
const CANCELLED_UNITS: &str = "cUnits_NB";
const CANCELLATION_CODE: &str = "cFee_NB";

/// `cFee_NB` value recorded for a late cancellation.
const LATE_CANCELLATION: i64 = 2;

pub const DEFAULT_HEADINGS: [&str; 63] = [
    "reportID",
    "userID",
    "lastEditBy",
    "lastEditDate",
    "lastOpenDate",
    "reportDate",
    "clientCaseNumber",
    "serviceSuffix",
    "clientCaseService",
    "billType",
    "serviceCode",
    "isBillable",
    "placeofService",
    "modifier",
    "minorityCode",
    "titleXXRecipient",
    "pMeetings",
    "pTraining",
    "pSupervision",
    "pTravel",
    "pTotal",
    "cFaceToFace",
    "cTelephone",
    "cCollateralTelephone",
    "cCollateralFacetoFace",
    "cGroup",
    "cDocumentation",
    "cCollaboration",
    "cTotal",
    "cNumMiles",
    "cMinutes",
    "cOneWay",
    "cUnits",
    "cFee",
    "cFaceToFace_NB",
    "cTelephone_NB",
    "cCollateralTelephone_NB",
    "cCollateralFacetoFace_NB",
    "cGroup_NB",
    "cDocumentation_NB",
    "cCollaboration_NB",
    "cTotal_NB",
    "cNumMiles_NB",
    "cMinutes_NB",
    "cOneWay_NB",
    "cUnits_NB",
    "cFee_NB",
    "Comments",
    "dontCredit",
    "refNumber",
    "groupRef",
    "appointmentID",
    "clockin",
    "clockout",
    "officelocation",
    "destination",
    "ledgerID",
    "currFee",
    "typeOfService",
    "serviceProvided",
    "flag",
    "Expr1",
    "Expr2",
];

pub const COLUMNS_TO_COUNT_HOURS: [&str; 10] = [
    "pMeetings",
    "pTraining",
    "pSupervision",
    "cFaceToFace",
    "cTelephone",
    "cCollateralTelephone",
    "cCollateralFacetoFace",
    "cGroup",
    "cDocumentation",
    "cCollaboration",
];

pub const COLUMNS_TO_COUNT_INCIDENTS: [&str; 6] = [
    "officelocation_in",
    "officelocation_out",
    "officelocation_total",
    "cFee_NB_total",
    "cFee_NB_late",
    "clientCaseNumber",
];

pub const EXTRA_COLUMNS_TO_TRACK: [&str; 2] = ["pTravel", "cNumMiles"];

// The agency reuses several export columns for its own service types, so the
// labels do not always match the column names.
const LABELS: [(&str, &str); 18] = [
    ("pMeetings", "Mental Health Assessment"),
    ("pTraining", "Psychiatric Evaluation"),
    ("pSupervision", "Case Management"),
    ("cFaceToFace", "Individual Therapy"),
    ("cTelephone", "Telephone Contact"),
    ("cCollateralTelephone", "Collateral Contact (Telephone)"),
    ("cCollateralFacetoFace", "Collateral Contact (Face to Face)"),
    ("cGroup", "Group Therapy"),
    ("cDocumentation", "Documentation"),
    ("cCollaboration", "Treatment Team Collaboration"),
    ("officelocation_in", "Sessions In Office"),
    ("officelocation_out", "Sessions Out of Office"),
    ("officelocation_total", "Sessions (Total)"),
    ("cFee_NB_total", "Cancellations (Total)"),
    ("cFee_NB_late", "Cancellations (Late)"),
    ("clientCaseNumber", "Unique Clients"),
    ("pTravel", "Travel Time"),
    ("cNumMiles", "Miles Driven"),
];

pub fn label(heading: Option<&str>) -> &'static str {
    heading
        .and_then(|h| LABELS.iter().find(|(name, _)| *name == h))
        .map(|(_, label)| *label)
        .unwrap_or(NO_LABEL)
}

/// Every heading the import records, in group order.
pub fn tracked_columns() -> Vec<&'static str> {
    COLUMNS_TO_COUNT_HOURS
        .iter()
        .chain(COLUMNS_TO_COUNT_INCIDENTS.iter())
        .chain(EXTRA_COLUMNS_TO_TRACK.iter())
        .copied()
        .collect()
}

pub fn default_headings() -> Vec<String> {
    DEFAULT_HEADINGS.iter().map(|h| h.to_string()).collect()
}

/// Name → position lookup for one sheet's heading row.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new<S: AsRef<str>>(headings: &[S]) -> Self {
        let mut positions = HashMap::with_capacity(headings.len());
        for (i, heading) in headings.iter().enumerate() {
            // first occurrence wins when an export repeats a heading
            positions.entry(heading.as_ref().trim().to_string()).or_insert(i);
        }
        Self { positions }
    }

    pub fn position(&self, heading: &str) -> Option<usize> {
        self.positions.get(heading).copied()
    }

    pub fn cell<'a>(&self, row: &'a [Cell], heading: &str) -> Option<&'a Cell> {
        self.position(heading).and_then(|i| row.get(i))
    }

    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|h| !self.positions.contains_key(**h))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OfficeLocation {
    In,
    Out,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRule<'a> {
    Office(OfficeLocation),
    CancellationTotal,
    CancellationLate,
    Numeric(&'a str),
}

fn rule_for(heading: &str) -> ColumnRule<'_> {
    match heading {
        "officelocation_in" => ColumnRule::Office(OfficeLocation::In),
        "officelocation_out" => ColumnRule::Office(OfficeLocation::Out),
        "officelocation_total" => ColumnRule::Office(OfficeLocation::Total),
        "cFee_NB_total" => ColumnRule::CancellationTotal,
        "cFee_NB_late" => ColumnRule::CancellationLate,
        other => ColumnRule::Numeric(other),
    }
}

fn non_zero(cell: Option<&Cell>) -> Option<f64> {
    cell.and_then(Cell::as_f64).filter(|v| *v != 0.0)
}

fn is_cancelled(index: &ColumnIndex, row: &[Cell]) -> bool {
    non_zero(index.cell(row, CANCELLED_UNITS)).is_some()
        || non_zero(index.cell(row, CANCELLATION_CODE)).is_some()
}

/// Value recorded for `heading` in `row`, or `None` when nothing should be
/// recorded.
pub fn cell_value(index: &ColumnIndex, row: &[Cell], heading: &str) -> Option<f64> {
    match rule_for(heading) {
        ColumnRule::Office(which) => {
            if is_cancelled(index, row) {
                return None;
            }
            let location = index.cell(row, OFFICE_LOCATION)?.as_text().to_ascii_lowercase();
            let hit = match which {
                OfficeLocation::In => location == "in",
                OfficeLocation::Out => location == "out",
                OfficeLocation::Total => location == "in" || location == "out",
            };
            hit.then_some(1.0)
        }
        ColumnRule::CancellationTotal => {
            non_zero(index.cell(row, CANCELLATION_CODE)).map(|_| 1.0)
        }
        ColumnRule::CancellationLate => {
            let code = index.cell(row, CANCELLATION_CODE).and_then(Cell::as_i64)?;
            (code == LATE_CANCELLATION).then_some(1.0)
        }
        ColumnRule::Numeric(name) => non_zero(index.cell(row, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Vec<Cell> {
        let mut row = vec![Cell::Int(0); 63];
        row[0] = Cell::Int(536630);
        row[1] = Cell::from("arehl");
        row
    }

    fn index() -> ColumnIndex {
        ColumnIndex::new(&DEFAULT_HEADINGS)
    }

    #[test]
    fn test_default_positions() {
        let index = index();
        assert_eq!(index.position("clientCaseNumber"), Some(6));
        assert_eq!(index.position("pTravel"), Some(19));
        assert_eq!(index.position("cUnits_NB"), Some(45));
        assert_eq!(index.position("cFee_NB"), Some(46));
        assert_eq!(index.position("officelocation"), Some(54));
        assert_eq!(index.position("Expr2"), Some(62));
        assert!(index.missing(&[REPORT_ID, USER_ID, REPORT_DATE]).is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(label(None), NO_LABEL);
        assert_eq!(label(Some("non_existent")), NO_LABEL);
        assert_eq!(label(Some("pMeetings")), "Mental Health Assessment");
        for heading in tracked_columns() {
            assert_ne!(label(Some(heading)), NO_LABEL, "{} has no label", heading);
        }
    }

    #[test]
    fn test_office_location_values() {
        let index = index();
        let mut row = sample_row();

        row[54] = Cell::from("in");
        assert_eq!(cell_value(&index, &row, "officelocation_in"), Some(1.0));
        assert_eq!(cell_value(&index, &row, "officelocation_out"), None);
        assert_eq!(cell_value(&index, &row, "officelocation_total"), Some(1.0));

        row[54] = Cell::from("OUT");
        assert_eq!(cell_value(&index, &row, "officelocation_out"), Some(1.0));
        assert_eq!(cell_value(&index, &row, "officelocation_total"), Some(1.0));

        row[54] = Cell::from("");
        assert_eq!(cell_value(&index, &row, "officelocation_total"), None);
    }

    #[test]
    fn test_cancellation_suppresses_office_location() {
        let index = index();
        let mut row = sample_row();
        row[54] = Cell::from("out");
        row[45] = Cell::Int(1);
        assert_eq!(cell_value(&index, &row, "officelocation_out"), None);

        row[45] = Cell::Int(0);
        row[46] = Cell::Int(1);
        assert_eq!(cell_value(&index, &row, "officelocation_out"), None);
        assert_eq!(cell_value(&index, &row, "cFee_NB_total"), Some(1.0));
        assert_eq!(cell_value(&index, &row, "cFee_NB_late"), None);

        row[46] = Cell::Int(2);
        assert_eq!(cell_value(&index, &row, "cFee_NB_total"), Some(1.0));
        assert_eq!(cell_value(&index, &row, "cFee_NB_late"), Some(1.0));
    }

    #[test]
    fn test_zero_values_are_not_recorded() {
        let index = index();
        let mut row = sample_row();
        assert_eq!(cell_value(&index, &row, "clientCaseNumber"), None);
        row[6] = Cell::Int(45811);
        assert_eq!(cell_value(&index, &row, "clientCaseNumber"), Some(45811.0));
        row[16] = Cell::Float(1.33);
        assert_eq!(cell_value(&index, &row, "pMeetings"), Some(1.33));
        assert_eq!(cell_value(&index, &row, "notAColumn"), None);
    }
}
