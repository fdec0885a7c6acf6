//! Weekend Manager Report: a shift-handoff report filled in by the manager on
//! duty over the weekend, with nested admissions, discharges, inquiries,
//! staff call-offs and concern notes.
//!
//! A report starts out `current` and becomes read-only once submitted.

use crate::utils::error::{ReportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Current,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Current => "current",
            ReportStatus::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current" => Ok(ReportStatus::Current),
            "submitted" => Ok(ReportStatus::Submitted),
            other => Err(ReportError::processing(format!(
                "unknown report status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admission {
    pub resident_name: Option<String>,
    pub room_number: Option<String>,
    pub admitted_from: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discharge {
    pub resident_name: Option<String>,
    pub room_number: Option<String>,
    pub discharged_to: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionInquiry {
    pub prospect_name: Option<String>,
    pub referral_source: Option<String>,
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeCallOff {
    pub employee_name: Option<String>,
    pub position: Option<String>,
    pub shift: Option<String>,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Concern {
    pub description: Option<String>,
    pub action_taken: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcernKind {
    ResidentFamily,
    Therapy,
    Pharmacy,
    GeneralCenter,
}

impl ConcernKind {
    pub const ALL: [ConcernKind; 4] = [
        ConcernKind::ResidentFamily,
        ConcernKind::Therapy,
        ConcernKind::Pharmacy,
        ConcernKind::GeneralCenter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConcernKind::ResidentFamily => "resident_family",
            ConcernKind::Therapy => "therapy",
            ConcernKind::Pharmacy => "pharmacy",
            ConcernKind::GeneralCenter => "general_center",
        }
    }

    /// Name of the nested attribute list on the report.
    pub fn attribute(self) -> &'static str {
        match self {
            ConcernKind::ResidentFamily => "wmr_resident_family_concerns",
            ConcernKind::Therapy => "wmr_therapy_concerns",
            ConcernKind::Pharmacy => "wmr_pharmacy_concerns",
            ConcernKind::GeneralCenter => "wmr_general_center_concerns",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

/// Field errors keyed by attribute name, e.g. `therapist` or
/// `admissions[0].resident_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Adds the errors of `other` for fields that have none yet, so a
    /// parse error is not repeated as "can't be blank".
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_insert(messages);
        }
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{} {}", field, message))
            })
            .collect()
    }
}

impl From<ValidationErrors> for ReportError {
    fn from(errors: ValidationErrors) -> Self {
        ReportError::ValidationError {
            message: errors.full_messages().join(", "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekendManagerReport {
    pub id: Option<i64>,
    pub creator_id: Option<i64>,
    pub facility_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub name: Option<String>,
    pub clinical_manager: Option<String>,
    pub nighttime_supervisor: Option<String>,
    pub therapist: Option<String>,
    pub dietary_supervisor: Option<String>,
    pub friday_initial_census: Option<i64>,
    pub friday_net_census: Option<i64>,
    pub saturday_net_census: Option<i64>,
    pub sunday_net_census: Option<i64>,
    pub notes: Option<String>,
    pub status: ReportStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub admissions: Vec<Admission>,
    pub discharges: Vec<Discharge>,
    pub admission_inquiries: Vec<AdmissionInquiry>,
    pub employee_call_offs: Vec<EmployeeCallOff>,
    pub wmr_resident_family_concerns: Vec<Concern>,
    pub wmr_therapy_concerns: Vec<Concern>,
    pub wmr_pharmacy_concerns: Vec<Concern>,
    pub wmr_general_center_concerns: Vec<Concern>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl WeekendManagerReport {
    pub fn new(creator_id: i64) -> Self {
        Self {
            creator_id: Some(creator_id),
            ..Self::default()
        }
    }

    pub fn concerns(&self, kind: ConcernKind) -> &[Concern] {
        match kind {
            ConcernKind::ResidentFamily => &self.wmr_resident_family_concerns,
            ConcernKind::Therapy => &self.wmr_therapy_concerns,
            ConcernKind::Pharmacy => &self.wmr_pharmacy_concerns,
            ConcernKind::GeneralCenter => &self.wmr_general_center_concerns,
        }
    }

    pub fn concerns_mut(&mut self, kind: ConcernKind) -> &mut Vec<Concern> {
        match kind {
            ConcernKind::ResidentFamily => &mut self.wmr_resident_family_concerns,
            ConcernKind::Therapy => &mut self.wmr_therapy_concerns,
            ConcernKind::Pharmacy => &mut self.wmr_pharmacy_concerns,
            ConcernKind::GeneralCenter => &mut self.wmr_general_center_concerns,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == ReportStatus::Submitted
    }

    pub fn submit(&mut self) -> Result<()> {
        if self.is_submitted() {
            return Err(ReportError::InvalidState {
                message: format!(
                    "weekend manager report {} was already submitted",
                    self.id.map(|id| id.to_string()).unwrap_or_default()
                ),
            });
        }
        self.status = ReportStatus::Submitted;
        self.submitted_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.creator_id.is_none() {
            errors.add("creator_id", "can't be blank");
        }
        if self.facility_id.is_none() {
            errors.add("facility_id", "can't be blank");
        }
        if self.date.is_none() {
            errors.add("date", "can't be blank");
        }

        let names = [
            ("name", &self.name),
            ("clinical_manager", &self.clinical_manager),
            ("nighttime_supervisor", &self.nighttime_supervisor),
            ("therapist", &self.therapist),
            ("dietary_supervisor", &self.dietary_supervisor),
        ];
        for (field, value) in names {
            if blank(value) {
                errors.add(field, "can't be blank");
            }
        }

        let censuses = [
            ("friday_initial_census", self.friday_initial_census),
            ("friday_net_census", self.friday_net_census),
            ("saturday_net_census", self.saturday_net_census),
            ("sunday_net_census", self.sunday_net_census),
        ];
        for (field, value) in censuses {
            match value {
                None => errors.add(field, "can't be blank"),
                Some(n) if n < 0 => errors.add(field, "must be greater than or equal to 0"),
                Some(_) => {}
            }
        }

        for (i, admission) in self.admissions.iter().enumerate() {
            if blank(&admission.resident_name) {
                errors.add(format!("admissions[{}].resident_name", i), "can't be blank");
            }
        }
        for (i, discharge) in self.discharges.iter().enumerate() {
            if blank(&discharge.resident_name) {
                errors.add(format!("discharges[{}].resident_name", i), "can't be blank");
            }
        }
        for (i, inquiry) in self.admission_inquiries.iter().enumerate() {
            if blank(&inquiry.prospect_name) {
                errors.add(
                    format!("admission_inquiries[{}].prospect_name", i),
                    "can't be blank",
                );
            }
        }
        for (i, call_off) in self.employee_call_offs.iter().enumerate() {
            if blank(&call_off.employee_name) {
                errors.add(
                    format!("employee_call_offs[{}].employee_name", i),
                    "can't be blank",
                );
            }
        }
        for kind in ConcernKind::ALL {
            for (i, concern) in self.concerns(kind).iter().enumerate() {
                if blank(&concern.description) {
                    errors.add(
                        format!("{}[{}].description", kind.attribute(), i),
                        "can't be blank",
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_report() -> WeekendManagerReport {
        WeekendManagerReport {
            facility_id: Some(3),
            date: NaiveDate::from_ymd_opt(2015, 10, 3),
            name: Some("Dana Whitfield".into()),
            clinical_manager: Some("Marcus Lee".into()),
            nighttime_supervisor: Some("Priya Natarajan".into()),
            therapist: Some("Owen Baker".into()),
            dietary_supervisor: Some("Rosa Delgado".into()),
            friday_initial_census: Some(112),
            friday_net_census: Some(110),
            saturday_net_census: Some(111),
            sunday_net_census: Some(109),
            ..WeekendManagerReport::new(1)
        }
    }

    fn clear(report: &mut WeekendManagerReport, field: &str) {
        match field {
            "creator_id" => report.creator_id = None,
            "facility_id" => report.facility_id = None,
            "date" => report.date = None,
            "name" => report.name = None,
            "clinical_manager" => report.clinical_manager = None,
            "nighttime_supervisor" => report.nighttime_supervisor = None,
            "therapist" => report.therapist = Some("  ".into()),
            "dietary_supervisor" => report.dietary_supervisor = None,
            "friday_initial_census" => report.friday_initial_census = None,
            "friday_net_census" => report.friday_net_census = None,
            "saturday_net_census" => report.saturday_net_census = None,
            "sunday_net_census" => report.sunday_net_census = None,
            other => panic!("unknown field {}", other),
        }
    }

    #[test]
    fn test_required_fields_fail_when_cleared() {
        let fields = [
            "creator_id",
            "facility_id",
            "date",
            "name",
            "clinical_manager",
            "nighttime_supervisor",
            "therapist",
            "dietary_supervisor",
            "friday_initial_census",
            "friday_net_census",
            "saturday_net_census",
            "sunday_net_census",
        ];

        for field in fields {
            let mut report = complete_report();
            assert!(report.validate().is_ok(), "{} should start valid", field);
            clear(&mut report, field);
            let errors = report.validate().unwrap_err();
            assert!(errors.contains(field), "expected error on {}", field);
        }
    }

    #[test]
    fn test_negative_census_is_rejected() {
        let mut report = complete_report();
        report.sunday_net_census = Some(-1);
        let errors = report.validate().unwrap_err();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["sunday_net_census"]);
    }

    #[test]
    fn test_nested_records_are_validated() {
        let mut report = complete_report();
        report.admissions.push(Admission::default());
        report.wmr_pharmacy_concerns.push(Concern {
            description: Some("Late delivery of evening meds".into()),
            action_taken: None,
        });
        report.wmr_therapy_concerns.push(Concern::default());

        let errors = report.validate().unwrap_err();
        assert!(errors.contains("admissions[0].resident_name"));
        assert!(errors.contains("wmr_therapy_concerns[0].description"));
        assert!(!errors.contains("wmr_pharmacy_concerns[0].description"));
    }

    #[test]
    fn test_submit_lifecycle() {
        let mut report = complete_report();
        assert_eq!(report.status, ReportStatus::Current);
        report.submit().unwrap();
        assert!(report.is_submitted());
        assert!(report.submitted_at.is_some());
        assert!(matches!(report.submit(), Err(ReportError::InvalidState { .. })));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("submitted".parse::<ReportStatus>().unwrap(), ReportStatus::Submitted);
        assert!("draft".parse::<ReportStatus>().is_err());
        assert_eq!(ConcernKind::parse("therapy"), Some(ConcernKind::Therapy));
    }
}
