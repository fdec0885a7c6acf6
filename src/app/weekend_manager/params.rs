//! Strong parameters for weekend manager report forms.
//!
//! Only whitelisted keys survive `permit`; `apply` then copies the permitted
//! values onto a report. Form posts send numbers as strings, so scalar values
//! are accepted either way.

use crate::domain::weekend_manager::{
    Admission, AdmissionInquiry, Concern, ConcernKind, Discharge, EmployeeCallOff,
    ValidationErrors, WeekendManagerReport,
};
use crate::utils::error::{ReportError, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const PARAM_KEY: &str = "weekend_manager_report";

const PERMITTED_FIELDS: [&str; 13] = [
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
    "notes",
];

const CONCERN_FIELDS: &[&str] = &["description", "action_taken"];

const PERMITTED_NESTED: [(&str, &[&str]); 8] = [
    ("admissions", &["resident_name", "room_number", "admitted_from", "notes"]),
    ("discharges", &["resident_name", "room_number", "discharged_to", "notes"]),
    ("admission_inquiries", &["prospect_name", "referral_source", "outcome"]),
    ("employee_call_offs", &["employee_name", "position", "shift", "replacement"]),
    ("wmr_resident_family_concerns", CONCERN_FIELDS),
    ("wmr_therapy_concerns", CONCERN_FIELDS),
    ("wmr_pharmacy_concerns", CONCERN_FIELDS),
    ("wmr_general_center_concerns", CONCERN_FIELDS),
];

/// Drops every key that is not whitelisted, including unknown keys inside
/// nested lists.
pub fn permit(params: &Value) -> Result<Map<String, Value>> {
    let object = params
        .as_object()
        .filter(|o| !o.is_empty())
        .ok_or_else(|| ReportError::ValidationError {
            message: format!("param is missing or the value is empty: {}", PARAM_KEY),
        })?;

    let mut permitted = Map::new();
    for field in PERMITTED_FIELDS {
        if let Some(value) = object.get(field) {
            if value.is_array() || value.is_object() {
                tracing::debug!("Unpermitted structured value for {}", field);
                continue;
            }
            permitted.insert(field.to_string(), value.clone());
        }
    }

    for (name, fields) in PERMITTED_NESTED {
        let Some(Value::Array(items)) = object.get(name) else {
            continue;
        };
        // a non-object entry keeps its slot as an empty record so indices stay aligned
        let filtered = items
            .iter()
            .map(|item| {
                let Some(item) = item.as_object() else {
                    tracing::debug!("Unpermitted non-object entry in {}", name);
                    return Value::Object(Map::new());
                };
                let kept: Map<String, Value> = fields
                    .iter()
                    .filter_map(|f| item.get(*f).map(|v| (f.to_string(), v.clone())))
                    .collect();
                Value::Object(kept)
            })
            .collect();
        permitted.insert(name.to_string(), Value::Array(filtered));
    }

    for key in object.keys() {
        if !permitted.contains_key(key) {
            tracing::debug!("Unpermitted parameter: {}", key);
        }
    }

    Ok(permitted)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer(field: &str, value: &Value, errors: &mut ValidationErrors) -> Option<i64> {
    let text = scalar_text(value)?;
    match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, "is not a number");
            None
        }
    }
}

fn date(field: &str, value: &Value, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    let text = scalar_text(value)?;
    match crate::domain::model::parse_date(&text) {
        Some(d) => Some(d),
        None => {
            errors.add(field, "is not a valid date");
            None
        }
    }
}

fn nested<T: DeserializeOwned>(
    name: &str,
    value: &Value,
    errors: &mut ValidationErrors,
) -> Vec<T> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        // child attributes are all text; numbers such as room 214 arrive unquoted
        let normalized: Map<String, Value> = item
            .as_object()
            .map(|o| {
                o.iter()
                    .map(|(k, v)| (k.clone(), scalar_text(v).map_or(Value::Null, Value::String)))
                    .collect()
            })
            .unwrap_or_default();
        match serde_json::from_value(Value::Object(normalized)) {
            Ok(record) => records.push(record),
            Err(e) => errors.add(format!("{}[{}]", name, i), e.to_string()),
        }
    }
    records
}

/// Copies permitted values onto `report`. Keys absent from `permitted` leave
/// the report untouched; a nested list replaces the existing one.
pub fn apply(report: &mut WeekendManagerReport, permitted: &Map<String, Value>) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for (key, value) in permitted {
        match key.as_str() {
            "creator_id" => report.creator_id = integer(key, value, &mut errors),
            "facility_id" => report.facility_id = integer(key, value, &mut errors),
            "date" => report.date = date(key, value, &mut errors),
            "name" => report.name = scalar_text(value),
            "clinical_manager" => report.clinical_manager = scalar_text(value),
            "nighttime_supervisor" => report.nighttime_supervisor = scalar_text(value),
            "therapist" => report.therapist = scalar_text(value),
            "dietary_supervisor" => report.dietary_supervisor = scalar_text(value),
            "friday_initial_census" => {
                report.friday_initial_census = integer(key, value, &mut errors)
            }
            "friday_net_census" => report.friday_net_census = integer(key, value, &mut errors),
            "saturday_net_census" => report.saturday_net_census = integer(key, value, &mut errors),
            "sunday_net_census" => report.sunday_net_census = integer(key, value, &mut errors),
            "notes" => report.notes = scalar_text(value),
            "admissions" => report.admissions = nested::<Admission>(key, value, &mut errors),
            "discharges" => report.discharges = nested::<Discharge>(key, value, &mut errors),
            "admission_inquiries" => {
                report.admission_inquiries = nested::<AdmissionInquiry>(key, value, &mut errors)
            }
            "employee_call_offs" => {
                report.employee_call_offs = nested::<EmployeeCallOff>(key, value, &mut errors)
            }
            other => match ConcernKind::ALL.into_iter().find(|k| k.attribute() == other) {
                Some(kind) => *report.concerns_mut(kind) = nested::<Concern>(key, value, &mut errors),
                None => tracing::debug!("Ignoring unknown attribute {}", other),
            },
        }
    }

    errors
}
