use crate::domain::model::Subject;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use serde::Deserialize;
use std::collections::HashSet;

const DEFAULT_SCHEMA: &str = include_str!("../../config/subjects.toml");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectSchema {
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl SubjectSchema {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let schema: SubjectSchema = toml::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// The schema shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_SCHEMA)
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn find(&self, user_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.user_id == user_id)
    }

    /// Looks a field up by its schema name (`name`, `userID`, `expected_hours`).
    pub fn field(&self, user_id: &str, field: &str) -> Option<serde_json::Value> {
        let subject = self.find(user_id)?;
        let value = serde_json::to_value(subject).ok()?;
        value.get(field).cloned()
    }
}

impl Validate for SubjectSchema {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            validate_non_empty_string("subjects.name", &subject.name)?;
            validate_non_empty_string("subjects.userID", &subject.user_id)?;
            validate_positive_number("subjects.expected_hours", subject.expected_hours, 0.0)?;
            if !seen.insert(subject.user_id.as_str()) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "subjects.userID".to_string(),
                    value: subject.user_id.clone(),
                    reason: "Duplicate userID in subject schema".to_string(),
                });
            }
        }
        Ok(())
    }
}
