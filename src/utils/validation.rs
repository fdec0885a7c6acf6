use crate::utils::error::{ReportError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: f64, min_value: f64) -> Result<()> {
    if !value.is_finite() || value < min_value {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 檢查副檔名清單只包含支援的試算表格式
pub fn validate_extensions(field_name: &str, extensions: &[String], supported: &[&str]) -> Result<()> {
    let supported_set: HashSet<&str> = supported.iter().copied().collect();

    if extensions.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: String::new(),
            reason: "At least one extension is required".to_string(),
        });
    }

    for ext in extensions {
        let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
        if !supported_set.contains(normalized.as_str()) {
            return Err(ReportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: ext.clone(),
                reason: format!(
                    "Unsupported file extension. Supported extensions: {}",
                    supported.join(", ")
                ),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("import.data_path", "./data").is_ok());
        assert!(validate_path("import.data_path", "").is_err());
        assert!(validate_path("import.data_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("expected_hours", 150.0, 0.0).is_ok());
        assert!(validate_positive_number("expected_hours", -1.0, 0.0).is_err());
        assert!(validate_positive_number("expected_hours", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_extensions() {
        let exts = vec!["xls".to_string(), ".CSV".to_string()];
        assert!(validate_extensions("import.extensions", &exts, &["xls", "xlsx", "csv"]).is_ok());

        let invalid = vec!["txt".to_string()];
        assert!(validate_extensions("import.extensions", &invalid, &["xls", "csv"]).is_err());
        assert!(validate_extensions("import.extensions", &[], &["xls"]).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("subjects.name", "Amanda Rehl").is_ok());
        assert!(validate_non_empty_string("subjects.name", "   ").is_err());
    }
}
