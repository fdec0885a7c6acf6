use crate::adapters::spreadsheet::SUPPORTED_EXTENSIONS;
use crate::core::subjects::SubjectSchema;
use crate::core::ConfigProvider;
use crate::domain::model::Subject;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{validate_extensions, validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub data_path: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

fn default_extensions() -> Vec<String> {
    vec!["xls".to_string(), "xlsx".to_string(), "csv".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "./facility_reports.db".to_string(),
            },
            import: ImportConfig {
                data_path: "./data/productivity_analysis".to_string(),
                extensions: default_extensions(),
            },
            subjects: Vec::new(),
            logging: None,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ReportError::MissingConfigError {
                field: format!("config file {}", path.display()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FACILITY_REPORTS_HOME})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReportError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_path("database.path", &self.database.path)?;
        validate_path("import.data_path", &self.import.data_path)?;
        validate_extensions("import.extensions", &self.import.extensions, &SUPPORTED_EXTENSIONS)?;

        if self.database.path.contains("${") || self.import.data_path.contains("${") {
            return Err(ReportError::ConfigError {
                message: "unresolved environment variable in a configured path".to_string(),
            });
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            if !["compact", "json"].contains(&format) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        self.subject_schema()?;
        Ok(())
    }

    /// Subjects listed in the file replace the built-in schema.
    pub fn subject_schema(&self) -> Result<SubjectSchema> {
        if self.subjects.is_empty() {
            return SubjectSchema::builtin();
        }
        let schema = SubjectSchema::new(self.subjects.clone());
        schema.validate()?;
        Ok(schema)
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .is_some_and(|f| f == "json")
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }
}

impl ConfigProvider for AppConfig {
    fn data_path(&self) -> &str {
        &self.import.data_path
    }

    fn database_path(&self) -> &str {
        &self.database.path
    }

    fn allowed_extensions(&self) -> &[String] {
        &self.import.extensions
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
