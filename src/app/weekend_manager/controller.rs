use crate::app::weekend_manager::params::{self, permit};
use crate::domain::model::{Session, User};
use crate::domain::ports::ReportStore;
use crate::domain::weekend_manager::{ValidationErrors, WeekendManagerReport};
use crate::utils::error::Result;
use serde_json::{Map, Value};

pub const PERMISSION: &str = "wmr";
pub const LOGIN_PATH: &str = "/login";
pub const INDEX_PATH: &str = "/weekend_manager_reports";
pub const CONFIRM_NEW_PATH: &str = "/weekend_manager_reports/confirm_new";

pub fn report_path(id: i64) -> String {
    format!("{}/{}", INDEX_PATH, id)
}

/// Data handed to the template being rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assigns {
    pub current_reports: Vec<WeekendManagerReport>,
    pub report: Option<WeekendManagerReport>,
    pub errors: ValidationErrors,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Render {
        template: &'static str,
        status: u16,
        assigns: Box<Assigns>,
    },
    Redirect {
        location: String,
        notice: Option<String>,
    },
}

impl Response {
    fn render(template: &'static str, assigns: Assigns) -> Self {
        Response::Render {
            template,
            status: 200,
            assigns: Box::new(assigns),
        }
    }

    fn redirect(location: impl Into<String>, notice: Option<&str>) -> Self {
        Response::Redirect {
            location: location.into(),
            notice: notice.map(str::to_string),
        }
    }

    fn forbidden() -> Self {
        Response::Render {
            template: "shared/forbidden",
            status: 403,
            assigns: Box::default(),
        }
    }

    fn not_found() -> Self {
        Response::Render {
            template: "shared/not_found",
            status: 404,
            assigns: Box::default(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Response::Render { status, .. } => *status,
            Response::Redirect { .. } => 302,
        }
    }

    pub fn template(&self) -> Option<&str> {
        match self {
            Response::Render { template, .. } => Some(*template),
            Response::Redirect { .. } => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Response::Redirect { location, .. } => Some(location.as_str()),
            Response::Render { .. } => None,
        }
    }

    pub fn assigns(&self) -> Option<&Assigns> {
        match self {
            Response::Render { assigns, .. } => Some(assigns.as_ref()),
            Response::Redirect { .. } => None,
        }
    }
}

/// Request handlers for the weekend manager report resource.
pub struct WeekendManagerReportsController<R: ReportStore> {
    store: R,
}

impl<R: ReportStore> WeekendManagerReportsController<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    fn authorize<'a>(&self, session: &'a Session) -> std::result::Result<&'a User, Response> {
        match &session.user {
            None => Err(Response::redirect(LOGIN_PATH, Some("Please sign in first"))),
            Some(user) if user.has_permission(PERMISSION) => Ok(user),
            Some(user) => {
                tracing::warn!(user = %user.username, "weekend manager report access denied");
                Err(Response::forbidden())
            }
        }
    }

    pub fn weekend_manager_report_params(&self, params: &Value) -> Result<Map<String, Value>> {
        permit(params)
    }

    pub fn index(&self, session: &Session) -> Result<Response> {
        let user = match self.authorize(session) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        Ok(Response::render(
            "index",
            Assigns {
                current_reports: self.store.current_reports(user.id)?,
                ..Assigns::default()
            },
        ))
    }

    /// Managers normally keep one report in progress, so starting another
    /// goes through a confirmation page unless `confirm_new` is set.
    pub fn new_report(&self, session: &Session, confirm_new: bool) -> Result<Response> {
        let user = match self.authorize(session) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        if !confirm_new && !self.store.current_reports(user.id)?.is_empty() {
            return Ok(Response::redirect(CONFIRM_NEW_PATH, None));
        }
        Ok(Response::render(
            "new",
            Assigns {
                report: Some(WeekendManagerReport::new(user.id)),
                ..Assigns::default()
            },
        ))
    }

    pub fn confirm_new(&self, session: &Session) -> Result<Response> {
        let user = match self.authorize(session) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        Ok(Response::render(
            "confirm_new",
            Assigns {
                current_reports: self.store.current_reports(user.id)?,
                ..Assigns::default()
            },
        ))
    }

    pub fn create(&self, session: &Session, params: &Value) -> Result<Response> {
        let user = match self.authorize(session) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };

        let mut report = WeekendManagerReport::new(user.id);
        let errors = match self.weekend_manager_report_params(params) {
            Ok(permitted) => self.assign_and_validate(&mut report, &permitted),
            Err(e) => {
                let mut errors = ValidationErrors::default();
                errors.add(params::PARAM_KEY, e.to_string());
                errors
            }
        };

        if !errors.is_empty() {
            tracing::debug!("weekend manager report rejected: {:?}", errors.full_messages());
            return Ok(Response::render(
                "new",
                Assigns {
                    report: Some(report),
                    errors,
                    ..Assigns::default()
                },
            ));
        }

        let saved = self.store.insert(&report)?;
        let id = saved.id.unwrap_or_default();
        tracing::info!(report_id = id, user = %user.username, "✅ weekend manager report created");
        Ok(Response::redirect(
            report_path(id),
            Some("Weekend manager report was successfully created."),
        ))
    }

    pub fn show(&self, session: &Session, id: i64) -> Result<Response> {
        if let Err(response) = self.authorize(session) {
            return Ok(response);
        }
        match self.store.find(id)? {
            Some(report) => Ok(Response::render(
                "reports/show",
                Assigns {
                    report: Some(report),
                    ..Assigns::default()
                },
            )),
            None => Ok(Response::not_found()),
        }
    }

    pub fn edit(&self, session: &Session, id: i64) -> Result<Response> {
        if let Err(response) = self.authorize(session) {
            return Ok(response);
        }
        match self.store.find(id)? {
            Some(report) if report.is_submitted() => Ok(Response::redirect(
                report_path(id),
                Some("Submitted reports can no longer be edited."),
            )),
            Some(report) => Ok(Response::render(
                "edit",
                Assigns {
                    report: Some(report),
                    ..Assigns::default()
                },
            )),
            None => Ok(Response::not_found()),
        }
    }

    pub fn update(&self, session: &Session, id: i64, params: &Value) -> Result<Response> {
        if let Err(response) = self.authorize(session) {
            return Ok(response);
        }
        let Some(mut report) = self.store.find(id)? else {
            return Ok(Response::not_found());
        };
        if report.is_submitted() {
            return Ok(Response::redirect(
                report_path(id),
                Some("Submitted reports can no longer be edited."),
            ));
        }

        let errors = match self.weekend_manager_report_params(params) {
            Ok(permitted) => self.assign_and_validate(&mut report, &permitted),
            Err(e) => {
                let mut errors = ValidationErrors::default();
                errors.add(params::PARAM_KEY, e.to_string());
                errors
            }
        };
        if !errors.is_empty() {
            return Ok(Response::render(
                "edit",
                Assigns {
                    report: Some(report),
                    errors,
                    ..Assigns::default()
                },
            ));
        }

        self.store.update(&report)?;
        Ok(Response::redirect(
            report_path(id),
            Some("Weekend manager report was successfully updated."),
        ))
    }

    pub fn destroy(&self, session: &Session, id: i64) -> Result<Response> {
        if let Err(response) = self.authorize(session) {
            return Ok(response);
        }
        if !self.store.delete(id)? {
            return Ok(Response::not_found());
        }
        tracing::info!(report_id = id, "weekend manager report deleted");
        Ok(Response::redirect(
            INDEX_PATH,
            Some("Weekend manager report was successfully destroyed."),
        ))
    }

    pub fn submit(&self, session: &Session, id: i64) -> Result<Response> {
        if let Err(response) = self.authorize(session) {
            return Ok(response);
        }
        let Some(mut report) = self.store.find(id)? else {
            return Ok(Response::not_found());
        };
        if report.is_submitted() {
            return Ok(Response::redirect(
                report_path(id),
                Some("This report was already submitted."),
            ));
        }

        report.submit()?;
        self.store.update(&report)?;
        tracing::info!(report_id = id, "📨 weekend manager report submitted");
        Ok(Response::redirect(
            report_path(id),
            Some("Weekend manager report was submitted."),
        ))
    }

    fn assign_and_validate(
        &self,
        report: &mut WeekendManagerReport,
        permitted: &Map<String, Value>,
    ) -> ValidationErrors {
        let mut errors = params::apply(report, permitted);
        if let Err(validation) = report.validate() {
            errors.merge(validation);
        }
        errors
    }
}
