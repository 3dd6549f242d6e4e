use crate::api::Backend;
use crate::config::Config;
use crate::model::{Student, Subject, Teacher};
use crate::roles::RoleSet;
use crate::screens::catalog::CatalogScreen;
use crate::screens::enrollments::{EnrollmentScreen, Variant};
use crate::screens::self_service::{ProfileScreen, ReportCardScreen};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Http,
    Local,
}

pub struct AppState {
    pub config: Config,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            session: None,
        }
    }
}

/// Everything tied to one signed-in user. Reconfiguring replaces it whole.
pub struct Session {
    pub backend: Box<dyn Backend>,
    pub backend_kind: BackendKind,
    pub roles: RoleSet,
    pub subject: Option<String>,
    pub registry: EnrollmentScreen,
    pub grades: EnrollmentScreen,
    pub students: CatalogScreen<Student>,
    pub subjects: CatalogScreen<Subject>,
    pub teachers: CatalogScreen<Teacher>,
    pub report_card: ReportCardScreen,
    pub profile: ProfileScreen,
}

impl Session {
    pub fn new(
        backend: Box<dyn Backend>,
        backend_kind: BackendKind,
        roles: RoleSet,
        subject: Option<String>,
    ) -> Self {
        Session {
            backend,
            backend_kind,
            roles,
            subject,
            registry: EnrollmentScreen::new(Variant::Registry),
            grades: EnrollmentScreen::new(Variant::Grades),
            students: CatalogScreen::new(),
            subjects: CatalogScreen::new(),
            teachers: CatalogScreen::new(),
            report_card: ReportCardScreen::default(),
            profile: ProfileScreen::default(),
        }
    }
}
