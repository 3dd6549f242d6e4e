use super::{FieldError, Phase, SelectOption};
use crate::api::{self, Backend, ReferenceSet, Resource};
use crate::error::{ClientError, ClientResult};
use crate::model::{EnrollmentPayload, EnrollmentView};
use crate::period::{split_for_form, Period, Term};
use crate::resolve::resolve;
use crate::validate::{parse_grade, required};
use serde::{Deserialize, Serialize};

pub const LOAD_FAILED: &str = "No se pudo cargar la información.";
pub const DELETE_FAILED: &str = "Error al eliminar";

/// Which page hosts the controller. Same behaviour, different role gate
/// and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    Registry,
    Grades,
}

impl Variant {
    fn created_notice(self) -> Option<&'static str> {
        match self {
            Variant::Registry => None,
            Variant::Grades => Some("Nota creada"),
        }
    }

    fn updated_notice(self) -> Option<&'static str> {
        match self {
            Variant::Registry => None,
            Variant::Grades => Some("Nota actualizada"),
        }
    }

    fn deleted_notice(self) -> Option<&'static str> {
        match self {
            Variant::Registry => None,
            Variant::Grades => Some("Inscripción eliminada"),
        }
    }
}

/// Raw form input; nothing here has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollmentForm {
    pub student_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub year: String,
    pub term: String,
    pub grade: String,
}

impl Default for EnrollmentForm {
    fn default() -> Self {
        EnrollmentForm {
            student_id: String::new(),
            subject_id: String::new(),
            teacher_id: String::new(),
            year: String::new(),
            term: Term::First.as_str().to_string(),
            grade: String::new(),
        }
    }
}

impl EnrollmentForm {
    /// Checks run in form order: selects and year, then grade, then period.
    pub fn to_payload(&self) -> ClientResult<EnrollmentPayload> {
        let student_id = required("alumnoId", &self.student_id)?;
        let subject_id = required("materiaId", &self.subject_id)?;
        let teacher_id = required("docenteId", &self.teacher_id)?;
        let year = required("year", &self.year)?;
        let grade = parse_grade(&self.grade)?;
        let period = Period::new(&year, self.term.trim())?;
        Ok(EnrollmentPayload {
            student_id,
            subject_id,
            teacher_id,
            period: period.to_string(),
            grade,
        })
    }
}

#[derive(Debug, Clone)]
pub enum EnrollmentEvent {
    Loaded(ReferenceSet),
    LoadFailed(String),
    Removed(String),
}

#[derive(Debug, Clone)]
pub struct EnrollmentScreen {
    variant: Variant,
    refs: ReferenceSet,
    views: Vec<EnrollmentView>,
    form: EnrollmentForm,
    editing: Option<String>,
    phase: Phase,
    error: Option<String>,
    field_error: Option<FieldError>,
    notice: Option<String>,
    loaded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSnapshot<'a> {
    pub variant: Variant,
    pub loaded: bool,
    pub phase: &'a Phase,
    pub rows: &'a [EnrollmentView],
    pub form: &'a EnrollmentForm,
    pub editing: Option<&'a str>,
    pub error: Option<&'a str>,
    pub field_error: Option<&'a FieldError>,
    pub notice: Option<&'a str>,
    pub students: Vec<SelectOption>,
    pub subjects: Vec<SelectOption>,
    pub teachers: Vec<SelectOption>,
}

impl EnrollmentScreen {
    pub fn new(variant: Variant) -> Self {
        EnrollmentScreen {
            variant,
            refs: ReferenceSet::default(),
            views: Vec::new(),
            form: EnrollmentForm::default(),
            editing: None,
            phase: Phase::Idle,
            error: None,
            field_error: None,
            notice: None,
            loaded: false,
        }
    }

    pub fn apply(&mut self, event: EnrollmentEvent) {
        match event {
            EnrollmentEvent::Loaded(refs) => {
                self.refs = refs;
                self.recompute();
                self.loaded = true;
                self.error = None;
            }
            EnrollmentEvent::LoadFailed(message) => {
                // Keep the last good lists on screen.
                self.loaded = true;
                self.error = Some(message);
            }
            EnrollmentEvent::Removed(id) => {
                self.refs.records.retain(|r| r.id != id);
                self.recompute();
            }
        }
    }

    fn recompute(&mut self) {
        self.views = resolve(
            &self.refs.records,
            &self.refs.students,
            &self.refs.subjects,
            &self.refs.teachers,
        );
    }

    fn clear_messages(&mut self) {
        self.error = None;
        self.field_error = None;
        self.notice = None;
    }

    pub fn load(&mut self, backend: &dyn Backend) -> ClientResult<()> {
        match api::fetch_reference_set(backend) {
            Ok(refs) => {
                tracing::debug!(
                    records = refs.records.len(),
                    variant = ?self.variant,
                    "enrollment lists loaded"
                );
                self.apply(EnrollmentEvent::Loaded(refs));
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    ClientError::Auth(_) => e.user_message(),
                    _ => LOAD_FAILED.to_string(),
                };
                tracing::warn!(error = %e, "enrollment load failed");
                self.apply(EnrollmentEvent::LoadFailed(message));
                Err(e)
            }
        }
    }

    /// Copies a raw record into the form. `false` when the id is unknown.
    pub fn start_edit(&mut self, id: &str) -> bool {
        let Some(record) = self.refs.records.iter().find(|r| r.id == id) else {
            return false;
        };
        let (year, term) = split_for_form(&record.period);
        self.form = EnrollmentForm {
            student_id: record.student_id.clone(),
            subject_id: record.subject_id.clone(),
            teacher_id: record.teacher_id.clone(),
            year,
            term,
            grade: record.grade.to_string(),
        };
        self.editing = Some(id.to_string());
        self.phase = Phase::Editing;
        self.clear_messages();
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form = EnrollmentForm::default();
        self.editing = None;
        self.phase = Phase::Idle;
        self.field_error = None;
    }

    /// Validates, then POSTs (or PUTs when editing) and refetches
    /// everything. On any failure the form keeps what the user typed.
    pub fn submit(&mut self, backend: &dyn Backend, form: EnrollmentForm) -> ClientResult<()> {
        self.clear_messages();
        self.form = form;

        let payload = match self.form.to_payload() {
            Ok(p) => p,
            Err(e) => {
                self.field_error = FieldError::from_client(&e);
                self.phase = Phase::Editing;
                return Err(e);
            }
        };

        self.phase = Phase::Submitting;
        let result = match &self.editing {
            Some(id) => api::update(backend, Resource::Enrollments, id, &payload),
            None => api::create(backend, Resource::Enrollments, &payload),
        };
        match result {
            Ok(_) => {
                let notice = if self.editing.is_some() {
                    self.variant.updated_notice()
                } else {
                    self.variant.created_notice()
                };
                tracing::info!(editing = ?self.editing, period = %payload.period, "enrollment saved");
                self.editing = None;
                self.form = EnrollmentForm::default();
                self.phase = Phase::Idle;
                // A failed refetch is reported on the screen; the save stands.
                let _ = self.load(backend);
                self.notice = notice.map(|n| n.to_string());
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.phase = Phase::Editing;
                Err(e)
            }
        }
    }

    /// `false` when the id is not on screen.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if !self.refs.records.iter().any(|r| r.id == id) {
            return false;
        }
        self.phase = Phase::ConfirmingDelete { id: id.to_string() };
        true
    }

    pub fn cancel_delete(&mut self) {
        self.phase = Phase::settled(self.editing.is_some());
    }

    /// `None` when no delete is awaiting confirmation.
    pub fn confirm_delete(&mut self, backend: &dyn Backend) -> Option<ClientResult<()>> {
        let id = self.phase.pending_delete()?.to_string();
        self.phase = Phase::settled(self.editing.is_some());
        self.clear_messages();
        match api::delete(backend, Resource::Enrollments, &id) {
            Ok(()) => {
                tracing::info!(%id, "enrollment deleted");
                self.apply(EnrollmentEvent::Removed(id));
                self.notice = self.variant.deleted_notice().map(|n| n.to_string());
                Some(Ok(()))
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "enrollment delete failed");
                self.error = Some(DELETE_FAILED.to_string());
                Some(Err(e))
            }
        }
    }

    #[cfg(test)]
    pub fn views(&self) -> &[EnrollmentView] {
        &self.views
    }

    #[cfg(test)]
    pub fn form(&self) -> &EnrollmentForm {
        &self.form
    }

    #[cfg(test)]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn snapshot(&self) -> EnrollmentSnapshot<'_> {
        EnrollmentSnapshot {
            variant: self.variant,
            loaded: self.loaded,
            phase: &self.phase,
            rows: &self.views,
            form: &self.form,
            editing: self.editing.as_deref(),
            error: self.error.as_deref(),
            field_error: self.field_error.as_ref(),
            notice: self.notice.as_deref(),
            students: self
                .refs
                .students
                .iter()
                .map(|s| SelectOption {
                    id: s.id.clone(),
                    label: format!("{} {}", s.first_names, s.last_names),
                })
                .collect(),
            subjects: self
                .refs
                .subjects
                .iter()
                .map(|m| SelectOption {
                    id: m.id.clone(),
                    label: m.name.clone(),
                })
                .collect(),
            teachers: self
                .refs
                .teachers
                .iter()
                .map(|d| SelectOption {
                    id: d.id.clone(),
                    label: d.full_name(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::api::Verb;
    use serde_json::json;

    fn scripted() -> FakeBackend {
        let backend = FakeBackend::new();
        backend.respond(
            "/alumno-materias",
            json!([{ "id": "e1", "alumnoId": "s1", "materiaId": "m1", "docenteId": "d1", "ciclo": "2024-1", "notaFinal": 8.5 }]),
        );
        backend.respond("/alumnos", json!([{ "idAlumno": "s1", "nombres": "Ana", "apellidos": "Gómez" }]));
        backend.respond("/materias", json!([{ "idMateria": "m1", "nombreMateria": "Matemáticas" }]));
        backend.respond("/docentes", json!([{ "idDocente": "d1", "nombres": "Luis", "apellidos": "Pérez" }]));
        backend
    }

    fn filled(grade: &str) -> EnrollmentForm {
        EnrollmentForm {
            student_id: "s1".into(),
            subject_id: "m1".into(),
            teacher_id: "d1".into(),
            year: "2024".into(),
            term: "2".into(),
            grade: grade.into(),
        }
    }

    fn loaded(variant: Variant) -> (FakeBackend, EnrollmentScreen) {
        let backend = scripted();
        let mut screen = EnrollmentScreen::new(variant);
        screen.load(&backend).expect("load");
        (backend, screen)
    }

    #[test]
    fn load_resolves_rows() {
        let (_, screen) = loaded(Variant::Registry);
        let rows = screen.views();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_name, "Ana");
        assert_eq!(rows[0].subject_name, "Matemáticas");
        assert_eq!(rows[0].teacher_full_name, "Luis Pérez");
        assert_eq!(screen.phase(), &Phase::Idle);
    }

    #[test]
    fn failed_load_keeps_previous_rows() {
        let (backend, mut screen) = loaded(Variant::Registry);
        backend.fail("/materias", 500, None);
        assert!(screen.load(&backend).is_err());
        assert_eq!(screen.error(), Some(LOAD_FAILED));
        assert_eq!(screen.views().len(), 1);
    }

    #[test]
    fn out_of_range_grade_never_reaches_backend() {
        let (backend, mut screen) = loaded(Variant::Registry);
        let err = screen.submit(&backend, filled("11")).expect_err("invalid");
        assert_eq!(err, ClientError::validation("grade", "out_of_range"));
        assert!(backend.mutations().is_empty());
        assert_eq!(screen.form().grade, "11");
        assert_eq!(screen.phase(), &Phase::Editing);
        let snap = serde_json::to_value(screen.snapshot()).expect("snapshot");
        assert_eq!(snap["fieldError"]["message"], "La nota debe ser > 0 y ≤ 10");
    }

    #[test]
    fn missing_select_is_reported_before_grade() {
        let (backend, mut screen) = loaded(Variant::Registry);
        let mut form = filled("abc");
        form.teacher_id = "  ".into();
        let err = screen.submit(&backend, form).expect_err("invalid");
        assert_eq!(err, ClientError::validation("docenteId", "required"));
        assert!(backend.mutations().is_empty());
    }

    #[test]
    fn padded_form_values_submit_canonical_period() {
        let (backend, mut screen) = loaded(Variant::Registry);
        let mut form = filled(" 7 ");
        form.year = " 2024 ".into();
        form.term = "1 ".into();
        screen.submit(&backend, form).expect("saved");
        assert_eq!(backend.mutations()[0].body.as_ref().map(|b| b["ciclo"].clone()), Some(json!("2024-1")));
    }

    #[test]
    fn create_posts_payload_and_refetches() {
        let (backend, mut screen) = loaded(Variant::Grades);
        screen.submit(&backend, filled("9.5")).expect("saved");

        let posts = backend.mutations();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].verb, Verb::Post);
        assert_eq!(posts[0].path, "/alumno-materias");
        assert_eq!(
            posts[0].body,
            Some(json!({ "alumnoId": "s1", "materiaId": "m1", "docenteId": "d1", "ciclo": "2024-2", "notaFinal": 9.5 }))
        );
        // 4 initial lists + POST + 4 refetched lists.
        assert_eq!(backend.calls().len(), 9);
        assert_eq!(screen.form(), &EnrollmentForm::default());
        assert_eq!(screen.notice(), Some("Nota creada"));
    }

    #[test]
    fn edit_then_submit_puts_to_record() {
        let (backend, mut screen) = loaded(Variant::Grades);
        assert!(screen.start_edit("e1"));
        assert_eq!(screen.form().year, "2024");
        assert_eq!(screen.form().term, "1");
        assert_eq!(screen.form().grade, "8.5");

        let mut form = screen.form().clone();
        form.grade = "10".into();
        screen.submit(&backend, form).expect("saved");
        let puts = backend.mutations();
        assert_eq!(puts[0].verb, Verb::Put);
        assert_eq!(puts[0].path, "/alumno-materias/e1");
        assert_eq!(screen.notice(), Some("Nota actualizada"));
        assert_eq!(screen.phase(), &Phase::Idle);
    }

    #[test]
    fn backend_rejection_keeps_form_and_message() {
        let (backend, mut screen) = loaded(Variant::Registry);
        backend.fail(
            "/alumno-materias",
            409,
            Some("Ya existe una inscripción para este alumno, materia y ciclo"),
        );
        let err = screen.submit(&backend, filled("7")).expect_err("conflict");
        assert_eq!(err.status(), Some(409));
        assert_eq!(
            screen.error(),
            Some("Ya existe una inscripción para este alumno, materia y ciclo")
        );
        assert_eq!(screen.form(), &filled("7"));
        assert_eq!(screen.phase(), &Phase::Editing);
    }

    #[test]
    fn status_only_rejection_reports_status() {
        let (backend, mut screen) = loaded(Variant::Registry);
        backend.fail("/alumno-materias", 500, None);
        screen.submit(&backend, filled("7")).expect_err("server error");
        assert_eq!(screen.error(), Some("Error 500"));
    }

    #[test]
    fn confirmed_delete_removes_row_locally() {
        let (backend, mut screen) = loaded(Variant::Grades);
        assert!(screen.request_delete("e1"));
        assert_eq!(screen.phase(), &Phase::ConfirmingDelete { id: "e1".into() });

        screen.confirm_delete(&backend).expect("pending").expect("deleted");
        assert!(screen.views().is_empty());
        assert_eq!(screen.notice(), Some("Inscripción eliminada"));
        // No refetch after delete.
        assert_eq!(backend.calls().len(), 5);
    }

    #[test]
    fn failed_delete_leaves_list_unchanged() {
        let (backend, mut screen) = loaded(Variant::Registry);
        backend.fail("/alumno-materias/e1", 500, None);
        screen.request_delete("e1");
        assert!(screen.confirm_delete(&backend).expect("pending").is_err());
        assert_eq!(screen.views().len(), 1);
        assert_eq!(screen.error(), Some(DELETE_FAILED));
        assert_eq!(screen.phase(), &Phase::Idle);
    }

    #[test]
    fn cancel_and_unknown_ids() {
        let (backend, mut screen) = loaded(Variant::Registry);
        assert!(!screen.start_edit("nope"));
        assert!(!screen.request_delete("nope"));
        assert!(screen.confirm_delete(&backend).is_none());

        screen.request_delete("e1");
        screen.cancel_delete();
        assert_eq!(screen.phase(), &Phase::Idle);
        assert!(backend.mutations().is_empty());
    }
}
