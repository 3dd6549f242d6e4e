//! Students, subjects and teachers: one list-plus-form controller,
//! parameterised by the entity.

use super::{FieldError, Phase};
use crate::api::{self, Backend, Resource};
use crate::error::ClientResult;
use crate::model::{Student, StudentPayload, Subject, SubjectPayload, Teacher, TeacherPayload};
use crate::validate::{required, required_date};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

pub trait CatalogEntity: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Form contents, sent as-is (after trimming) as the request body.
    type Form: Clone + fmt::Debug + Default + PartialEq + Serialize + DeserializeOwned;

    const RESOURCE: Resource;
    /// Object of the Spanish messages, e.g. "el alumno".
    const SINGULAR: &'static str;
    const PLURAL: &'static str;

    fn id(&self) -> &str;
    fn to_form(&self) -> Self::Form;
    fn validate(form: &Self::Form) -> ClientResult<Self::Form>;
}

impl CatalogEntity for Student {
    type Form = StudentPayload;

    const RESOURCE: Resource = Resource::Students;
    const SINGULAR: &'static str = "el alumno";
    const PLURAL: &'static str = "los alumnos";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_form(&self) -> StudentPayload {
        StudentPayload::from(self)
    }

    fn validate(form: &StudentPayload) -> ClientResult<StudentPayload> {
        Ok(StudentPayload {
            first_names: required("nombres", &form.first_names)?,
            last_names: required("apellidos", &form.last_names)?,
            enrollment_date: required_date("fechaIngreso", &form.enrollment_date)?,
            address: form.address.trim().to_string(),
            phone: form.phone.trim().to_string(),
        })
    }
}

impl CatalogEntity for Subject {
    type Form = SubjectPayload;

    const RESOURCE: Resource = Resource::Subjects;
    const SINGULAR: &'static str = "la materia";
    const PLURAL: &'static str = "las materias";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_form(&self) -> SubjectPayload {
        SubjectPayload {
            name: self.name.clone(),
        }
    }

    fn validate(form: &SubjectPayload) -> ClientResult<SubjectPayload> {
        Ok(SubjectPayload {
            name: required("nombreMateria", &form.name)?,
        })
    }
}

impl CatalogEntity for Teacher {
    type Form = TeacherPayload;

    const RESOURCE: Resource = Resource::Teachers;
    const SINGULAR: &'static str = "el docente";
    const PLURAL: &'static str = "los docentes";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_form(&self) -> TeacherPayload {
        TeacherPayload {
            first_names: self.first_names.clone(),
            last_names: self.last_names.clone(),
            hire_date: self.hire_date.clone(),
        }
    }

    fn validate(form: &TeacherPayload) -> ClientResult<TeacherPayload> {
        Ok(TeacherPayload {
            first_names: required("nombres", &form.first_names)?,
            last_names: required("apellidos", &form.last_names)?,
            hire_date: required_date("fechaIngreso", &form.hire_date)?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum CatalogEvent<E> {
    Loaded(Vec<E>),
    LoadFailed(String),
    Removed(String),
}

#[derive(Debug, Clone)]
pub struct CatalogScreen<E: CatalogEntity> {
    items: Vec<E>,
    form: E::Form,
    editing: Option<String>,
    phase: Phase,
    error: Option<String>,
    field_error: Option<FieldError>,
    loaded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot<'a, E: CatalogEntity> {
    pub loaded: bool,
    pub phase: &'a Phase,
    pub items: &'a [E],
    pub form: &'a E::Form,
    pub editing: Option<&'a str>,
    pub error: Option<&'a str>,
    pub field_error: Option<&'a FieldError>,
}

impl<E: CatalogEntity> Default for CatalogScreen<E> {
    fn default() -> Self {
        CatalogScreen {
            items: Vec::new(),
            form: E::Form::default(),
            editing: None,
            phase: Phase::Idle,
            error: None,
            field_error: None,
            loaded: false,
        }
    }
}

impl<E: CatalogEntity> CatalogScreen<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: CatalogEvent<E>) {
        match event {
            CatalogEvent::Loaded(items) => {
                self.items = items.into_iter().filter(|e| !e.id().is_empty()).collect();
                self.loaded = true;
                self.error = None;
            }
            CatalogEvent::LoadFailed(message) => {
                self.loaded = true;
                self.error = Some(message);
            }
            CatalogEvent::Removed(id) => self.items.retain(|e| e.id() != id),
        }
    }

    pub fn load(&mut self, backend: &dyn Backend) -> ClientResult<()> {
        match api::list::<E>(backend, E::RESOURCE) {
            Ok(items) => {
                self.apply(CatalogEvent::Loaded(items));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(resource = E::RESOURCE.path(), error = %e, "catalog load failed");
                self.apply(CatalogEvent::LoadFailed(format!(
                    "No se pudieron cargar {}.",
                    E::PLURAL
                )));
                Err(e)
            }
        }
    }

    pub fn start_edit(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter().find(|e| e.id() == id) else {
            return false;
        };
        self.form = item.to_form();
        self.editing = Some(id.to_string());
        self.phase = Phase::Editing;
        self.error = None;
        self.field_error = None;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form = E::Form::default();
        self.editing = None;
        self.phase = Phase::Idle;
        self.field_error = None;
    }

    pub fn submit(&mut self, backend: &dyn Backend, form: E::Form) -> ClientResult<()> {
        self.error = None;
        self.field_error = None;
        self.form = form;

        let payload = match E::validate(&self.form) {
            Ok(p) => p,
            Err(e) => {
                self.field_error = FieldError::from_client(&e);
                self.phase = Phase::Editing;
                return Err(e);
            }
        };

        self.phase = Phase::Submitting;
        let result = match &self.editing {
            Some(id) => api::update(backend, E::RESOURCE, id, &payload),
            None => api::create(backend, E::RESOURCE, &payload),
        };
        match result {
            Ok(_) => {
                tracing::info!(resource = E::RESOURCE.path(), editing = ?self.editing, "catalog entry saved");
                let _ = self.load(backend);
                self.editing = None;
                self.form = E::Form::default();
                self.phase = Phase::Idle;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.message_for(&format!("al guardar {}", E::SINGULAR)));
                self.phase = Phase::Editing;
                Err(e)
            }
        }
    }

    pub fn request_delete(&mut self, id: &str) -> bool {
        if !self.items.iter().any(|e| e.id() == id) {
            return false;
        }
        self.phase = Phase::ConfirmingDelete { id: id.to_string() };
        true
    }

    pub fn cancel_delete(&mut self) {
        self.phase = Phase::settled(self.editing.is_some());
    }

    pub fn confirm_delete(&mut self, backend: &dyn Backend) -> Option<ClientResult<()>> {
        let id = self.phase.pending_delete()?.to_string();
        self.phase = Phase::settled(self.editing.is_some());
        self.error = None;
        match api::delete(backend, E::RESOURCE, &id) {
            Ok(()) => {
                self.apply(CatalogEvent::Removed(id));
                Some(Ok(()))
            }
            Err(e) => {
                tracing::warn!(resource = E::RESOURCE.path(), %id, error = %e, "catalog delete failed");
                self.error = Some(format!("No se pudo eliminar {}.", E::SINGULAR));
                Some(Err(e))
            }
        }
    }

    #[cfg(test)]
    pub fn items(&self) -> &[E] {
        &self.items
    }

    #[cfg(test)]
    pub fn form(&self) -> &E::Form {
        &self.form
    }

    #[cfg(test)]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> CatalogSnapshot<'_, E> {
        CatalogSnapshot {
            loaded: self.loaded,
            phase: &self.phase,
            items: &self.items,
            form: &self.form,
            editing: self.editing.as_deref(),
            error: self.error.as_deref(),
            field_error: self.field_error.as_ref(),
        }
    }
}
