//! REST contract shared by the remote and in-memory backends.

pub mod auth;
pub mod http;
pub mod local;

#[cfg(test)]
pub mod fake;

use crate::error::{ClientError, ClientResult};
use crate::model::{EnrollmentRecord, Student, Subject, Teacher};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::thread;

pub const STUDENT_ME_PATH: &str = "/alumnos/me";
pub const REPORT_CARD_PATH: &str = "/alumno-materias/me/boleta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Students,
    Subjects,
    Teachers,
    Enrollments,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Students => "/alumnos",
            Resource::Subjects => "/materias",
            Resource::Teachers => "/docentes",
            Resource::Enrollments => "/alumno-materias",
        }
    }

    /// The id is percent-encoded as a single path segment.
    pub fn item_path(self, id: &str) -> String {
        format!("{}/{}", self.path(), urlencoding::encode(id))
    }
}

/// One request/response exchange with the backend. `Ok(Value::Null)` means
/// an empty 2xx body (e.g. 204 on delete).
pub trait Backend: Send + Sync {
    fn call(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value>;
}

fn decode<T: DeserializeOwned>(path: &str, value: serde_json::Value) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(path, error = %e, "unexpected response shape");
        ClientError::Transport {
            status: None,
            message: format!("Respuesta inválida de {path}"),
        }
    })
}

fn encode<P: Serialize>(payload: &P) -> ClientResult<serde_json::Value> {
    serde_json::to_value(payload).map_err(|e| ClientError::Transport {
        status: None,
        message: format!("no se pudo serializar la solicitud: {e}"),
    })
}

pub fn fetch<T: DeserializeOwned>(backend: &dyn Backend, path: &str) -> ClientResult<T> {
    let value = backend.call(Verb::Get, path, None)?;
    decode(path, value)
}

pub fn list<T: DeserializeOwned>(backend: &dyn Backend, resource: Resource) -> ClientResult<Vec<T>> {
    fetch(backend, resource.path())
}

pub fn create<P: Serialize>(
    backend: &dyn Backend,
    resource: Resource,
    payload: &P,
) -> ClientResult<serde_json::Value> {
    let body = encode(payload)?;
    backend.call(Verb::Post, resource.path(), Some(&body))
}

pub fn update<P: Serialize>(
    backend: &dyn Backend,
    resource: Resource,
    id: &str,
    payload: &P,
) -> ClientResult<serde_json::Value> {
    let body = encode(payload)?;
    backend.call(Verb::Put, &resource.item_path(id), Some(&body))
}

pub fn delete(backend: &dyn Backend, resource: Resource, id: &str) -> ClientResult<()> {
    backend.call(Verb::Delete, &resource.item_path(id), None)?;
    Ok(())
}

/// Raw enrollment rows plus the three lists they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    pub records: Vec<EnrollmentRecord>,
    pub students: Vec<Student>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
}

/// Issues the four list requests concurrently and returns only once all of
/// them have completed. Any failure fails the whole set.
pub fn fetch_reference_set(backend: &dyn Backend) -> ClientResult<ReferenceSet> {
    thread::scope(|s| {
        let records = s.spawn(|| list::<EnrollmentRecord>(backend, Resource::Enrollments));
        let students = s.spawn(|| list::<Student>(backend, Resource::Students));
        let subjects = s.spawn(|| list::<Subject>(backend, Resource::Subjects));
        let teachers = s.spawn(|| list::<Teacher>(backend, Resource::Teachers));

        let records = join(records);
        let students = join(students);
        let subjects = join(subjects);
        let teachers = join(teachers);

        Ok(ReferenceSet {
            records: records?,
            students: students?,
            subjects: subjects?,
            teachers: teachers?,
        })
    })
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, ClientResult<T>>) -> ClientResult<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(ClientError::unreachable("fetch worker panicked")))
}
