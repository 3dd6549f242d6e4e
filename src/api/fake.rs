use super::{Backend, Verb};
use crate::error::{ClientError, ClientResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub verb: Verb,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

enum Scripted {
    Body(serde_json::Value),
    Status(u16, Option<String>),
}

/// Scripted backend for unit tests. GET on an unscripted path is a 404;
/// other verbs succeed with an empty body unless a failure is scripted.
#[derive(Default)]
pub struct FakeBackend {
    gets: Mutex<HashMap<String, Scripted>>,
    failures: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, body: serde_json::Value) {
        self.gets
            .lock()
            .expect("lock")
            .insert(path.to_string(), Scripted::Body(body));
    }

    pub fn fail(&self, path: &str, status: u16, message: Option<&str>) {
        self.failures.lock().expect("lock").insert(
            path.to_string(),
            Scripted::Status(status, message.map(|m| m.to_string())),
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.verb != Verb::Get)
            .collect()
    }
}

fn scripted(s: &Scripted) -> ClientResult<serde_json::Value> {
    match s {
        Scripted::Body(v) => Ok(v.clone()),
        Scripted::Status(status, message) => {
            let body = match message {
                Some(m) => json!({ "status": status, "message": m }).to_string(),
                None => String::new(),
            };
            Err(ClientError::from_error_body(*status, &body))
        }
    }
}

impl Backend for FakeBackend {
    fn call(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        self.calls.lock().expect("lock").push(Call {
            verb,
            path: path.to_string(),
            body: body.cloned(),
        });
        if let Some(f) = self.failures.lock().expect("lock").get(path) {
            return scripted(f);
        }
        match verb {
            Verb::Get => match self.gets.lock().expect("lock").get(path) {
                Some(s) => scripted(s),
                None => Err(ClientError::from_error_body(404, "")),
            },
            _ => Ok(serde_json::Value::Null),
        }
    }
}
