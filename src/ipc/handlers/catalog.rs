use super::{get_form, get_required_str, require_role, to_result};
use crate::api::Backend;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use crate::roles::Role;
use crate::screens::catalog::{CatalogEntity, CatalogScreen};

fn handle_screen<E: CatalogEntity>(
    screen: &mut CatalogScreen<E>,
    backend: &dyn Backend,
    req: &Request,
    action: &str,
) -> Result<serde_json::Value, HandlerErr> {
    match action {
        "load" => {
            if let Err(e) = screen.load(backend) {
                return Err(HandlerErr::client(&e, screen.error()));
            }
        }
        "snapshot" => {}
        "edit" => {
            let id = get_required_str(&req.params, "id")?;
            if !screen.start_edit(&id) {
                return Err(HandlerErr::new("not_found", format!("no entry {id}")));
            }
        }
        "cancelEdit" => screen.cancel_edit(),
        "submit" => {
            let form: E::Form = get_form(&req.params)?;
            if let Err(e) = screen.submit(backend, form) {
                return Err(HandlerErr::client(&e, screen.error()));
            }
        }
        "delete.request" => {
            let id = get_required_str(&req.params, "id")?;
            if !screen.request_delete(&id) {
                return Err(HandlerErr::new("not_found", format!("no entry {id}")));
            }
        }
        "delete.cancel" => screen.cancel_delete(),
        "delete.confirm" => match screen.confirm_delete(backend) {
            None => {
                return Err(HandlerErr::new(
                    "no_pending_delete",
                    "no delete awaiting confirmation",
                ))
            }
            Some(Err(e)) => return Err(HandlerErr::client(&e, screen.error())),
            Some(Ok(())) => {}
        },
        _ => {
            return Err(HandlerErr::new(
                "not_implemented",
                format!("unknown method: {}", req.method),
            ))
        }
    }
    to_result(screen.snapshot())
}

#[derive(Clone, Copy)]
enum Catalog {
    Students,
    Subjects,
    Teachers,
}

const ACTIONS: [&str; 8] = [
    "load",
    "snapshot",
    "edit",
    "cancelEdit",
    "submit",
    "delete.request",
    "delete.cancel",
    "delete.confirm",
];

fn handle(
    state: &mut AppState,
    req: &Request,
    catalog: Catalog,
    action: &str,
) -> Result<serde_json::Value, HandlerErr> {
    let Session {
        backend,
        students,
        subjects,
        teachers,
        ..
    } = require_role(state, Role::Registrar)?;
    let backend: &dyn Backend = &**backend;
    match catalog {
        Catalog::Students => handle_screen(students, backend, req, action),
        Catalog::Subjects => handle_screen(subjects, backend, req, action),
        Catalog::Teachers => handle_screen(teachers, backend, req, action),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (prefix, rest) = req.method.split_once('.')?;
    let catalog = match prefix {
        "students" => Catalog::Students,
        "subjects" => Catalog::Subjects,
        "teachers" => Catalog::Teachers,
        _ => return None,
    };
    if !ACTIONS.contains(&rest) {
        return None;
    }
    Some(respond(&req.id, handle(state, req, catalog, rest)))
}
