use super::{get_form, get_required_str, require_role, to_result};
use crate::api::Backend;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use crate::period::year_choices;
use crate::roles::Role;
use crate::screens::enrollments::{EnrollmentForm, Variant};
use chrono::Datelike;
use serde_json::json;

const ACTIONS: [&str; 9] = [
    "load",
    "snapshot",
    "edit",
    "cancelEdit",
    "submit",
    "delete.request",
    "delete.cancel",
    "delete.confirm",
    "years",
];

fn handle(
    state: &mut AppState,
    req: &Request,
    variant: Variant,
    action: &str,
) -> Result<serde_json::Value, HandlerErr> {
    let role = match variant {
        Variant::Registry => Role::Registrar,
        Variant::Grades => Role::Teacher,
    };
    let Session {
        backend,
        registry,
        grades,
        ..
    } = require_role(state, role)?;
    let backend: &dyn Backend = &**backend;
    let screen = match variant {
        Variant::Registry => registry,
        Variant::Grades => grades,
    };

    match action {
        "years" => {
            let years = year_choices(chrono::Local::now().year());
            return Ok(json!({ "years": years }));
        }
        "load" => {
            if let Err(e) = screen.load(backend) {
                return Err(HandlerErr::client(&e, screen.error()));
            }
        }
        "snapshot" => {}
        "edit" => {
            let id = get_required_str(&req.params, "id")?;
            if !screen.start_edit(&id) {
                return Err(HandlerErr::new("not_found", format!("no enrollment {id}")));
            }
        }
        "cancelEdit" => screen.cancel_edit(),
        "submit" => {
            let form: EnrollmentForm = get_form(&req.params)?;
            if let Err(e) = screen.submit(backend, form) {
                return Err(HandlerErr::client(&e, screen.error()));
            }
        }
        "delete.request" => {
            let id = get_required_str(&req.params, "id")?;
            if !screen.request_delete(&id) {
                return Err(HandlerErr::new("not_found", format!("no enrollment {id}")));
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

/// `enrollments.*` is the registry tab, `grades.*` the teacher's page.
pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (variant, action) = if let Some(a) = req.method.strip_prefix("enrollments.") {
        (Variant::Registry, a)
    } else if let Some(a) = req.method.strip_prefix("grades.") {
        (Variant::Grades, a)
    } else {
        return None;
    };
    if !ACTIONS.contains(&action) {
        return None;
    }
    Some(respond(&req.id, handle(state, req, variant, action)))
}
