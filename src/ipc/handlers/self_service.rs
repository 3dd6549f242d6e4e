use super::{get_required_str, require_role, to_result};
use crate::api::Backend;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use crate::roles::Role;

fn handle_report_card_load(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let Session {
        backend,
        report_card,
        ..
    } = require_role(state, Role::Student)?;
    if let Err(e) = report_card.load(&**backend) {
        return Err(HandlerErr::client(&e, report_card.snapshot().error));
    }
    to_result(report_card.snapshot())
}

fn handle_profile_load(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let Session {
        backend, profile, ..
    } = require_role(state, Role::Student)?;
    if let Err(e) = profile.load(&**backend) {
        return Err(HandlerErr::client(&e, profile.snapshot().error));
    }
    to_result(profile.snapshot())
}

fn handle_profile_save(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let address = get_required_str(&req.params, "direccion")?;
    let phone = get_required_str(&req.params, "telefono")?;
    let Session {
        backend, profile, ..
    } = require_role(state, Role::Student)?;
    let backend: &dyn Backend = &**backend;
    match profile.save(backend, &address, &phone) {
        None => Err(HandlerErr::new(
            "not_found",
            "profile not loaded; call profile.load first",
        )),
        Some(Err(e)) => Err(HandlerErr::client(&e, profile.snapshot().error)),
        Some(Ok(())) => to_result(profile.snapshot()),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reportCard.load" => handle_report_card_load(state, req),
        "profile.load" => handle_profile_load(state, req),
        "profile.save" => handle_profile_save(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
