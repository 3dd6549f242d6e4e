use super::{require_session, to_result};
use crate::api::auth::StaticToken;
use crate::api::http::HttpBackend;
use crate::api::local::{Caller, LocalBackend};
use crate::api::Backend;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, BackendKind, Request, Session};
use crate::roles::{nav_items, permissions_from_claims, subject_from_claims, RoleSet};
use serde_json::json;

fn handle_health(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "configured": state.session.is_some(),
    }))
}

fn str_param<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

fn handle_session_configure(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = match req.params.get("backend") {
        None => BackendKind::Http,
        Some(v) => serde_json::from_value::<BackendKind>(v.clone()).map_err(|_| {
            HandlerErr::bad_params("params.backend must be \"http\" or \"local\"")
        })?,
    };
    let claims = req.params.get("claims").cloned().unwrap_or_else(|| json!({}));
    if !claims.is_object() {
        return Err(HandlerErr::bad_params("params.claims must be an object"));
    }

    let roles = RoleSet::from_claims(&claims);
    let subject = subject_from_claims(&claims);

    let backend: Box<dyn Backend> = match kind {
        BackendKind::Http => {
            let base_url = str_param(&req.params, "baseUrl")
                .unwrap_or(state.config.api_base_url.as_str());
            let token = str_param(&req.params, "accessToken")
                .map(|s| s.to_string())
                .or_else(|| state.config.access_token.clone());
            let backend = HttpBackend::new(
                base_url,
                state.config.http_timeout,
                Box::new(StaticToken::new(token)),
            )
            .map_err(|e| HandlerErr::new("backend_init_failed", format!("{e:#}")))?;
            Box::new(backend)
        }
        BackendKind::Local => {
            // Without any scope/permissions claim the local store does not
            // check authorities.
            let carries_perms = claims.get("scope").is_some() || claims.get("permissions").is_some();
            let caller = Caller {
                subject: subject.clone(),
                permissions: carries_perms.then(|| permissions_from_claims(&claims)),
            };
            let backend = LocalBackend::open(caller)
                .map_err(|e| HandlerErr::new("backend_init_failed", format!("{e:#}")))?;
            Box::new(backend)
        }
    };

    tracing::info!(backend = ?kind, roles = ?roles, "session configured");
    state.session = Some(Session::new(backend, kind, roles, subject));
    session_info(state)
}

fn session_info(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = require_session(state)?;
    to_result(json!({
        "backend": session.backend_kind,
        "roles": session.roles,
        "subject": session.subject,
    }))
}

fn handle_nav_items(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = require_session(state)?;
    let items: Vec<serde_json::Value> = nav_items(&session.roles)
        .iter()
        .map(|i| json!({ "path": i.path, "label": i.label }))
        .collect();
    Ok(json!({ "items": items }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "session.configure" => handle_session_configure(state, req),
        "session.info" => session_info(state),
        "nav.items" => handle_nav_items(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
