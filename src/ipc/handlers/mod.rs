pub mod catalog;
pub mod core;
pub mod enrollments;
pub mod self_service;

use super::error::HandlerErr;
use super::types::{AppState, Session};
use crate::roles::{has_role, Role};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn require_session(state: &mut AppState) -> Result<&mut Session, HandlerErr> {
    state.session.as_mut().ok_or_else(|| {
        HandlerErr::new(
            "not_configured",
            "no session; call session.configure first",
        )
    })
}

/// Role gate run before any screen is touched.
fn require_role(state: &mut AppState, role: Role) -> Result<&mut Session, HandlerErr> {
    let session = require_session(state)?;
    if !has_role(&session.roles, role) {
        tracing::info!(role = role.as_claim(), "role check failed");
        return Err(HandlerErr::new(
            "forbidden",
            format!("requires role {}", role.as_claim()),
        ));
    }
    Ok(session)
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{key}")))
}

fn get_form<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, HandlerErr> {
    let Some(raw) = params.get("form") else {
        return Err(HandlerErr::bad_params("missing params.form"));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid params.form: {e}")))
}

fn to_result<T: Serialize>(value: T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value)
        .map_err(|e| HandlerErr::new("internal", format!("failed to encode result: {e}")))
}
