use serde_json::json;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failure of a single user action. Nothing is retried; the caller decides
/// where the message is shown.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Detected before any request is built; never reaches the backend.
    #[error("invalid {field}: {code}")]
    Validation {
        field: &'static str,
        code: &'static str,
    },
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },
    #[error("access token unavailable: {0}")]
    Auth(String),
}

fn status_fallback(status: u16) -> String {
    format!("Error {status}")
}

impl ClientError {
    pub fn validation(field: &'static str, code: &'static str) -> Self {
        ClientError::Validation { field, code }
    }

    /// Builds a transport error from a non-2xx response body. The backend's
    /// `message` wins when it is a string; otherwise the status is reported.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(|s| s.to_string())
            })
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| status_fallback(status));
        ClientError::Transport {
            status: Some(status),
            message,
        }
    }

    pub fn unreachable(detail: impl std::fmt::Display) -> Self {
        tracing::warn!(%detail, "backend unreachable");
        ClientError::Transport {
            status: None,
            message: "Error inesperado".to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Validation { .. } => "validation_error",
            ClientError::Transport { .. } => "transport_error",
            ClientError::Auth(_) => "auth_error",
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Text shown next to the field or at the top of the page.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation { field, code } => match (*field, *code) {
                ("grade", _) => "La nota debe ser > 0 y ≤ 10".to_string(),
                (_, "required") => format!("El campo '{field}' es obligatorio"),
                (_, "invalid_date") => format!("El campo '{field}' debe ser una fecha AAAA-MM-DD"),
                ("year", _) => "El año debe tener 4 dígitos".to_string(),
                ("term", _) => "El semestre debe ser 1 o 2".to_string(),
                _ => format!("Valor inválido en '{field}'"),
            },
            ClientError::Transport { message, .. } => message.clone(),
            ClientError::Auth(detail) => {
                format!("No se pudo obtener el token de acceso: {detail}")
            }
        }
    }

    /// Like [`user_message`](Self::user_message), but a transport failure
    /// without a backend message names the action, e.g.
    /// `"Error 500 al guardar el alumno."`.
    pub fn message_for(&self, action: &str) -> String {
        match self {
            ClientError::Transport {
                status: Some(s),
                message,
            } if *message == status_fallback(*s) => format!("Error {s} {action}."),
            ClientError::Transport { status: None, .. } => {
                format!("Error inesperado {action}.")
            }
            _ => self.user_message(),
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            ClientError::Validation { field, code } => json!({ "field": field, "code": code }),
            ClientError::Transport { status, .. } => json!({ "status": status }),
            ClientError::Auth(_) => json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_preferred() {
        let e = ClientError::from_error_body(
            409,
            r#"{"status":409,"error":"Conflict","message":"Ya existe una inscripción"}"#,
        );
        assert_eq!(e.user_message(), "Ya existe una inscripción");
        assert_eq!(e.status(), Some(409));
    }

    #[test]
    fn missing_or_non_string_message_falls_back_to_status() {
        assert_eq!(
            ClientError::from_error_body(500, "").user_message(),
            "Error 500"
        );
        assert_eq!(
            ClientError::from_error_body(422, r#"{"message": 12}"#).user_message(),
            "Error 422"
        );
    }

    #[test]
    fn action_fallback_only_without_backend_message() {
        let bare = ClientError::from_error_body(500, "");
        assert_eq!(
            bare.message_for("al guardar el alumno"),
            "Error 500 al guardar el alumno."
        );
        let told = ClientError::from_error_body(409, r#"{"message":"Duplicado"}"#);
        assert_eq!(told.message_for("al guardar el alumno"), "Duplicado");
        let down = ClientError::Transport {
            status: None,
            message: "Error inesperado".into(),
        };
        assert_eq!(
            down.message_for("al guardar la materia"),
            "Error inesperado al guardar la materia."
        );
    }

    #[test]
    fn validation_details_name_the_field() {
        let e = ClientError::validation("grade", "out_of_range");
        assert_eq!(e.code(), "validation_error");
        assert_eq!(e.details()["field"], "grade");
        assert_eq!(e.details()["code"], "out_of_range");
    }
}
