//! Screen controllers. Each screen owns an explicit state struct; fetch
//! completion and optimistic removal go through its `apply` reducer.

pub mod catalog;
pub mod enrollments;
pub mod self_service;

use crate::error::ClientError;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Editing,
    Submitting,
    ConfirmingDelete {
        id: String,
    },
}

impl Phase {
    /// Where a screen rests once nothing is in flight.
    pub fn settled(editing: bool) -> Phase {
        if editing {
            Phase::Editing
        } else {
            Phase::Idle
        }
    }

    pub fn pending_delete(&self) -> Option<&str> {
        match self {
            Phase::ConfirmingDelete { id } => Some(id),
            _ => None,
        }
    }
}

/// Inline message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn from_client(e: &ClientError) -> Option<FieldError> {
        match e {
            ClientError::Validation { field, code } => Some(FieldError {
                field: *field,
                code: *code,
                message: e.user_message(),
            }),
            _ => None,
        }
    }
}

/// `{id, label}` pair for a form select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
}
