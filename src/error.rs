use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// A misconfigured model, field or filter.
///
/// These are programming errors: they surface during development and are
/// never recovered from. A check that merely says "no" is not an error,
/// it is `Ok(false)`.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("no model is configured for '{view}'")]
    MissingModel { view: String },

    #[error("{}", missing_check_message(.model, .method, .action_method.as_deref()))]
    MissingCheck {
        model: String,
        method: String,
        action_method: Option<String>,
    },

    #[error("permissions field '{field}' is used without a model")]
    FieldWithoutModel { field: String },

    #[error("both global_only and object_only cannot be set on a permissions field")]
    ConflictingFieldModes,

    #[error("invalid permissions field configuration: {0}")]
    InvalidFieldConfig(#[from] ValidationErrors),

    #[error("a list filter must be registered for '{view}'")]
    MissingListFilter { view: String },

    #[error("no filter is registered for action '{action}' (filter_{action}_queryset)")]
    MissingActionFilter { action: String },

    #[error("action routing is enabled but '{view}' did not resolve an action")]
    MissingAction { view: String },
}

fn missing_check_message(model: &str, method: &str, action_method: Option<&str>) -> String {
    match action_method {
        Some(action_method) => {
            format!("'{model}' does not have '{method}' or '{action_method}' defined.")
        }
        None => format!("'{model}' does not have '{method}' defined."),
    }
}

/// Outcome of a failed authorization step inside a request handler.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Forbidden")]
    Forbidden,
    #[error(transparent)]
    Misconfigured(#[from] PermissionError),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            Self::Misconfigured(err) => {
                error!(error = %err, "Permission configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_check_message_names_both_methods() {
        let err = PermissionError::MissingCheck {
            model: "Post".to_string(),
            method: "has_read_permission".to_string(),
            action_method: Some("has_retrieve_permission".to_string()),
        };

        assert_eq!(
            err.to_string(),
            "'Post' does not have 'has_read_permission' or 'has_retrieve_permission' defined."
        );
    }

    #[test]
    fn test_missing_check_message_without_action() {
        let err = PermissionError::MissingCheck {
            model: "Post".to_string(),
            method: "has_object_write_permission".to_string(),
            action_method: None,
        };

        assert_eq!(
            err.to_string(),
            "'Post' does not have 'has_object_write_permission' defined."
        );
    }

    #[test]
    fn test_access_error_status_codes() {
        assert_eq!(
            AccessError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AccessError::from(PermissionError::ConflictingFieldModes)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
