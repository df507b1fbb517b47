use std::collections::HashMap;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use crate::action::Action;

/// Default route parameter identifying a single resource.
pub const DEFAULT_LOOKUP_FIELD: &str = "id";

/// Extension key for setting the action of a route.
///
/// Routes for custom actions insert this so the gate and the filter router
/// see the custom name instead of the one derived from the HTTP method.
#[derive(Debug, Clone)]
pub struct ActionExt(pub Action);

/// Helper for building the extension carrying a route's action.
///
/// The extension has to be in place before the permission middleware runs,
/// so it goes outside of it:
///
/// ```rust,ignore
/// Router::new().route(
///     "/posts/{id}/publish",
///     post(publish)
///         .layer(from_fn_with_state(layer, permission_middleware::<Post>))
///         .layer(Extension(with_action("publish"))),
/// )
/// ```
pub fn with_action(action: impl Into<Action>) -> ActionExt {
    ActionExt(action.into())
}

/// What the permission layer knows about the view handling a request.
///
/// Built by the permission middleware and stored in the request extensions,
/// so handlers can extract it and hand it back to a gate or a filter router.
#[derive(Debug, Clone)]
pub struct ViewContext {
    name: String,
    action: Option<Action>,
    lookup_field: String,
    kwargs: HashMap<String, String>,
}

impl ViewContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: None,
            lookup_field: DEFAULT_LOOKUP_FIELD.to_string(),
            kwargs: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.action = Some(action.into());
        self
    }

    #[must_use]
    pub fn with_lookup_field(mut self, lookup_field: impl Into<String>) -> Self {
        self.lookup_field = lookup_field.into();
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_kwargs(mut self, kwargs: HashMap<String, String>) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn lookup_field(&self) -> &str {
        &self.lookup_field
    }

    pub fn kwargs(&self) -> &HashMap<String, String> {
        &self.kwargs
    }

    /// Whether the request targets a single resource (the lookup parameter is present).
    pub fn is_detail(&self) -> bool {
        self.kwargs.contains_key(&self.lookup_field)
    }
}

/// Rejection when a handler asks for a [`ViewContext`] outside the permission middleware.
#[derive(Debug)]
pub struct MissingViewContext;

impl IntoResponse for MissingViewContext {
    fn into_response(self) -> Response {
        tracing::error!("ViewContext requested but the permission middleware did not run");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = MissingViewContext;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ViewContext>()
            .cloned()
            .ok_or(MissingViewContext)
    }
}
