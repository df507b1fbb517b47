use axum::{
    extract::{rejection::RawPathParamsRejection, RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use super::PermissionGate;
use crate::{
    action::Action,
    error::AccessError,
    request::PermissionRequest,
    view::{ActionExt, ViewContext, DEFAULT_LOOKUP_FIELD},
};

/// State for [`permission_middleware`]: the gate plus what it needs to know about the view.
pub struct GateLayer<M> {
    gate: PermissionGate<M>,
    view_name: String,
    lookup_field: String,
}

impl<M> Clone for GateLayer<M> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            view_name: self.view_name.clone(),
            lookup_field: self.lookup_field.clone(),
        }
    }
}

impl<M> GateLayer<M> {
    pub fn new(gate: PermissionGate<M>, view_name: impl Into<String>) -> Self {
        Self {
            gate,
            view_name: view_name.into(),
            lookup_field: DEFAULT_LOOKUP_FIELD.to_string(),
        }
    }

    #[must_use]
    pub fn with_lookup_field(mut self, lookup_field: impl Into<String>) -> Self {
        self.lookup_field = lookup_field.into();
        self
    }

    pub fn gate(&self) -> &PermissionGate<M> {
        &self.gate
    }

    /// Describe the view handling `req`.
    ///
    /// The action comes from an [`ActionExt`] when the route set one,
    /// otherwise it is derived from the HTTP method and whether the lookup
    /// parameter is present.
    fn view_context(&self, req: &Request, params: Option<&RawPathParams>) -> ViewContext {
        let kwargs = params
            .map(|params| {
                params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let view = ViewContext::new(self.view_name.clone())
            .with_lookup_field(self.lookup_field.clone())
            .with_kwargs(kwargs);

        let action = req
            .extensions()
            .get::<ActionExt>()
            .map(|ext| ext.0.clone())
            .or_else(|| Action::for_route(req.method(), view.is_detail()));

        match action {
            Some(action) => view.with_action(action),
            None => view,
        }
    }
}

/// Middleware function that enforces the global checks of a gate.
///
/// Builds the [`ViewContext`] for the request, stores it in the request
/// extensions for handlers (which run the object checks once they have
/// loaded the object), and answers 403 Forbidden when the global checks
/// deny the request. A misconfigured model is answered with 500.
///
/// ```rust,ignore
/// let layer = GateLayer::new(PermissionGate::new(GateConfig::default(), Registered::<Post>::new()), "PostView");
///
/// Router::new()
///     .route("/posts", get(list).post(create))
///     .route("/posts/{id}", get(show))
///     .route_layer(axum::middleware::from_fn_with_state(layer, permission_middleware::<Post>))
/// ```
#[instrument(skip_all, fields(view, action))]
pub async fn permission_middleware<M>(
    State(layer): State<GateLayer<M>>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    mut req: Request,
    next: Next,
) -> Response
where
    M: 'static,
{
    let view = layer.view_context(&req, params.as_ref().ok());

    tracing::Span::current().record("view", view.name());
    if let Some(action) = view.action() {
        tracing::Span::current().record("action", action.as_str());
    }

    let (parts, body) = req.into_parts();
    let request = PermissionRequest::from(&parts);
    req = Request::from_parts(parts, body);

    match layer.gate.has_permission(&request, &view) {
        Ok(true) => {
            req.extensions_mut().insert(view);
            next.run(req).await
        }
        Ok(false) => {
            debug!("Global permission denied, returning 403");
            AccessError::Forbidden.into_response()
        }
        Err(err) => AccessError::from(err).into_response(),
    }
}
