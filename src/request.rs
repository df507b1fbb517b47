use std::{any::Any, convert::Infallible, fmt, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Method},
};

/// The authenticated (or anonymous) party behind a request.
///
/// Authentication is the host application's job: its auth layer resolves
/// the user and inserts a [`CurrentPrincipal`] into the request extensions.
/// Permission checks only look at the flags below, or downcast to the
/// concrete user type with [`PermissionRequest::principal`].
pub trait Principal: Any + Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn is_staff(&self) -> bool {
        false
    }

    fn is_superuser(&self) -> bool {
        false
    }
}

/// Principal used for requests that carry no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousUser;

impl Principal for AnonymousUser {
    fn is_authenticated(&self) -> bool {
        false
    }
}

/// Request extension holding the principal resolved by the host's auth layer.
#[derive(Clone)]
pub struct CurrentPrincipal(pub Arc<dyn Principal>);

impl CurrentPrincipal {
    pub fn new<P: Principal>(principal: P) -> Self {
        Self(Arc::new(principal))
    }
}

impl fmt::Debug for CurrentPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentPrincipal")
            .field("is_authenticated", &self.0.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// The part of an HTTP request permission checks get to see.
///
/// Extract it in a handler to pass it on to a gate, a field or a filter
/// router:
///
/// ```rust,ignore
/// pub async fn show(request: PermissionRequest, view: ViewContext) -> RequestResult {
///     let post = load_post().await?;
///     authorize_object!(gate, &request, &view, &post);
///     Ok(Json(post))
/// }
/// ```
#[derive(Clone)]
pub struct PermissionRequest {
    method: Method,
    user: Option<Arc<dyn Principal>>,
}

impl PermissionRequest {
    pub fn new(method: Method) -> Self {
        Self { method, user: None }
    }

    #[must_use]
    pub fn with_user<P: Principal>(mut self, user: P) -> Self {
        self.user = Some(Arc::new(user));
        self
    }

    #[must_use]
    pub fn with_shared_user(mut self, user: Arc<dyn Principal>) -> Self {
        self.user = Some(user);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn user(&self) -> Option<&dyn Principal> {
        self.user.as_deref()
    }

    /// Get the principal as its concrete type.
    ///
    /// Returns `None` when there is no principal or it is of another type.
    pub fn principal<U: Principal>(&self) -> Option<&U> {
        let user: &dyn Any = self.user.as_deref()?;
        user.downcast_ref::<U>()
    }

    /// Whether the method is read-only (`GET`, `HEAD` or `OPTIONS`).
    pub fn is_safe(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some_and(|user| user.is_authenticated())
    }

    pub fn is_staff_or_superuser(&self) -> bool {
        self.user()
            .is_some_and(|user| user.is_staff() || user.is_superuser())
    }
}

impl fmt::Debug for PermissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionRequest")
            .field("method", &self.method)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl From<&Parts> for PermissionRequest {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            user: parts
                .extensions
                .get::<CurrentPrincipal>()
                .map(|principal| principal.0.clone()),
        }
    }
}

impl<S> FromRequestParts<S> for PermissionRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from(&*parts))
    }
}
