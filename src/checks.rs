use std::{fmt, sync::Arc};

use crate::{action::Action, request::PermissionRequest};

/// Whether a check applies to the model type as a whole or to one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Global,
    Object,
}

impl Role {
    /// Conventional method name for a check, used in errors and logs.
    ///
    /// `Global` gives `has_{action}_permission`, `Object` gives
    /// `has_object_{action}_permission`.
    pub fn method_name(self, action: &Action) -> String {
        match self {
            Self::Global => format!("has_{action}_permission"),
            Self::Object => format!("has_object_{action}_permission"),
        }
    }
}

/// Instance-independent check, evaluated without a target object.
#[derive(Clone)]
pub struct GlobalCheck(Arc<dyn Fn(&PermissionRequest) -> bool + Send + Sync>);

impl GlobalCheck {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&PermissionRequest) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn call(&self, request: &PermissionRequest) -> bool {
        (self.0)(request)
    }
}

impl fmt::Debug for GlobalCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GlobalCheck")
    }
}

/// Check evaluated against one instance of `M`.
pub struct ObjectCheck<M>(Arc<dyn Fn(&M, &PermissionRequest) -> bool + Send + Sync>);

impl<M> ObjectCheck<M> {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&M, &PermissionRequest) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn call(&self, object: &M, request: &PermissionRequest) -> bool {
        (self.0)(object, request)
    }
}

impl<M> Clone for ObjectCheck<M> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<M> fmt::Debug for ObjectCheck<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectCheck")
    }
}

/// A permission check that can be wrapped by a request guard.
///
/// The guard sees the request before the check does. Returning `Some(result)`
/// decides the outcome without calling the check; `None` hands over to it.
pub trait Check: Sized {
    fn guarded<G>(self, guard: G) -> Self
    where
        G: Fn(&PermissionRequest) -> Option<bool> + Send + Sync + 'static;
}

impl Check for GlobalCheck {
    fn guarded<G>(self, guard: G) -> Self
    where
        G: Fn(&PermissionRequest) -> Option<bool> + Send + Sync + 'static,
    {
        Self::new(move |request| guard(request).unwrap_or_else(|| self.call(request)))
    }
}

impl<M: 'static> Check for ObjectCheck<M> {
    fn guarded<G>(self, guard: G) -> Self
    where
        G: Fn(&PermissionRequest) -> Option<bool> + Send + Sync + 'static,
    {
        Self::new(move |object, request| {
            guard(request).unwrap_or_else(|| self.call(object, request))
        })
    }
}
