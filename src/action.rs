use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Identifies the operation a request performs on a resource.
///
/// Actions name the permission checks a model registers: the `retrieve`
/// action resolves `has_retrieve_permission` and
/// `has_object_retrieve_permission`. Custom actions are any other name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub String);

impl Action {
    pub const LIST: &'static str = "list";
    pub const CREATE: &'static str = "create";
    pub const RETRIEVE: &'static str = "retrieve";
    pub const UPDATE: &'static str = "update";
    pub const PARTIAL_UPDATE: &'static str = "partial_update";
    pub const DESTROY: &'static str = "destroy";
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";

    /// Create a new action identifier
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// Get the action name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collapse `partial_update` into `update` when `partial_update_is_update` is set.
    #[must_use]
    pub fn normalize(&self, partial_update_is_update: bool) -> Self {
        if partial_update_is_update && self.0 == Self::PARTIAL_UPDATE {
            Self::new(Self::UPDATE)
        } else {
            self.clone()
        }
    }

    /// Default action for a route, following the usual REST resource layout.
    ///
    /// Collection routes map `GET` to `list` and `POST` to `create`. Detail
    /// routes (those carrying a lookup parameter) map `GET` to `retrieve`,
    /// `PUT` to `update`, `PATCH` to `partial_update` and `DELETE` to
    /// `destroy`. Anything else has no default action.
    pub fn for_route(method: &Method, is_detail: bool) -> Option<Self> {
        let name = match (is_detail, method) {
            (false, &Method::GET | &Method::HEAD) => Self::LIST,
            (false, &Method::POST) => Self::CREATE,
            (true, &Method::GET | &Method::HEAD) => Self::RETRIEVE,
            (true, &Method::PUT) => Self::UPDATE,
            (true, &Method::PATCH) => Self::PARTIAL_UPDATE,
            (true, &Method::DELETE) => Self::DESTROY,
            _ => return None,
        };

        Some(Self::new(name))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Action {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Action {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
