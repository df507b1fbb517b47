//! Prelude for permission checks.
//!
//! Import this module to bring the common permission types and macros into scope.
//!
//! # Example
//! ```rust,ignore
//! use drygate::prelude::*;
//!
//! pub async fn show(
//!     State(state): State<AppState>,
//!     request: PermissionRequest,
//!     view: ViewContext,
//! ) -> Result<Json<Post>, AccessError> {
//!     let post = state.posts.find(&view)?;
//!     authorize_object!(state.gate, &request, &view, &post);
//!     Ok(Json(post))
//! }
//! ```

// Re-export model declaration types
pub use crate::{
    action::Action,
    checks::{GlobalCheck, ObjectCheck},
    table::{PermissionModel, PermissionTable, Registered},
};

// Re-export request context
pub use crate::{
    request::{CurrentPrincipal, PermissionRequest, Principal},
    view::{with_action, ViewContext},
};

// Re-export resolvers
pub use crate::{
    field::{FieldConfig, PermissionResult, PermissionsField},
    filter::{FilterConfig, FilterRouter},
    gate::{
        middleware::{permission_middleware, GateLayer},
        GateConfig, PermissionGate,
    },
};

// Re-export decorators
pub use crate::decorators::{allow_staff_or_superuser, authenticated_users, unauthenticated_users};

pub use crate::error::{AccessError, PermissionError};

// Re-export authorization macros
pub use crate::{authorize, authorize_object};
