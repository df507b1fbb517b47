/// Run the global checks of a gate, returning 403 Forbidden if not permitted.
///
/// Configuration errors return early as well, answered with a 500 by
/// [`AccessError`](crate::error::AccessError).
///
/// # Usage
///
/// ```rust,ignore
/// use drygate::{authorize, gate::PermissionGate};
///
/// pub async fn create(
///     State(gate): State<PermissionGate<Post>>,
///     request: PermissionRequest,
///     view: ViewContext,
/// ) -> Result<Json<Post>, AccessError> {
///     authorize!(gate, &request, &view);
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! authorize {
    ($gate:expr, $request:expr, $view:expr) => {
        if !$gate.has_permission($request, $view)? {
            return Err($crate::error::AccessError::Forbidden.into());
        }
    };
}

/// Run the object checks of a gate against an instance, returning 403 Forbidden if not permitted.
///
/// # Usage
///
/// ```rust,ignore
/// use drygate::{authorize_object, gate::PermissionGate};
///
/// let post = find_post(id).await?;
/// authorize_object!(gate, &request, &view, &post);
/// ```
#[macro_export]
macro_rules! authorize_object {
    ($gate:expr, $request:expr, $view:expr, $object:expr) => {
        if !$gate.has_object_permission($request, $view, $object)? {
            return Err($crate::error::AccessError::Forbidden.into());
        }
    };
}
