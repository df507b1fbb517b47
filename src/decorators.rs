//! Wrappers for common conditions in permission checks.
//!
//! Each helper takes a [`GlobalCheck`](crate::checks::GlobalCheck) or an
//! [`ObjectCheck`](crate::checks::ObjectCheck) and returns the same kind of
//! check, so they stack:
//!
//! ```rust,ignore
//! let check = allow_staff_or_superuser(authenticated_users(GlobalCheck::new(|request| {
//!     request.principal::<User>().is_some_and(|user| user.can_publish)
//! })));
//! ```

use crate::checks::Check;

/// Grant access to staff and superusers without calling the check.
pub fn allow_staff_or_superuser<C: Check>(check: C) -> C {
    check.guarded(|request| request.is_staff_or_superuser().then_some(true))
}

/// Deny access to requests without an authenticated principal.
pub fn authenticated_users<C: Check>(check: C) -> C {
    check.guarded(|request| (!request.is_authenticated()).then_some(false))
}

/// Deny access to requests with an authenticated principal.
pub fn unauthenticated_users<C: Check>(check: C) -> C {
    check.guarded(|request| request.is_authenticated().then_some(false))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use axum::http::Method;

    use super::*;
    use crate::{
        checks::{GlobalCheck, ObjectCheck},
        request::{AnonymousUser, PermissionRequest},
        testing::setup::TestUser,
    };

    fn request(user: TestUser) -> PermissionRequest {
        PermissionRequest::new(Method::GET).with_user(user)
    }

    fn tracking(result: bool) -> (GlobalCheck, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let check = GlobalCheck::new(move |_| {
            flag.store(true, Ordering::SeqCst);
            result
        });
        (check, called)
    }

    #[test]
    fn test_staff_bypasses_check() {
        let (check, called) = tracking(false);
        let check = allow_staff_or_superuser(check);

        let staff = request(TestUser::staff());

        assert!(check.call(&staff));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_superuser_bypasses_object_check() {
        let check = allow_staff_or_superuser(ObjectCheck::new(|_: &u32, _| false));

        let superuser = request(TestUser::superuser());

        assert!(check.call(&1, &superuser));
        assert!(!check.call(&1, &request(TestUser::member())));
    }

    #[test]
    fn test_regular_user_delegates() {
        let (check, called) = tracking(true);
        let check = allow_staff_or_superuser(check);

        assert!(check.call(&request(TestUser::member())));
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_missing_principal_is_not_staff() {
        let check = allow_staff_or_superuser(GlobalCheck::new(|_| false));

        assert!(!check.call(&PermissionRequest::new(Method::GET)));
    }

    #[test]
    fn test_authenticated_users() {
        let (check, called) = tracking(true);
        let check = authenticated_users(check);

        assert!(!check.call(&PermissionRequest::new(Method::GET)));
        assert!(!check.call(&PermissionRequest::new(Method::GET).with_user(AnonymousUser)));
        assert!(!called.load(Ordering::SeqCst));

        assert!(check.call(&request(TestUser::member())));
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_authenticated_users_keeps_denial() {
        let check = authenticated_users(ObjectCheck::new(|_: &u32, _| false));

        assert!(!check.call(&1, &request(TestUser::member())));
    }

    #[test]
    fn test_unauthenticated_users() {
        let check = unauthenticated_users(GlobalCheck::new(|_| true));

        assert!(!check.call(&request(TestUser::member())));
        assert!(check.call(&PermissionRequest::new(Method::POST)));
        assert!(check.call(&PermissionRequest::new(Method::POST).with_user(AnonymousUser)));
    }

    #[test]
    fn test_decorators_stack() {
        let check = allow_staff_or_superuser(authenticated_users(GlobalCheck::new(|_| false)));

        let staff = request(TestUser::staff());

        assert!(check.call(&staff));
        assert!(!check.call(&request(TestUser::member())));
        assert!(!check.call(&PermissionRequest::new(Method::GET)));
    }
}
