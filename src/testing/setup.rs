use axum::Extension;

use crate::request::{AnonymousUser, CurrentPrincipal, Principal};

static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize tracing for tests
pub fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

/// Principal with configurable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestUser {
    pub authenticated: bool,
    pub staff: bool,
    pub superuser: bool,
}

impl TestUser {
    pub fn member() -> Self {
        Self {
            authenticated: true,
            staff: false,
            superuser: false,
        }
    }

    pub fn staff() -> Self {
        Self {
            staff: true,
            ..Self::member()
        }
    }

    pub fn superuser() -> Self {
        Self {
            superuser: true,
            ..Self::member()
        }
    }
}

impl Principal for TestUser {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn is_staff(&self) -> bool {
        self.staff
    }

    fn is_superuser(&self) -> bool {
        self.superuser
    }
}

/// Stand-in for an authentication layer: every request carries `user`, or
/// the anonymous user when `None`.
///
/// ```rust,ignore
/// let router = app_router().layer(principal_layer(Some(TestUser::staff())));
/// let server = TestServer::new(router).unwrap();
/// ```
pub fn principal_layer(user: Option<TestUser>) -> Extension<CurrentPrincipal> {
    init_tracing();

    match user {
        Some(user) => Extension(CurrentPrincipal::new(user)),
        None => Extension(CurrentPrincipal::new(AnonymousUser)),
    }
}
