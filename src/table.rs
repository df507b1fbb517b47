use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock},
};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{
    action::Action,
    checks::{GlobalCheck, ObjectCheck, Role},
    request::PermissionRequest,
};

/// The checks registered for one action.
pub struct ActionChecks<M> {
    pub global: Option<GlobalCheck>,
    pub object: Option<ObjectCheck<M>>,
}

impl<M> Default for ActionChecks<M> {
    fn default() -> Self {
        Self {
            global: None,
            object: None,
        }
    }
}

impl<M> Clone for ActionChecks<M> {
    fn clone(&self) -> Self {
        Self {
            global: self.global.clone(),
            object: self.object.clone(),
        }
    }
}

/// Capability table of a model type: which checks exist for which action.
///
/// An action with no entry (or an entry without the requested role) simply
/// has no check; callers decide whether that means "fall back" or
/// "misconfigured". The general checks live under the `read` and `write`
/// actions.
///
/// # Example
/// ```rust,ignore
/// let table = PermissionTable::<Post>::new("Post")
///     .read(|_request| true)
///     .write(|request| request.is_authenticated())
///     .global("publish", |request| request.is_staff_or_superuser())
///     .object_read(|post, _request| post.published)
///     .object_write(|post, request| {
///         request.principal::<User>().is_some_and(|user| user.id == post.author_id)
///     });
/// ```
pub struct PermissionTable<M> {
    model: String,
    checks: HashMap<Action, ActionChecks<M>>,
}

impl<M: 'static> PermissionTable<M> {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            checks: HashMap::new(),
        }
    }

    /// Register `has_{action}_permission`.
    #[must_use]
    pub fn global<F>(mut self, action: impl Into<Action>, check: F) -> Self
    where
        F: Fn(&PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.global_check(action, GlobalCheck::new(check));
        self
    }

    /// Register `has_object_{action}_permission`.
    #[must_use]
    pub fn object<F>(mut self, action: impl Into<Action>, check: F) -> Self
    where
        F: Fn(&M, &PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.object_check(action, ObjectCheck::new(check));
        self
    }

    /// Register the general `has_read_permission` check.
    #[must_use]
    pub fn read<F>(self, check: F) -> Self
    where
        F: Fn(&PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.global(Action::READ, check)
    }

    /// Register the general `has_write_permission` check.
    #[must_use]
    pub fn write<F>(self, check: F) -> Self
    where
        F: Fn(&PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.global(Action::WRITE, check)
    }

    #[must_use]
    pub fn object_read<F>(self, check: F) -> Self
    where
        F: Fn(&M, &PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.object(Action::READ, check)
    }

    #[must_use]
    pub fn object_write<F>(self, check: F) -> Self
    where
        F: Fn(&M, &PermissionRequest) -> bool + Send + Sync + 'static,
    {
        self.object(Action::WRITE, check)
    }

    /// Register an already built (possibly decorated) global check.
    pub fn global_check(&mut self, action: impl Into<Action>, check: GlobalCheck) -> &mut Self {
        let action = action.into();
        trace!(model = %self.model, method = %Role::Global.method_name(&action), "Registering check");
        self.checks.entry(action).or_default().global = Some(check);
        self
    }

    /// Register an already built (possibly decorated) object check.
    pub fn object_check(&mut self, action: impl Into<Action>, check: ObjectCheck<M>) -> &mut Self {
        let action = action.into();
        trace!(model = %self.model, method = %Role::Object.method_name(&action), "Registering check");
        self.checks.entry(action).or_default().object = Some(check);
        self
    }
}

impl<M> PermissionTable<M> {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn global_for(&self, action: &Action) -> Option<&GlobalCheck> {
        self.checks.get(action)?.global.as_ref()
    }

    pub fn object_for(&self, action: &Action) -> Option<&ObjectCheck<M>> {
        self.checks.get(action)?.object.as_ref()
    }

    /// Whether a check exists for `action` in `role`.
    pub fn has(&self, action: &Action, role: Role) -> bool {
        match role {
            Role::Global => self.global_for(action).is_some(),
            Role::Object => self.object_for(action).is_some(),
        }
    }
}

impl<M> fmt::Debug for PermissionTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.checks.keys().map(Action::as_str).collect();
        actions.sort_unstable();

        f.debug_struct("PermissionTable")
            .field("model", &self.model)
            .field("actions", &actions)
            .finish()
    }
}

/// A model type that declares its permission checks.
///
/// Implementations build their table once; [`permission_table`] caches it
/// for the rest of the process.
///
/// # Example
/// ```rust,ignore
/// impl PermissionModel for Post {
///     fn permissions() -> PermissionTable<Self> {
///         let mut table = PermissionTable::new("Post")
///             .read(|_| true)
///             .object_read(|post, _| post.published);
///         table.global_check("write", authenticated_users(GlobalCheck::new(|_| true)));
///         table
///     }
/// }
/// ```
pub trait PermissionModel: Sized + Send + Sync + 'static {
    fn permissions() -> PermissionTable<Self>;
}

static TABLES: LazyLock<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = LazyLock::new(DashMap::new);

/// Get the cached permission table of `M`, building it on first use.
pub fn permission_table<M: PermissionModel>() -> Arc<PermissionTable<M>> {
    let key = TypeId::of::<M>();
    let entry = match TABLES.get(&key) {
        Some(entry) => Arc::clone(entry.value()),
        None => {
            let table = M::permissions();
            debug!(model = %table.model(), "Registered permission table");
            let table: Arc<dyn Any + Send + Sync> = Arc::new(table);
            Arc::clone(TABLES.entry(key).or_insert(table).value())
        }
    };

    // Keyed by the TypeId of M, so the stored value is always a PermissionTable<M>.
    match entry.downcast::<PermissionTable<M>>() {
        Ok(table) => table,
        Err(_) => unreachable!("permission registry entry does not match its TypeId"),
    }
}

/// Supplies the model type behind a gate or a permissions field.
///
/// This is the seam where a view says which model it serves. Returning
/// `None` is a configuration error for every consumer.
pub trait DomainTypeProvider<M>: Send + Sync {
    fn permission_table(&self) -> Option<Arc<PermissionTable<M>>>;
}

impl<M: Send + Sync + 'static> DomainTypeProvider<M> for Arc<PermissionTable<M>> {
    fn permission_table(&self) -> Option<Arc<PermissionTable<M>>> {
        Some(Arc::clone(self))
    }
}

impl<M: Send + Sync + 'static> DomainTypeProvider<M> for Option<Arc<PermissionTable<M>>> {
    fn permission_table(&self) -> Option<Arc<PermissionTable<M>>> {
        self.clone()
    }
}

/// Provider resolving `M` through the process-wide registry.
pub struct Registered<M>(std::marker::PhantomData<fn() -> M>);

impl<M> Registered<M> {
    pub const fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<M> Default for Registered<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for Registered<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M: PermissionModel> DomainTypeProvider<M> for Registered<M> {
    fn permission_table(&self) -> Option<Arc<PermissionTable<M>>> {
        Some(permission_table::<M>())
    }
}
