pub mod macros;
pub mod middleware;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::{
    action::Action,
    checks::Role,
    error::PermissionError,
    request::PermissionRequest,
    table::{DomainTypeProvider, PermissionTable},
    view::ViewContext,
};

/// Which checks a [`PermissionGate`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Run `has_{action}_permission` / `has_read_permission` / `has_write_permission`
    #[serde(default = "default_true")]
    pub global_permissions: bool,
    /// Run the `has_object_*` counterparts
    #[serde(default = "default_true")]
    pub object_permissions: bool,
    /// Resolve `partial_update` with the `update` checks
    #[serde(default = "default_true")]
    pub partial_update_is_update: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            global_permissions: true,
            object_permissions: true,
            partial_update_is_update: true,
        }
    }
}

impl GateConfig {
    /// Only check global permissions.
    #[must_use]
    pub const fn global_only() -> Self {
        Self {
            global_permissions: true,
            object_permissions: false,
            partial_update_is_update: true,
        }
    }

    /// Only check object permissions.
    #[must_use]
    pub const fn object_only() -> Self {
        Self {
            global_permissions: false,
            object_permissions: true,
            partial_update_is_update: true,
        }
    }
}

/// Resolves and runs the permission checks a model declares.
///
/// For every request the gate looks up checks in this order:
///
/// 1. Global checks:
///    1a. the specific action check (`has_retrieve_permission`),
///    1b. otherwise the general one (`has_read_permission` for safe methods,
///        `has_write_permission` for the rest).
/// 2. Object checks, the same way with `has_object_*` names.
///
/// A specific check replaces the general one entirely; its answer is final
/// for that step. Both steps have to pass unless one of them is switched off
/// in [`GateConfig`].
///
/// # Example
/// ```rust,ignore
/// let gate = PermissionGate::new(GateConfig::default(), Registered::<Post>::new());
///
/// if gate.check(&request, &view, Some(&post))? {
///     // allowed
/// }
/// ```
pub struct PermissionGate<M> {
    config: GateConfig,
    provider: Arc<dyn DomainTypeProvider<M>>,
}

impl<M> Clone for PermissionGate<M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<M> std::fmt::Debug for PermissionGate<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M: 'static> PermissionGate<M> {
    pub fn new<P>(config: GateConfig, provider: P) -> Self
    where
        P: DomainTypeProvider<M> + 'static,
    {
        Self {
            config,
            provider: Arc::new(provider),
        }
    }

    /// Gate checking only global permissions.
    pub fn global_only<P>(provider: P) -> Self
    where
        P: DomainTypeProvider<M> + 'static,
    {
        Self::new(GateConfig::global_only(), provider)
    }

    /// Gate checking only object permissions.
    pub fn object_only<P>(provider: P) -> Self
    where
        P: DomainTypeProvider<M> + 'static,
    {
        Self::new(GateConfig::object_only(), provider)
    }
}

impl<M> PermissionGate<M> {
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the global checks for the view's action.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] when the view has no model or the model
    /// has neither the specific nor the required general check.
    #[instrument(skip_all, fields(view = view.name(), action))]
    pub fn has_permission(
        &self,
        request: &PermissionRequest,
        view: &ViewContext,
    ) -> Result<bool, PermissionError> {
        if !self.config.global_permissions {
            return Ok(true);
        }

        let table = self.table(view)?;
        let action = self.action(view);

        let mut action_method = None;
        if let Some(action) = &action {
            tracing::Span::current().record("action", action.as_str());

            if let Some(check) = table.global_for(action) {
                let allowed = check.call(request);
                debug!(model = table.model(), allowed, "Specific global check");
                return Ok(allowed);
            }
            action_method = Some(Role::Global.method_name(action));
        }

        let general = general_action(request);
        let check = table
            .global_for(&general)
            .ok_or_else(|| missing_check(&table, Role::Global, &general, action_method))?;

        let allowed = check.call(request);
        debug!(model = table.model(), general = general.as_str(), allowed, "General global check");
        Ok(allowed)
    }

    /// Run the object checks for the view's action against `object`.
    ///
    /// # Errors
    /// Same conditions as [`PermissionGate::has_permission`], for the
    /// `has_object_*` checks.
    #[instrument(skip_all, fields(view = view.name(), action))]
    pub fn has_object_permission(
        &self,
        request: &PermissionRequest,
        view: &ViewContext,
        object: &M,
    ) -> Result<bool, PermissionError> {
        if !self.config.object_permissions {
            return Ok(true);
        }

        let table = self.table(view)?;
        let action = self.action(view);

        let mut action_method = None;
        if let Some(action) = &action {
            tracing::Span::current().record("action", action.as_str());

            if let Some(check) = table.object_for(action) {
                let allowed = check.call(object, request);
                debug!(model = table.model(), allowed, "Specific object check");
                return Ok(allowed);
            }
            action_method = Some(Role::Object.method_name(action));
        }

        let general = general_action(request);
        let check = table
            .object_for(&general)
            .ok_or_else(|| missing_check(&table, Role::Object, &general, action_method))?;

        let allowed = check.call(object, request);
        debug!(model = table.model(), general = general.as_str(), allowed, "General object check");
        Ok(allowed)
    }

    /// Global and object checks together, stopping at the first denial.
    ///
    /// Object checks are skipped when there is no object yet (list and
    /// create requests).
    pub fn check(
        &self,
        request: &PermissionRequest,
        view: &ViewContext,
        object: Option<&M>,
    ) -> Result<bool, PermissionError> {
        if !self.has_permission(request, view)? {
            return Ok(false);
        }

        match object {
            Some(object) => self.has_object_permission(request, view, object),
            None => Ok(true),
        }
    }

    fn table(&self, view: &ViewContext) -> Result<Arc<PermissionTable<M>>, PermissionError> {
        self.provider.permission_table().ok_or_else(|| {
            warn!(view = view.name(), "Permission gate used without a model");
            PermissionError::MissingModel {
                view: view.name().to_string(),
            }
        })
    }

    fn action(&self, view: &ViewContext) -> Option<Action> {
        let action = view
            .action()
            .map(|action| action.normalize(self.config.partial_update_is_update));
        trace!(action = ?action, "Resolved action");
        action
    }
}

fn general_action(request: &PermissionRequest) -> Action {
    if request.is_safe() {
        Action::new(Action::READ)
    } else {
        Action::new(Action::WRITE)
    }
}

fn missing_check<M>(
    table: &PermissionTable<M>,
    role: Role,
    general: &Action,
    action_method: Option<String>,
) -> PermissionError {
    let method = role.method_name(general);
    warn!(model = table.model(), method = %method, "Model is missing a required permission check");

    PermissionError::MissingCheck {
        model: table.model().to_string(),
        method,
        action_method,
    }
}
