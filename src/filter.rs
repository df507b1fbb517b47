use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{action::Action, error::PermissionError, request::PermissionRequest, view::ViewContext};

type FilterFn<Q> = Arc<dyn Fn(&PermissionRequest, Q, &ViewContext) -> Q + Send + Sync>;

/// Options of a [`FilterRouter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Dispatch list-type requests to the filter registered for the view's action
    #[serde(default)]
    pub action_routing: bool,
}

/// Limits the records a requester can get back from list-type requests.
///
/// Requests for a single resource pass through untouched; the gate's object
/// checks cover those. Every other request goes through the list filter, or
/// with `action_routing` through the filter registered for the view's action
/// (so a custom `owned` listing can filter differently from `list`).
///
/// `Q` is whatever the application uses as a query: a `sea_orm::Select<E>`,
/// a SQL builder, or a plain `Vec` of records.
///
/// # Example
/// ```rust,ignore
/// let filters = FilterRouter::new(FilterConfig { action_routing: true })
///     .list(|request, query: Select<post::Entity>, _view| match request.principal::<User>() {
///         Some(user) => query.filter(post::Column::AuthorId.eq(user.id)),
///         None => query.filter(post::Column::Published.eq(true)),
///     })
///     .action("drafts", |_request, query, _view| query.filter(post::Column::Published.eq(false)));
///
/// let query = filters.filter_queryset(&request, post::Entity::find(), &view)?;
/// ```
pub struct FilterRouter<Q> {
    config: FilterConfig,
    filters: HashMap<Action, FilterFn<Q>>,
}

impl<Q> Clone for FilterRouter<Q> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            filters: self.filters.clone(),
        }
    }
}

impl<Q> fmt::Debug for FilterRouter<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.filters.keys().map(Action::as_str).collect();
        actions.sort_unstable();

        f.debug_struct("FilterRouter")
            .field("config", &self.config)
            .field("filters", &actions)
            .finish()
    }
}

impl<Q> FilterRouter<Q> {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            filters: HashMap::new(),
        }
    }

    /// Register the filter for `list` requests (`filter_list_queryset`).
    #[must_use]
    pub fn list<F>(self, filter: F) -> Self
    where
        F: Fn(&PermissionRequest, Q, &ViewContext) -> Q + Send + Sync + 'static,
    {
        self.action(Action::LIST, filter)
    }

    /// Register the filter for a custom action (`filter_{action}_queryset`).
    #[must_use]
    pub fn action<F>(mut self, action: impl Into<Action>, filter: F) -> Self
    where
        F: Fn(&PermissionRequest, Q, &ViewContext) -> Q + Send + Sync + 'static,
    {
        self.filters.insert(action.into(), Arc::new(filter));
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Apply the filter matching the request to `queryset`.
    ///
    /// # Errors
    /// Returns [`PermissionError::MissingListFilter`] when no list filter is
    /// registered, and with action routing
    /// [`PermissionError::MissingActionFilter`] or
    /// [`PermissionError::MissingAction`] when the view's action has no filter.
    #[instrument(skip_all, fields(view = view.name()))]
    pub fn filter_queryset(
        &self,
        request: &PermissionRequest,
        queryset: Q,
        view: &ViewContext,
    ) -> Result<Q, PermissionError> {
        if view.is_detail() {
            debug!("Single resource request, queryset left unfiltered");
            return Ok(queryset);
        }

        let filter = if self.config.action_routing {
            let action = view.action().ok_or_else(|| PermissionError::MissingAction {
                view: view.name().to_string(),
            })?;
            debug!(action = action.as_str(), "Routing list filter by action");

            self.filters
                .get(action)
                .ok_or_else(|| PermissionError::MissingActionFilter {
                    action: action.to_string(),
                })?
        } else {
            self.filters
                .get(&Action::new(Action::LIST))
                .ok_or_else(|| PermissionError::MissingListFilter {
                    view: view.name().to_string(),
                })?
        };

        Ok(filter(request, queryset, view))
    }
}
